//! Environment-driven settings. A `.env` file in the working directory is read
//! first; real environment variables take precedence over it.

use std::env;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

const ENV_VAR: &str = "SUBSIDY_ENV";
const HOST_VAR: &str = "SUBSIDY_HOST";
const PORT_VAR: &str = "SUBSIDY_PORT";
const LOG_VAR: &str = "SUBSIDY_LOG";
const CATALOG_DIR_VAR: &str = "SUBSIDY_CATALOG_DIR";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub catalog: CatalogConfig,
}

/// Trimmed value of `name`, with blank values treated as unset.
fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: read_var(ENV_VAR)
                .map(|value| AppEnvironment::parse(&value))
                .unwrap_or(AppEnvironment::Development),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig {
                log_level: read_var(LOG_VAR).unwrap_or_else(|| DEFAULT_LOG.to_string()),
            },
            catalog: CatalogConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = match read_var(PORT_VAR) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { value: raw })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: read_var(HOST_VAR).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    /// Resolves hostnames as well as literal addresses; the first result wins.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let unresolved = || ConfigError::UnresolvedHost {
            host: self.host.clone(),
        };
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| unresolved())?
            .next()
            .ok_or_else(unresolved)
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// `data_dir: None` selects the built-in standard catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub data_dir: Option<PathBuf>,
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let data_dir = read_var(CATALOG_DIR_VAR).map(PathBuf::from);
        match data_dir {
            Some(path) if !path.is_dir() => Err(ConfigError::MissingCatalogDir { path }),
            data_dir => Ok(Self { data_dir }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SUBSIDY_PORT must be a port number, got '{value}'")]
    InvalidPort { value: String },
    #[error("SUBSIDY_HOST '{host}' does not resolve to a socket address")]
    UnresolvedHost { host: String },
    #[error("SUBSIDY_CATALOG_DIR '{}' is not a directory", .path.display())]
    MissingCatalogDir { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [ENV_VAR, HOST_VAR, PORT_VAR, LOG_VAR, CATALOG_DIR_VAR] {
            env::remove_var(name);
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();

        let config = AppConfig::load().expect("config loads with defaults");

        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.telemetry.log_level, DEFAULT_LOG);
        assert!(config.catalog.data_dir.is_none());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(PORT_VAR, "  ");
        env::set_var(CATALOG_DIR_VAR, "");

        let config = AppConfig::load().expect("blank values ignored");

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.catalog.data_dir.is_none());
        reset_env();
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(HOST_VAR, "localhost");
        env::set_var(PORT_VAR, "8088");

        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");

        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8088);
        reset_env();
    }

    #[test]
    fn literal_addresses_bind_as_given() {
        let server = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
        };
        assert_eq!(
            server.socket_addr().expect("literal address"),
            SocketAddr::new(IpAddr::from([0, 0, 0, 0]), 3000)
        );
    }

    #[test]
    fn port_errors_name_the_offending_value() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(PORT_VAR, "eighty");

        let error = AppConfig::load().expect_err("port must be numeric");

        assert!(matches!(&error, ConfigError::InvalidPort { value } if value == "eighty"));
        assert_eq!(error.to_string(), "SUBSIDY_PORT must be a port number, got 'eighty'");
        reset_env();
    }

    #[test]
    fn catalog_dir_must_exist() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(CATALOG_DIR_VAR, "./definitely-not-a-catalog-dir");

        let error = AppConfig::load().expect_err("missing dir rejected");

        assert!(matches!(error, ConfigError::MissingCatalogDir { .. }));
        reset_env();
    }

    #[test]
    fn catalog_dir_accepts_existing_directory() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let dir = env::temp_dir();
        env::set_var(CATALOG_DIR_VAR, &dir);

        let config = AppConfig::load().expect("existing dir accepted");

        assert_eq!(config.catalog.data_dir.as_deref(), Some(dir.as_path()));
        reset_env();
    }

    #[test]
    fn environment_aliases_are_recognised() {
        assert_eq!(AppEnvironment::parse(" PROD "), AppEnvironment::Production);
        assert_eq!(AppEnvironment::parse("ci"), AppEnvironment::Test);
        assert_eq!(AppEnvironment::parse("staging"), AppEnvironment::Development);
    }
}
