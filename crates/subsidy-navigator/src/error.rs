//! Top-level error for the binary; library modules keep their own error types.

use crate::audit::AuditError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::wizard::WizardError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wizard error: {0}")]
    Wizard(#[from] WizardError),
    #[error("security audit error: {0}")]
    Audit(#[from] AuditError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProgramId;
    use crate::wizard::ResolveError;
    use std::error::Error;

    #[test]
    fn wraps_module_errors_with_context() {
        let error: AppError = WizardError::from(ResolveError::UnknownProgram(ProgramId::new("x"))).into();

        assert_eq!(error.to_string(), "wizard error: unknown subsidy program 'x'");
        assert!(error.source().is_some());
    }
}
