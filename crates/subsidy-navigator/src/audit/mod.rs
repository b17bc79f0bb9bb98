//! HTTP probes for common web vulnerabilities against a running deployment.
//!
//! The auditor walks a fixed checklist sequentially and never aborts on a
//! single failed request; transport failures become informational findings.

mod checks;
mod report;

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, ORIGIN};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use checks::{
    contains_sql_error, cors_misconfiguration, dedup_findings, injection_findings,
    invalid_token_accepted, is_formula_payload, missing_security_headers,
    reflects_formula_unescaped, reflects_payload, traversal_leak, unauthenticated_access,
    upload_accepted, version_disclosure, InjectionKind, UploadProbeKind,
};
pub use report::{
    write_report, AuditReport, Finding, FindingCategory, Severity, SeveritySummary, REPORT_PATH,
};

const PROBE_ORIGIN: &str = "https://attacker.example";
const FORGED_TOKEN: &str = "Bearer eyJhbGciOiJub25lIn0.eyJzdWIiOiJhdWRpdCJ9.";
const OVERSIZED_UPLOAD_BYTES: usize = 11 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SQL_PAYLOADS: &[&str] = &["' OR '1'='1", "1; DROP TABLE sessions;--"];
const FORMULA_PAYLOADS: &[&str] = &[
    "=cmd|' /C calc'!A0",
    "=HYPERLINK(\"https://attacker.example\",\"open\")",
    "@SUM(1+1)*cmd|' /C calc'!A0",
];
const SCRIPT_PAYLOADS: &[&str] = &["<script>alert('audit')</script>"];
const TRAVERSAL_QUERY_PAYLOADS: &[&str] = &[
    "../../../../etc/passwd",
    "..\\..\\..\\..\\windows\\win.ini",
];
const TRAVERSAL_PATH_PAYLOADS: &[&str] = &[
    "..%2f..%2f..%2f..%2fetc%2fpasswd",
    "%2e%2e%2f%2e%2e%2f%2e%2e%2f%2e%2e%2fetc%2fpasswd",
];

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("invalid audit target `{value}`: {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("failed to write audit report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode audit report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Paths probed on the target, relative to its base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEndpoints {
    pub landing: String,
    pub upload: String,
    pub process: String,
    pub download: String,
}

impl Default for ProbeEndpoints {
    fn default() -> Self {
        Self {
            landing: "/".to_string(),
            upload: "/api/upload".to_string(),
            process: "/api/process".to_string(),
            download: "/api/download".to_string(),
        }
    }
}

struct UploadProbe {
    kind: UploadProbeKind,
    file_name: &'static str,
    disguise_as: &'static str,
    body: Vec<u8>,
}

fn upload_probes() -> Vec<UploadProbe> {
    vec![
        UploadProbe {
            kind: UploadProbeKind::DisallowedExtension,
            file_name: "payload.exe",
            disguise_as: "payload.exe",
            body: b"MZ\x90\x00audit".to_vec(),
        },
        UploadProbe {
            kind: UploadProbeKind::DoubleExtension,
            file_name: "report.xlsx.php",
            disguise_as: "report.xlsx",
            body: b"<?php echo 'audit'; ?>".to_vec(),
        },
        UploadProbe {
            kind: UploadProbeKind::Oversized,
            file_name: "large.xlsx",
            disguise_as: "large.xlsx",
            body: vec![0; OVERSIZED_UPLOAD_BYTES],
        },
        UploadProbe {
            kind: UploadProbeKind::SpoofedContentType,
            file_name: "invoice.xlsx",
            disguise_as: "invoice.xlsx",
            body: b"<html><script>alert('audit')</script></html>".to_vec(),
        },
    ]
}

pub struct SecurityAuditor {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
    endpoints: ProbeEndpoints,
}

impl SecurityAuditor {
    pub fn new(base_url: &str, bearer_token: Option<String>) -> Result<Self, AuditError> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("subsidy-navigator-audit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            bearer_token: bearer_token.filter(|token| !token.trim().is_empty()),
            endpoints: ProbeEndpoints::default(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: ProbeEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn target(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoints(&self) -> &ProbeEndpoints {
        &self.endpoints
    }

    pub fn endpoint_url(&self, path: &str) -> Result<Url, AuditError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| AuditError::InvalidBaseUrl {
                value: format!("{}{path}", self.base_url),
                reason: err.to_string(),
            })
    }

    pub async fn run_full_security_audit(&self) -> Result<AuditReport, AuditError> {
        info!(target_url = %self.base_url, "starting security audit");

        let mut findings = Vec::new();
        let mut checks_run = Vec::new();

        checks_run.push("security_headers".to_string());
        findings.extend(self.check_security_headers().await?);
        checks_run.push("cors".to_string());
        findings.extend(self.check_cors().await?);
        checks_run.push("authentication".to_string());
        findings.extend(self.check_authentication().await?);
        checks_run.push("file_upload".to_string());
        findings.extend(self.check_file_upload().await?);
        checks_run.push("injection".to_string());
        findings.extend(self.check_injection().await?);
        checks_run.push("path_traversal".to_string());
        findings.extend(self.check_path_traversal().await?);

        let report = AuditReport::new(
            self.base_url.to_string(),
            checks_run,
            dedup_findings(findings),
        );
        info!(
            critical = report.summary.critical,
            high = report.summary.high,
            medium = report.summary.medium,
            low = report.summary.low,
            info = report.summary.info,
            "security audit finished"
        );
        Ok(report)
    }

    /// Full audit followed by `write_report`; the CLI passes `REPORT_PATH`
    /// unless `--output` overrides it.
    pub async fn run_and_write_report<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<AuditReport, AuditError> {
        let report = self.run_full_security_audit().await?;
        write_report(&report, &path)?;
        info!(path = %path.as_ref().display(), "security audit report written");
        Ok(report)
    }

    pub async fn check_security_headers(&self) -> Result<Vec<Finding>, AuditError> {
        let url = self.endpoint_url(&self.endpoints.landing)?;
        let response = match self.send("security_headers", &url, self.client.get(url.clone())).await {
            Ok(response) => response,
            Err(finding) => return Ok(vec![finding]),
        };

        let mut findings = missing_security_headers(response.headers());
        findings.extend(version_disclosure(response.headers()));
        debug!(count = findings.len(), "security header check complete");
        Ok(findings)
    }

    pub async fn check_cors(&self) -> Result<Vec<Finding>, AuditError> {
        let url = self.endpoint_url(&self.endpoints.process)?;
        let request = self
            .client
            .request(reqwest::Method::OPTIONS, url.clone())
            .header(ORIGIN, PROBE_ORIGIN)
            .header("access-control-request-method", "POST");
        let response = match self.send("cors", &url, request).await {
            Ok(response) => response,
            Err(finding) => return Ok(vec![finding]),
        };

        Ok(cors_misconfiguration(response.headers(), PROBE_ORIGIN)
            .into_iter()
            .collect())
    }

    pub async fn check_authentication(&self) -> Result<Vec<Finding>, AuditError> {
        let mut findings = Vec::new();
        for path in [&self.endpoints.process, &self.endpoints.upload] {
            let url = self.endpoint_url(path)?;

            let anonymous = self.client.post(url.clone()).json(&json!({}));
            match self.send("authentication", &url, anonymous).await {
                Ok(response) => findings.extend(unauthenticated_access(path, response.status())),
                Err(finding) => findings.push(finding),
            }

            let forged = self
                .client
                .post(url.clone())
                .header(AUTHORIZATION, FORGED_TOKEN)
                .json(&json!({}));
            match self.send("authentication", &url, forged).await {
                Ok(response) => findings.extend(invalid_token_accepted(path, response.status())),
                Err(finding) => findings.push(finding),
            }
        }
        Ok(findings)
    }

    pub async fn check_file_upload(&self) -> Result<Vec<Finding>, AuditError> {
        let url = self.endpoint_url(&self.endpoints.upload)?;
        let mut findings = Vec::new();

        for probe in upload_probes() {
            let mime = mime_guess::from_path(probe.disguise_as).first_or_octet_stream();
            let part = Part::bytes(probe.body)
                .file_name(probe.file_name)
                .mime_str(mime.essence_str())?;
            let form = Form::new().part("file", part);
            let request = self.authorized(self.client.post(url.clone()).multipart(form));

            debug!(probe = probe.kind.id(), file = probe.file_name, "sending upload probe");
            match self.send("file_upload", &url, request).await {
                Ok(response) => {
                    findings.extend(upload_accepted(probe.kind, probe.file_name, response.status()))
                }
                Err(finding) => findings.push(finding),
            }
        }
        Ok(findings)
    }

    pub async fn check_injection(&self) -> Result<Vec<Finding>, AuditError> {
        let url = self.endpoint_url(&self.endpoints.process)?;
        let payloads = SQL_PAYLOADS
            .iter()
            .map(|payload| (InjectionKind::Sql, *payload))
            .chain(FORMULA_PAYLOADS.iter().map(|p| (InjectionKind::Formula, *p)))
            .chain(SCRIPT_PAYLOADS.iter().map(|p| (InjectionKind::Script, *p)));

        let mut findings = Vec::new();
        for (kind, payload) in payloads {
            let request = self.authorized(
                self.client
                    .post(url.clone())
                    .json(&json!({ "sheet": payload, "cell": "A1", "value": payload })),
            );
            match self.send("injection", &url, request).await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    findings.extend(injection_findings(kind, payload, status, &body));
                }
                Err(finding) => findings.push(finding),
            }
        }
        Ok(findings)
    }

    pub async fn check_path_traversal(&self) -> Result<Vec<Finding>, AuditError> {
        let base = self.endpoint_url(&self.endpoints.download)?;
        let mut findings = Vec::new();

        for payload in TRAVERSAL_QUERY_PAYLOADS {
            let request = self.authorized(self.client.get(base.clone()).query(&[("file", payload)]));
            findings.extend(self.probe_traversal(&base, payload, request).await);
        }

        for payload in TRAVERSAL_PATH_PAYLOADS {
            let raw = format!("{}/{payload}", base.as_str().trim_end_matches('/'));
            let url = Url::parse(&raw).map_err(|err| AuditError::InvalidBaseUrl {
                value: raw.clone(),
                reason: err.to_string(),
            })?;
            let request = self.authorized(self.client.get(url.clone()));
            findings.extend(self.probe_traversal(&url, payload, request).await);
        }
        Ok(findings)
    }

    async fn probe_traversal(&self, url: &Url, payload: &str, request: RequestBuilder) -> Option<Finding> {
        match self.send("path_traversal", url, request).await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                traversal_leak(payload, status, &body)
            }
            Err(finding) => Some(finding),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, check: &str, url: &Url, request: RequestBuilder) -> Result<Response, Finding> {
        request.send().await.map_err(|err| {
            warn!(check, url = %url, error = %err, "audit probe failed");
            checks::probe_failed(check, url.as_str(), &err)
        })
    }
}

fn parse_base_url(value: &str) -> Result<Url, AuditError> {
    let invalid = |reason: &str| AuditError::InvalidBaseUrl {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(value.trim()).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
