//! Response classifiers used by the auditor. None of these touch the network.

use reqwest::header::{HeaderMap, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN};
use reqwest::StatusCode;

use super::report::{Finding, FindingCategory, Severity};

const REQUIRED_SECURITY_HEADERS: &[(&str, Severity, &str)] = &[
    (
        "content-security-policy",
        Severity::Medium,
        "Send a Content-Security-Policy that restricts script sources.",
    ),
    (
        "x-content-type-options",
        Severity::Medium,
        "Send `X-Content-Type-Options: nosniff`.",
    ),
    (
        "x-frame-options",
        Severity::Medium,
        "Send `X-Frame-Options: DENY` or a frame-ancestors CSP directive.",
    ),
    (
        "strict-transport-security",
        Severity::Low,
        "Send Strict-Transport-Security once the service is served over TLS.",
    ),
    (
        "referrer-policy",
        Severity::Low,
        "Send `Referrer-Policy: strict-origin-when-cross-origin` or stricter.",
    ),
];

const SQL_ERROR_SIGNATURES: &[&str] = &[
    "sql syntax",
    "sqlstate",
    "syntax error at or near",
    "unclosed quotation mark",
    "sqlite3.operationalerror",
    "ora-00933",
    "pg::syntaxerror",
];

const TRAVERSAL_SIGNATURES: &[&str] = &["root:x:0:0", "[boot loader]", "; for 16-bit app support"];

pub fn missing_security_headers(headers: &HeaderMap) -> Vec<Finding> {
    REQUIRED_SECURITY_HEADERS
        .iter()
        .filter(|(name, _, _)| !headers.contains_key(*name))
        .map(|(name, severity, recommendation)| Finding {
            id: format!("headers.missing.{name}"),
            category: FindingCategory::SecurityHeaders,
            severity: *severity,
            title: format!("Missing `{name}` header"),
            detail: format!("The landing response did not include `{name}`."),
            recommendation: (*recommendation).to_string(),
        })
        .collect()
}

/// Flags `Server`/`X-Powered-By` values that advertise a version.
pub fn version_disclosure(headers: &HeaderMap) -> Option<Finding> {
    let disclosed = ["server", "x-powered-by"]
        .into_iter()
        .filter_map(|name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| (name, value))
        })
        .find(|(_, value)| value.chars().any(|c| c.is_ascii_digit()))?;

    Some(Finding {
        id: "headers.version_disclosure".to_string(),
        category: FindingCategory::SecurityHeaders,
        severity: Severity::Low,
        title: "Server version disclosed".to_string(),
        detail: format!("`{}: {}` reveals the software version.", disclosed.0, disclosed.1),
        recommendation: "Strip version details from server banners.".to_string(),
    })
}

pub fn cors_misconfiguration(headers: &HeaderMap, probe_origin: &str) -> Option<Finding> {
    let allowed = headers
        .get(ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|value| value.to_str().ok())?;
    let credentials = headers
        .get(ACCESS_CONTROL_ALLOW_CREDENTIALS)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"));

    let (severity, detail) = if allowed == probe_origin && credentials {
        (
            Severity::High,
            format!("Origin `{probe_origin}` is reflected with credentials allowed."),
        )
    } else if allowed == probe_origin {
        (
            Severity::Medium,
            format!("Arbitrary origin `{probe_origin}` is reflected."),
        )
    } else if allowed == "*" {
        (
            Severity::Low,
            "Any origin may read responses (`Access-Control-Allow-Origin: *`).".to_string(),
        )
    } else {
        return None;
    };

    Some(Finding {
        id: "cors.permissive_origin".to_string(),
        category: FindingCategory::Cors,
        severity,
        title: "Permissive CORS policy".to_string(),
        detail,
        recommendation: "Allow only the wizard's own origins.".to_string(),
    })
}

pub fn unauthenticated_access(path: &str, status: StatusCode) -> Option<Finding> {
    if !status.is_success() {
        return None;
    }
    Some(Finding {
        id: format!("auth.unauthenticated.{}", slug(path)),
        category: FindingCategory::Authentication,
        severity: Severity::High,
        title: "Endpoint accepts unauthenticated requests".to_string(),
        detail: format!("`{path}` answered {status} without credentials."),
        recommendation: "Reject requests that lack a valid bearer token.".to_string(),
    })
}

pub fn invalid_token_accepted(path: &str, status: StatusCode) -> Option<Finding> {
    if !status.is_success() {
        return None;
    }
    Some(Finding {
        id: format!("auth.invalid_token.{}", slug(path)),
        category: FindingCategory::Authentication,
        severity: Severity::Critical,
        title: "Endpoint accepts a forged token".to_string(),
        detail: format!("`{path}` answered {status} for a malformed bearer token."),
        recommendation: "Verify token signatures before serving requests.".to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadProbeKind {
    DisallowedExtension,
    DoubleExtension,
    Oversized,
    SpoofedContentType,
}

impl UploadProbeKind {
    pub const fn id(self) -> &'static str {
        match self {
            Self::DisallowedExtension => "disallowed_extension",
            Self::DoubleExtension => "double_extension",
            Self::Oversized => "oversized",
            Self::SpoofedContentType => "spoofed_content_type",
        }
    }

    const fn severity(self) -> Severity {
        match self {
            Self::DisallowedExtension | Self::DoubleExtension => Severity::High,
            Self::Oversized | Self::SpoofedContentType => Severity::Medium,
        }
    }

    const fn recommendation(self) -> &'static str {
        match self {
            Self::DisallowedExtension => "Accept only spreadsheet extensions on upload.",
            Self::DoubleExtension => "Validate the final extension and normalise stored names.",
            Self::Oversized => "Enforce a request body limit on the upload route.",
            Self::SpoofedContentType => "Inspect file signatures instead of trusting Content-Type.",
        }
    }
}

/// Any 2xx for a hostile upload counts as accepted.
pub fn upload_accepted(kind: UploadProbeKind, file_name: &str, status: StatusCode) -> Option<Finding> {
    if !status.is_success() {
        return None;
    }
    Some(Finding {
        id: format!("upload.{}", kind.id()),
        category: FindingCategory::FileUpload,
        severity: kind.severity(),
        title: format!("Upload accepted `{file_name}`"),
        detail: format!("The upload endpoint answered {status} for `{file_name}`."),
        recommendation: kind.recommendation().to_string(),
    })
}

pub fn contains_sql_error(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    SQL_ERROR_SIGNATURES
        .iter()
        .any(|signature| lowered.contains(signature))
}

pub fn is_formula_payload(payload: &str) -> bool {
    payload.starts_with(['=', '+', '-', '@'])
}

pub fn reflects_payload(body: &str, payload: &str) -> bool {
    !payload.is_empty() && body.contains(payload)
}

/// A formula counts as neutralised when every echo is preceded by a single quote.
pub fn reflects_formula_unescaped(body: &str, payload: &str) -> bool {
    !payload.is_empty()
        && body
            .match_indices(payload)
            .any(|(index, _)| !body[..index].ends_with('\''))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    Sql,
    Formula,
    Script,
}

pub fn injection_findings(kind: InjectionKind, payload: &str, status: StatusCode, body: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    if kind == InjectionKind::Sql && contains_sql_error(body) {
        findings.push(Finding {
            id: "injection.sql_error".to_string(),
            category: FindingCategory::Injection,
            severity: Severity::High,
            title: "Database error leaked on SQL payload".to_string(),
            detail: format!("Payload `{payload}` produced a database error message."),
            recommendation: "Use parameterised queries and hide driver errors.".to_string(),
        });
    }

    if kind == InjectionKind::Formula && is_formula_payload(payload) && reflects_formula_unescaped(body, payload) {
        findings.push(Finding {
            id: "injection.formula".to_string(),
            category: FindingCategory::Injection,
            severity: Severity::Medium,
            title: "Spreadsheet formula echoed unescaped".to_string(),
            detail: format!("Payload `{payload}` came back without a neutralising prefix."),
            recommendation: "Prefix cells starting with = + - @ with a single quote on export."
                .to_string(),
        });
    }

    if kind == InjectionKind::Script && reflects_payload(body, payload) {
        findings.push(Finding {
            id: "injection.script_reflection".to_string(),
            category: FindingCategory::Injection,
            severity: Severity::Medium,
            title: "Script payload reflected".to_string(),
            detail: format!("Payload `{payload}` was returned verbatim."),
            recommendation: "HTML-escape user input in every response.".to_string(),
        });
    }

    if status.is_server_error() {
        findings.push(Finding {
            id: "injection.server_error".to_string(),
            category: FindingCategory::Injection,
            severity: Severity::Low,
            title: "Unhandled error on hostile input".to_string(),
            detail: format!("Payload `{payload}` triggered {status}."),
            recommendation: "Validate input and answer 4xx for malformed values.".to_string(),
        });
    }

    findings
}

pub fn traversal_leak(payload: &str, status: StatusCode, body: &str) -> Option<Finding> {
    if !status.is_success() || !TRAVERSAL_SIGNATURES.iter().any(|sig| body.contains(sig)) {
        return None;
    }
    Some(Finding {
        id: "path_traversal.file_read".to_string(),
        category: FindingCategory::PathTraversal,
        severity: Severity::Critical,
        title: "Path traversal exposes server files".to_string(),
        detail: format!("Requesting `{payload}` returned system file contents."),
        recommendation: "Resolve download names against an allow-list of stored files.".to_string(),
    })
}

pub fn probe_failed(check: &str, target: &str, error: &reqwest::Error) -> Finding {
    Finding {
        id: format!("transport.{check}"),
        category: FindingCategory::Transport,
        severity: Severity::Info,
        title: format!("Probe `{check}` could not complete"),
        detail: format!("Request to `{target}` failed: {error}"),
        recommendation: "Confirm the target is reachable and rerun the audit.".to_string(),
    }
}

/// Deduplicates findings that share an id, keeping the first occurrence.
pub fn dedup_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = std::collections::HashSet::new();
    findings
        .into_iter()
        .filter(|finding| seen.insert(finding.id.clone()))
        .collect()
}

fn slug(path: &str) -> String {
    path.trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
