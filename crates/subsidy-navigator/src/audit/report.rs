use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuditError;

/// Where `run_full_security_audit` callers persist the report.
pub const REPORT_PATH: &str = "security-audit-report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Info => "INFO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    SecurityHeaders,
    Cors,
    Authentication,
    FileUpload,
    Injection,
    PathTraversal,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub category: FindingCategory,
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl SeveritySummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }
        summary
    }

    pub fn has_blocking_issues(&self) -> bool {
        self.critical > 0 || self.high > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub target: String,
    pub generated_at: DateTime<Utc>,
    pub checks_run: Vec<String>,
    pub summary: SeveritySummary,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    /// Findings are ordered most severe first; checks keep their run order.
    pub fn new(target: String, checks_run: Vec<String>, mut findings: Vec<Finding>) -> Self {
        findings.sort_by_key(|finding| finding.severity);
        Self {
            target,
            generated_at: Utc::now(),
            checks_run,
            summary: SeveritySummary::from_findings(&findings),
            findings,
        }
    }
}

pub fn write_report<P: AsRef<Path>>(report: &AuditReport, path: P) -> Result<(), AuditError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).map_err(|source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, severity: Severity) -> Finding {
        Finding {
            id: id.to_string(),
            category: FindingCategory::SecurityHeaders,
            severity,
            title: id.to_string(),
            detail: String::new(),
            recommendation: String::new(),
        }
    }

    #[test]
    fn report_sorts_findings_and_counts_severities() {
        let report = AuditReport::new(
            "http://127.0.0.1:8080/".to_string(),
            vec!["security_headers".to_string()],
            vec![
                finding("low", Severity::Low),
                finding("critical", Severity::Critical),
                finding("medium", Severity::Medium),
                finding("second-low", Severity::Low),
            ],
        );

        let order: Vec<&str> = report.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(order, vec!["critical", "medium", "low", "second-low"]);
        assert_eq!(report.summary.critical, 1);
        assert_eq!(report.summary.low, 2);
        assert!(report.summary.has_blocking_issues());
    }

    #[test]
    fn write_report_emits_pretty_json() {
        let report = AuditReport::new("http://localhost/".to_string(), Vec::new(), Vec::new());
        let path = std::env::temp_dir().join(format!("audit-report-{}.json", std::process::id()));

        write_report(&report, &path).expect("report written");
        let raw = fs::read_to_string(&path).expect("report readable");
        let parsed: AuditReport = serde_json::from_str(&raw).expect("report parses");
        let _ = fs::remove_file(&path);

        assert_eq!(parsed.target, "http://localhost/");
        assert!(!parsed.summary.has_blocking_issues());
    }
}
