use crate::infra::{parse_answer, InMemorySessionRepository};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use subsidy_navigator::audit::{AuditReport, SecurityAuditor, REPORT_PATH};
use subsidy_navigator::catalog::{ConditionKey, Frame, ProgramId, SubsidyCatalog};
use subsidy_navigator::config::AppConfig;
use subsidy_navigator::error::AppError;
use subsidy_navigator::telemetry;
use subsidy_navigator::wizard::{Answer, ConditionFlags, WizardService};

#[derive(Args, Debug)]
pub(crate) struct MatchArgs {
    /// Questionnaire answer as `question_id=option`; repeat for each question
    #[arg(long = "answer", value_parser = parse_answer)]
    pub(crate) answers: Vec<Answer>,
}

#[derive(Args, Debug)]
pub(crate) struct RequirementsArgs {
    /// Program identifier, e.g. `it_donyu`
    #[arg(long)]
    pub(crate) program: String,
    /// Application frame; omit to list only documents every frame needs
    #[arg(long)]
    pub(crate) frame: Option<String>,
    /// Condition key that applies to the applicant; repeat as needed
    #[arg(long = "condition")]
    pub(crate) conditions: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct AuditArgs {
    /// Base URL of the API under test
    pub(crate) base_url: String,
    /// Bearer token sent with probes that need an authenticated session
    #[arg(long)]
    pub(crate) token: Option<String>,
    /// Report destination
    #[arg(long, default_value = REPORT_PATH)]
    pub(crate) output: PathBuf,
}

type CliService = WizardService<InMemorySessionRepository>;

fn load_service() -> Result<CliService, AppError> {
    let config = AppConfig::load()?;
    let catalog = SubsidyCatalog::load(&config.catalog)?;
    let service = WizardService::new(
        Arc::new(catalog),
        Arc::new(InMemorySessionRepository::default()),
    )?;
    Ok(service)
}

pub(crate) fn run_match(args: MatchArgs) -> Result<(), AppError> {
    let service = load_service()?;
    println!("{}", render_matches(&service, &args.answers)?);
    Ok(())
}

pub(crate) fn run_requirements(args: RequirementsArgs) -> Result<(), AppError> {
    let service = load_service()?;
    println!("{}", render_requirements(&service, &args)?);
    Ok(())
}

pub(crate) async fn run_audit(args: AuditArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let auditor = SecurityAuditor::new(&args.base_url, args.token)?;
    let report = auditor.run_and_write_report(&args.output).await?;

    println!("{}", render_audit_summary(&report));
    println!("Report written to {}", args.output.display());
    Ok(())
}

pub(crate) fn render_matches(service: &CliService, answers: &[Answer]) -> Result<String, AppError> {
    for answer in answers {
        service.validate_answer(answer)?;
    }

    let mut lines = vec![format!("Subsidy matches ({} answers)", answers.len())];
    for (rank, entry) in service.score(answers).iter().enumerate() {
        lines.push(format!(
            "{:>2}. {} {} ({}) score {:>3} [{}]",
            rank + 1,
            entry.icon,
            entry.name,
            entry.program,
            entry.score,
            entry.level.label()
        ));
    }
    Ok(lines.join("\n"))
}

pub(crate) fn render_requirements(
    service: &CliService,
    args: &RequirementsArgs,
) -> Result<String, AppError> {
    let program = ProgramId::new(args.program.as_str());
    let frame = args.frame.as_deref().map(Frame::new).unwrap_or_else(Frame::unset);
    let conditions: ConditionFlags = args
        .conditions
        .iter()
        .map(|key| (ConditionKey::new(key.as_str()), true))
        .collect();

    let resolved = service.resolve(&program, &frame, &conditions)?;
    let frame_label = if resolved.frame.is_unset() {
        "(none)".to_string()
    } else {
        resolved.frame.to_string()
    };

    let mut lines = vec![format!(
        "Required documents for {program} / frame {frame_label}: {}",
        resolved.documents.len()
    )];
    if let Some(warning) = &resolved.warning {
        lines.push(format!("warning: {warning}"));
    }
    for document in &resolved.documents {
        lines.push(format!(
            "- [{}] {} ({}) :: {}",
            document.requirement.category,
            document.requirement.name,
            document.requirement.id,
            document.reason_label
        ));
        for question in &document.requirement.template_questions {
            lines.push(format!("    {}: {}", question.id, question.prompt));
        }
    }
    Ok(lines.join("\n"))
}

pub(crate) fn render_audit_summary(report: &AuditReport) -> String {
    let summary = &report.summary;
    let mut lines = vec![
        format!("Security audit of {}", report.target),
        format!("Checks run: {}", report.checks_run.join(", ")),
        format!(
            "Findings: {} critical, {} high, {} medium, {} low, {} info",
            summary.critical, summary.high, summary.medium, summary.low, summary.info
        ),
    ];
    for finding in &report.findings {
        lines.push(format!(
            "  [{}] {}: {}",
            finding.severity.label(),
            finding.title,
            finding.detail
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use subsidy_navigator::audit::{Finding, FindingCategory, Severity};

    fn standard_service() -> CliService {
        WizardService::new(
            Arc::new(SubsidyCatalog::standard()),
            Arc::new(InMemorySessionRepository::default()),
        )
        .expect("standard catalog is valid")
    }

    #[test]
    fn match_output_ranks_programs() {
        let service = standard_service();
        let answers = vec![
            Answer::new("business_type", "food"),
            Answer::new("employee_count", "micro"),
            Answer::new("investment_purpose", "sales_channel"),
            Answer::new("budget", "under_500k"),
            Answer::new("digital_maturity", "paper_based"),
        ];

        let output = render_matches(&service, &answers).expect("renders");
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("(jizokuka) score 100"));
        assert!(lines[1].contains("高い適合度"));
    }

    #[test]
    fn match_output_rejects_unknown_option() {
        let service = standard_service();
        let answers = vec![Answer::new("budget", "unlimited")];

        let err = render_matches(&service, &answers).expect_err("invalid option");
        assert!(err.to_string().contains("unlimited"));
    }

    #[test]
    fn requirements_output_lists_conditional_documents() {
        let service = standard_service();
        let args = RequirementsArgs {
            program: "it_donyu".to_string(),
            frame: Some("security".to_string()),
            conditions: vec!["is_sole_proprietor".to_string()],
        };

        let output = render_requirements(&service, &args).expect("renders");

        assert!(output.starts_with("Required documents for it_donyu / frame security: 6"));
        assert!(output.contains("(tax_return)"));
        assert!(output.contains("(security_service_plan)"));
        assert!(!output.contains("(corporate_registry)"));
    }

    #[test]
    fn requirements_output_without_frame_lists_common_documents() {
        let service = standard_service();
        let args = RequirementsArgs {
            program: "monozukuri".to_string(),
            frame: None,
            conditions: Vec::new(),
        };

        let output = render_requirements(&service, &args).expect("renders");
        assert!(output.starts_with("Required documents for monozukuri / frame (none): 3"));
    }

    #[test]
    fn requirements_output_warns_about_foreign_frame() {
        let service = standard_service();
        let args = RequirementsArgs {
            program: "monozukuri".to_string(),
            frame: Some("digital".to_string()),
            conditions: Vec::new(),
        };

        let output = render_requirements(&service, &args).expect("renders");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Required documents for monozukuri / frame (none): 3");
        assert!(lines[1].starts_with("warning: frame 'digital'"));
    }

    #[test]
    fn requirements_output_rejects_unknown_program() {
        let service = standard_service();
        let args = RequirementsArgs {
            program: "unknown".to_string(),
            frame: None,
            conditions: Vec::new(),
        };

        assert!(render_requirements(&service, &args).is_err());
    }

    #[test]
    fn audit_summary_lists_findings() {
        let report = AuditReport::new(
            "http://127.0.0.1:8080/".to_string(),
            vec!["security_headers".to_string()],
            vec![Finding {
                id: "headers.missing.x-frame-options".to_string(),
                category: FindingCategory::SecurityHeaders,
                severity: Severity::Medium,
                title: "Missing `x-frame-options` header".to_string(),
                detail: "absent".to_string(),
                recommendation: "add it".to_string(),
            }],
        );

        let output = render_audit_summary(&report);
        assert!(output.contains("0 critical, 0 high, 1 medium"));
        assert!(output.contains("[MEDIUM] Missing `x-frame-options` header"));
    }
}
