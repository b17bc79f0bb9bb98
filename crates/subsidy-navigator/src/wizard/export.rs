//! Spreadsheet-ready export of the collected document answers.

use std::borrow::Cow;

use serde::Serialize;

use super::completion::{is_complete, FormData};
use crate::catalog::{DocumentId, DocumentRequirement, ProgramProfile};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode CSV export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV export: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV export is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedAnswer {
    pub question_id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedDocument {
    pub document_id: DocumentId,
    pub name: String,
    pub category: String,
    pub complete: bool,
    pub answers: Vec<ExportedAnswer>,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    program: &'a str,
    document_id: &'a str,
    document_name: &'a str,
    category: &'a str,
    question_id: &'a str,
    question: &'a str,
    answer: &'a str,
    document_complete: bool,
}

/// Documents in resolved order with every template question, answered or not.
pub fn export_documents(requirements: &[&DocumentRequirement], data: &FormData) -> Vec<ExportedDocument> {
    requirements
        .iter()
        .map(|requirement| {
            let entry = data.answers_for(&requirement.id);
            ExportedDocument {
                document_id: requirement.id.clone(),
                name: requirement.name.clone(),
                category: requirement.category.clone(),
                complete: is_complete(requirement, entry),
                answers: requirement
                    .template_questions
                    .iter()
                    .map(|question| ExportedAnswer {
                        question_id: question.id.clone(),
                        question: question.prompt.clone(),
                        answer: entry
                            .and_then(|answers| answers.get(&question.id))
                            .cloned()
                            .unwrap_or_default(),
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Spreadsheet apps evaluate cells starting with these as formulas, and
/// strip a leading tab or carriage return before doing so.
const FORMULA_PREFIXES: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

fn neutralize_formula(value: &str) -> Cow<'_, str> {
    if value.starts_with(FORMULA_PREFIXES) {
        Cow::Owned(format!("'{value}"))
    } else {
        Cow::Borrowed(value)
    }
}

/// One row per template question, prefixed with a UTF-8 BOM so Excel detects the encoding.
pub fn to_csv(
    program: &ProgramProfile,
    requirements: &[&DocumentRequirement],
    data: &FormData,
) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for document in export_documents(requirements, data) {
        for answer in &document.answers {
            writer.serialize(CsvRow {
                program: &program.name,
                document_id: document.document_id.as_str(),
                document_name: &document.name,
                category: &document.category,
                question_id: &answer.question_id,
                question: &answer.question,
                answer: &neutralize_formula(&answer.answer),
                document_complete: document.complete,
            })?;
        }
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    let body = String::from_utf8(bytes)?;
    Ok(format!("\u{feff}{body}"))
}
