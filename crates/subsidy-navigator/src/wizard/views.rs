use chrono::{DateTime, Utc};
use serde::Serialize;

use super::completion::CompletionSummary;
use super::requirements::{ConditionFlags, InclusionReason};
use super::scoring::Answer;
use super::session::{SessionId, WizardStep};
use crate::catalog::{
    ConditionQuestion, DocumentId, DocumentRequirement, Frame, FrameRule, MatchThresholds,
    ProgramId, ProgramProfile, Question,
};

#[derive(Debug, Clone, Serialize)]
pub struct QuestionSetView {
    pub questions: Vec<Question>,
    pub thresholds: MatchThresholds,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramDetailView {
    pub profile: ProgramProfile,
    pub frames: Vec<FrameRule>,
    pub conditions: Vec<ConditionQuestion>,
    pub document_count: usize,
}

/// Resolved document plus the rule that activated it and its fill status.
#[derive(Debug, Clone, Serialize)]
pub struct RequiredDocumentView {
    #[serde(flatten)]
    pub requirement: DocumentRequirement,
    pub reason: InclusionReason,
    pub reason_label: String,
    pub complete: bool,
}

/// Stateless resolution result. `frame` is the frame actually applied; a
/// frame the program does not offer is dropped and explained in `warning`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRequirementsView {
    pub frame: Frame,
    pub documents: Vec<RequiredDocumentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentProgressEntry {
    pub document_id: DocumentId,
    pub name: String,
    pub answered: usize,
    pub total: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub session_id: SessionId,
    pub program: Option<ProgramId>,
    pub frame: Frame,
    pub summary: CompletionSummary,
    pub percent: u8,
    pub ready_for_export: bool,
    pub documents: Vec<DocumentProgressEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub step: WizardStep,
    pub step_label: &'static str,
    pub answers: Vec<Answer>,
    pub selected_program: Option<ProgramId>,
    pub frame: Frame,
    pub conditions: ConditionFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
