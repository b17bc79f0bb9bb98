use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::completion::FormData;
use super::requirements::ConditionFlags;
use super::scoring::{upsert_answer, Answer};
use crate::catalog::{Frame, ProgramId};

/// Identifier wrapper for wizard sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Where the applicant is in the wizard: score, select, resolve, fill, export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Questions,
    SelectProgram,
    SelectFrame,
    FillDocuments,
    Export,
}

impl WizardStep {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Questions => "質問に回答",
            Self::SelectProgram => "補助金を選択",
            Self::SelectFrame => "申請枠を選択",
            Self::FillDocuments => "書類の内容を入力",
            Self::Export => "書き出し",
        }
    }
}

/// One applicant's pass through the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    pub id: SessionId,
    pub answers: Vec<Answer>,
    pub selected_program: Option<ProgramId>,
    pub frame: Frame,
    pub conditions: ConditionFlags,
    pub form_data: FormData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            answers: Vec::new(),
            selected_program: None,
            frame: Frame::unset(),
            conditions: ConditionFlags::new(),
            form_data: FormData::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Re-answering a question replaces its answer without moving it.
    pub fn record_answer(&mut self, answer: Answer) {
        upsert_answer(&mut self.answers, answer);
    }

    /// Changing program invalidates frame, conditions, and typed answers.
    pub fn select_program(&mut self, program: ProgramId) {
        if self.selected_program.as_ref() != Some(&program) {
            self.frame = Frame::unset();
            self.conditions = ConditionFlags::new();
            self.form_data = FormData::new();
        }
        self.selected_program = Some(program);
    }

    pub fn step(&self, question_count: usize, documents_complete: bool) -> WizardStep {
        if self.answers.len() < question_count {
            WizardStep::Questions
        } else if self.selected_program.is_none() {
            WizardStep::SelectProgram
        } else if self.frame.is_unset() {
            WizardStep::SelectFrame
        } else if !documents_complete {
            WizardStep::FillDocuments
        } else {
            WizardStep::Export
        }
    }
}
