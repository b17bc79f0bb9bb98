use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::completion::{completion_count, is_complete, CompletionSummary, DocumentAnswers};
use super::export::{self, ExportError};
use super::repository::{RepositoryError, SessionRepository};
use super::requirements::{ConditionFlags, ResolveError};
use super::scoring::{Answer, ScoringEngine, SubsidyMatch};
use super::session::{SessionId, WizardSession};
use super::views::{
    DocumentProgressEntry, ProgramDetailView, ProgressView, QuestionSetView,
    RequiredDocumentView, ResolvedRequirementsView, SessionView,
};
use crate::catalog::{
    CatalogError, DocumentId, DocumentRequirement, Frame, ProgramId, SubsidyCatalog,
};

/// Service composing the catalog, scoring engine, and session repository.
pub struct WizardService<R> {
    catalog: Arc<SubsidyCatalog>,
    engine: Arc<ScoringEngine>,
    repository: Arc<R>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

/// Program, frame, and condition choices submitted together from the selection screen.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct SelectionUpdate {
    pub program: ProgramId,
    #[serde(default)]
    pub frame: Option<Frame>,
    #[serde(default)]
    pub conditions: Option<ConditionFlags>,
}

impl<R> WizardService<R>
where
    R: SessionRepository + 'static,
{
    pub fn new(catalog: Arc<SubsidyCatalog>, repository: Arc<R>) -> Result<Self, CatalogError> {
        catalog.validate()?;
        let engine = Arc::new(ScoringEngine::from_catalog(&catalog)?);
        Ok(Self {
            catalog,
            engine,
            repository,
        })
    }

    pub fn catalog(&self) -> &SubsidyCatalog {
        &self.catalog
    }

    pub fn question_set(&self) -> QuestionSetView {
        QuestionSetView {
            questions: self.catalog.questions().to_vec(),
            thresholds: self.engine.thresholds(),
        }
    }

    pub fn program_detail(&self, program: &ProgramId) -> Result<ProgramDetailView, WizardError> {
        let profile = self
            .catalog
            .program(program)
            .ok_or_else(|| ResolveError::UnknownProgram(program.clone()))?;
        let documents = self.catalog.documents_for(program);

        Ok(ProgramDetailView {
            profile: profile.clone(),
            frames: documents.map(|c| c.frames.clone()).unwrap_or_default(),
            conditions: documents.map(|c| c.conditions.clone()).unwrap_or_default(),
            document_count: documents.map(|c| c.documents.len()).unwrap_or(0),
        })
    }

    /// Stateless ranking for callers that keep answers client-side.
    pub fn score(&self, answers: &[Answer]) -> Vec<SubsidyMatch> {
        self.engine.score(answers)
    }

    /// Stateless resolution for callers that keep selections client-side.
    ///
    /// Only an unknown program is an error. A frame the program does not offer
    /// resolves as unset, so the documents every frame needs are still listed.
    pub fn resolve(
        &self,
        program: &ProgramId,
        frame: &Frame,
        conditions: &ConditionFlags,
    ) -> Result<ResolvedRequirementsView, WizardError> {
        let (frame, warning) = match self.ensure_frame(program, frame) {
            Ok(()) => (frame.clone(), None),
            Err(WizardError::UnknownFrame { .. }) => {
                debug!(program = %program, frame = %frame, "ignoring unknown frame");
                let warning = format!(
                    "frame '{frame}' is not offered by program '{program}'; \
                     only documents required for every frame are listed"
                );
                (Frame::unset(), Some(warning))
            }
            Err(error) => return Err(error),
        };
        let resolved = self.catalog.requirements_for(program, &frame, conditions)?;
        let documents = document_views(&resolved, &frame, conditions, None);
        Ok(ResolvedRequirementsView {
            frame,
            documents,
            warning,
        })
    }

    pub fn start(&self) -> Result<WizardSession, WizardError> {
        let session = WizardSession::new(next_session_id(), Utc::now());
        let stored = self.repository.insert(session)?;
        info!(session = %stored.id.0, "wizard session started");
        Ok(stored)
    }

    pub fn get(&self, id: &SessionId) -> Result<WizardSession, WizardError> {
        let session = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(session)
    }

    pub fn view(&self, session: &WizardSession) -> SessionView {
        let completion = self.completion(session).ok().flatten();
        let documents_complete = completion
            .map(|summary| summary.is_fully_complete())
            .unwrap_or(false);
        let step = session.step(self.catalog.questions().len(), documents_complete);

        SessionView {
            id: session.id.clone(),
            step,
            step_label: step.label(),
            answers: session.answers.clone(),
            selected_program: session.selected_program.clone(),
            frame: session.frame.clone(),
            conditions: session.conditions.clone(),
            completion,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }

    /// Only tokens offered by the question are accepted.
    pub fn validate_answer(&self, answer: &Answer) -> Result<(), WizardError> {
        let question = self
            .catalog
            .question(&answer.question_id)
            .ok_or_else(|| WizardError::UnknownQuestion(answer.question_id.clone()))?;
        if question.option(&answer.selected_value).is_none() {
            return Err(WizardError::InvalidOption {
                question: answer.question_id.clone(),
                value: answer.selected_value.clone(),
            });
        }
        Ok(())
    }

    pub fn record_answer(
        &self,
        id: &SessionId,
        answer: Answer,
    ) -> Result<WizardSession, WizardError> {
        self.validate_answer(&answer)?;

        let mut session = self.get(id)?;
        debug!(session = %id.0, question = %answer.question_id, "answer recorded");
        session.record_answer(answer);
        self.save(session)
    }

    pub fn matches(&self, id: &SessionId) -> Result<Vec<SubsidyMatch>, WizardError> {
        let session = self.get(id)?;
        Ok(self.engine.score(&session.answers))
    }

    pub fn select_program(
        &self,
        id: &SessionId,
        program: ProgramId,
    ) -> Result<WizardSession, WizardError> {
        self.apply_selection(
            id,
            SelectionUpdate {
                program,
                frame: None,
                conditions: None,
            },
        )
    }

    pub fn select_frame(&self, id: &SessionId, frame: Frame) -> Result<WizardSession, WizardError> {
        let mut session = self.get(id)?;
        let program = session
            .selected_program
            .clone()
            .ok_or(WizardError::ProgramNotSelected)?;
        self.ensure_frame(&program, &frame)?;
        session.frame = frame;
        self.save(session)
    }

    pub fn set_conditions(
        &self,
        id: &SessionId,
        conditions: ConditionFlags,
    ) -> Result<WizardSession, WizardError> {
        let mut session = self.get(id)?;
        if session.selected_program.is_none() {
            return Err(WizardError::ProgramNotSelected);
        }
        session.conditions = conditions;
        self.save(session)
    }

    pub fn apply_selection(
        &self,
        id: &SessionId,
        update: SelectionUpdate,
    ) -> Result<WizardSession, WizardError> {
        let SelectionUpdate {
            program,
            frame,
            conditions,
        } = update;

        if self.catalog.documents_for(&program).is_none() {
            return Err(ResolveError::UnknownProgram(program).into());
        }
        if let Some(frame) = &frame {
            self.ensure_frame(&program, frame)?;
        }

        let mut session = self.get(id)?;
        info!(session = %id.0, program = %program, "program selected");
        session.select_program(program);
        if let Some(frame) = frame {
            session.frame = frame;
        }
        if let Some(conditions) = conditions {
            session.conditions = conditions;
        }
        self.save(session)
    }

    pub fn requirements(&self, id: &SessionId) -> Result<Vec<RequiredDocumentView>, WizardError> {
        let session = self.get(id)?;
        let program = session
            .selected_program
            .as_ref()
            .ok_or(WizardError::ProgramNotSelected)?;
        let resolved =
            self.catalog
                .requirements_for(program, &session.frame, &session.conditions)?;
        Ok(document_views(
            &resolved,
            &session.frame,
            &session.conditions,
            Some(&session),
        ))
    }

    /// Merges typed answers for one resolved document.
    pub fn fill_answers(
        &self,
        id: &SessionId,
        document: DocumentId,
        answers: DocumentAnswers,
    ) -> Result<WizardSession, WizardError> {
        let mut session = self.get(id)?;
        let program = session
            .selected_program
            .clone()
            .ok_or(WizardError::ProgramNotSelected)?;
        let resolved =
            self.catalog
                .requirements_for(&program, &session.frame, &session.conditions)?;
        let requirement = resolved
            .iter()
            .find(|requirement| requirement.id == document)
            .ok_or_else(|| WizardError::UnknownDocument(document.clone()))?;

        if let Some(question) = answers
            .keys()
            .find(|question| requirement.template_question(question).is_none())
        {
            return Err(WizardError::UnknownTemplateQuestion {
                document,
                question: question.clone(),
            });
        }

        session.form_data.merge(document, answers);
        self.save(session)
    }

    pub fn progress(&self, id: &SessionId) -> Result<ProgressView, WizardError> {
        let session = self.get(id)?;
        let program = session
            .selected_program
            .as_ref()
            .ok_or(WizardError::ProgramNotSelected)?;
        let resolved =
            self.catalog
                .requirements_for(program, &session.frame, &session.conditions)?;
        let summary = completion_count(&resolved, &session.form_data);

        let documents = resolved
            .iter()
            .map(|requirement| {
                let entry = session.form_data.answers_for(&requirement.id);
                let answered = requirement
                    .template_questions
                    .iter()
                    .filter(|question| {
                        entry
                            .and_then(|answers| answers.get(&question.id))
                            .map(|text| !text.trim().is_empty())
                            .unwrap_or(false)
                    })
                    .count();
                DocumentProgressEntry {
                    document_id: requirement.id.clone(),
                    name: requirement.name.clone(),
                    answered,
                    total: requirement.template_questions.len(),
                    complete: is_complete(requirement, entry),
                }
            })
            .collect();

        Ok(ProgressView {
            session_id: session.id.clone(),
            program: session.selected_program.clone(),
            frame: session.frame.clone(),
            summary,
            percent: summary.percent(),
            ready_for_export: !session.frame.is_unset() && summary.is_fully_complete(),
            documents,
        })
    }

    /// Export is offered regardless of completeness; blanks stay blank.
    pub fn export_csv(&self, id: &SessionId) -> Result<String, WizardError> {
        let session = self.get(id)?;
        let program = session
            .selected_program
            .as_ref()
            .ok_or(WizardError::ProgramNotSelected)?;
        let profile = self
            .catalog
            .program(program)
            .ok_or_else(|| ResolveError::UnknownProgram(program.clone()))?;
        let resolved =
            self.catalog
                .requirements_for(program, &session.frame, &session.conditions)?;
        let csv = export::to_csv(profile, &resolved, &session.form_data)?;
        info!(session = %id.0, documents = resolved.len(), "exported answers");
        Ok(csv)
    }

    fn completion(&self, session: &WizardSession) -> Result<Option<CompletionSummary>, WizardError> {
        let Some(program) = session.selected_program.as_ref() else {
            return Ok(None);
        };
        let resolved =
            self.catalog
                .requirements_for(program, &session.frame, &session.conditions)?;
        Ok(Some(completion_count(&resolved, &session.form_data)))
    }

    fn ensure_frame(&self, program: &ProgramId, frame: &Frame) -> Result<(), WizardError> {
        let catalog = self
            .catalog
            .documents_for(program)
            .ok_or_else(|| ResolveError::UnknownProgram(program.clone()))?;
        if frame.is_unset() || catalog.frames.is_empty() || catalog.frame_rule(frame).is_some() {
            Ok(())
        } else {
            Err(WizardError::UnknownFrame {
                program: program.clone(),
                frame: frame.clone(),
            })
        }
    }

    fn save(&self, mut session: WizardSession) -> Result<WizardSession, WizardError> {
        session.updated_at = Utc::now();
        self.repository.update(session.clone())?;
        Ok(session)
    }
}

fn document_views(
    resolved: &[&DocumentRequirement],
    frame: &Frame,
    conditions: &ConditionFlags,
    session: Option<&WizardSession>,
) -> Vec<RequiredDocumentView> {
    resolved
        .iter()
        .filter_map(|requirement| {
            let reason = requirement.inclusion_reason(frame, conditions)?;
            let complete = session
                .map(|session| is_complete(requirement, session.form_data.answers_for(&requirement.id)))
                .unwrap_or(false);
            Some(RequiredDocumentView {
                requirement: (*requirement).clone(),
                reason_label: reason.summary(),
                reason,
                complete,
            })
        })
        .collect()
}

/// Error raised by the wizard service.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("'{value}' is not an option for question '{question}'")]
    InvalidOption { question: String, value: String },
    #[error("frame '{frame}' is not offered by program '{program}'")]
    UnknownFrame { program: ProgramId, frame: Frame },
    #[error("select a subsidy program first")]
    ProgramNotSelected,
    #[error("document '{0}' is not required for the current selection")]
    UnknownDocument(DocumentId),
    #[error("document '{document}' has no template question '{question}'")]
    UnknownTemplateQuestion {
        document: DocumentId,
        question: String,
    },
}
