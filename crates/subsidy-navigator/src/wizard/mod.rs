//! Wizard flow: score the answers, select a program, resolve the documents it
//! needs, collect the free-text answers, and export them.

pub mod completion;
pub mod export;
pub mod repository;
pub mod requirements;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod views;

#[cfg(test)]
mod tests;

pub use completion::{completion_count, is_complete, CompletionSummary, DocumentAnswers, FormData};
pub use export::{export_documents, to_csv, ExportError, ExportedDocument};
pub use repository::{RepositoryError, SessionRepository};
pub use requirements::{resolve, ConditionFlags, InclusionReason, ResolveError};
pub use router::wizard_router;
pub use scoring::{
    latest_per_question, Answer, MatchLevel, ScoreContribution, ScoringEngine, SubsidyMatch,
};
pub use service::{SelectionUpdate, WizardError, WizardService};
pub use session::{SessionId, WizardSession, WizardStep};
