//! Static configuration consumed by the wizard: the scoring question set, the
//! per-program weight table and display metadata, and the document catalogs.
//!
//! Everything here is loaded once and shared read-only; nothing mutates a
//! catalog after [`SubsidyCatalog::validate`] has accepted it.

mod loader;
mod ordered;
mod standard;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::CatalogConfig;

pub use ordered::OrderedEntries;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a subsidy program (e.g. `it_donyu`).
    ProgramId
);
string_id!(
    /// Identifier of a document within a program's catalog.
    DocumentId
);
string_id!(
    /// Sub-program variant chosen by the applicant. The empty token means unset.
    Frame
);
string_id!(ConditionKey);

impl Frame {
    pub fn unset() -> Self {
        Self(String::new())
    }

    pub fn is_unset(&self) -> bool {
        self.0.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
}

/// One scoring question with its closed set of answer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn option(&self, value: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|option| option.value == value)
    }
}

/// Score boundaries for the qualitative match buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchThresholds {
    pub high_match: u8,
    pub medium_match: u8,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            high_match: 70,
            medium_match: 40,
        }
    }
}

pub type TokenWeights = BTreeMap<String, i32>;

/// Program id -> answer token -> weight, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(OrderedEntries<TokenWeights>);

impl WeightTable {
    pub fn new(entries: Vec<(ProgramId, TokenWeights)>) -> Self {
        Self(OrderedEntries(
            entries
                .into_iter()
                .map(|(program, weights)| (program.0, weights))
                .collect(),
        ))
    }

    pub fn programs(&self) -> impl Iterator<Item = (ProgramId, &TokenWeights)> {
        self.0
            .iter()
            .map(|(program, weights)| (ProgramId::new(program), weights))
    }

    /// Unknown programs and tokens weigh nothing.
    pub fn weight(&self, program: &ProgramId, token: &str) -> i32 {
        self.0
            .get(program.as_str())
            .and_then(|weights| weights.get(token))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Contents of `questions.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
    pub scoring_weights: WeightTable,
    #[serde(default)]
    pub threshold_scores: MatchThresholds,
}

/// Display metadata attached to every scored program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramProfile {
    pub id: ProgramId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateQuestion {
    pub id: String,
    pub prompt: String,
}

impl TemplateQuestion {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTemplateQuestion {
    Prompt(String),
    Keyed { id: String, prompt: String },
}

/// Accepts plain prompt strings (ids `q1`, `q2`, ... by position) or `{id, prompt}` objects.
fn template_questions<'de, D>(deserializer: D) -> Result<Vec<TemplateQuestion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawTemplateQuestion>::deserialize(deserializer)?;
    let questions: Vec<TemplateQuestion> = raw
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            RawTemplateQuestion::Prompt(prompt) => {
                TemplateQuestion::new(format!("q{}", index + 1), prompt)
            }
            RawTemplateQuestion::Keyed { id, prompt } => TemplateQuestion::new(id, prompt),
        })
        .collect();

    let mut seen = HashSet::new();
    for question in &questions {
        if !seen.insert(question.id.as_str()) {
            return Err(serde::de::Error::custom(format!(
                "duplicate template question id '{}'",
                question.id
            )));
        }
    }

    Ok(questions)
}

/// Catalog entry describing a supporting document and when it is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequirement {
    pub id: DocumentId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_for_all: bool,
    #[serde(default)]
    pub required_for_frames: Vec<Frame>,
    #[serde(default)]
    pub required_when: Option<ConditionKey>,
    #[serde(default, deserialize_with = "template_questions")]
    pub template_questions: Vec<TemplateQuestion>,
}

impl DocumentRequirement {
    /// Entries without any activation rule can never be resolved.
    pub fn has_activation_rule(&self) -> bool {
        self.required_for_all || !self.required_for_frames.is_empty() || self.required_when.is_some()
    }

    pub fn template_question(&self, id: &str) -> Option<&TemplateQuestion> {
        self.template_questions
            .iter()
            .find(|question| question.id == id)
    }
}

/// Supplementary yes/no question feeding a condition flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionQuestion {
    pub key: ConditionKey,
    pub question: String,
    #[serde(default)]
    pub description: String,
}

/// Display-only explanation of a frame; never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRule {
    pub frame: Frame,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCatalog {
    pub program: ProgramId,
    pub documents: Vec<DocumentRequirement>,
    #[serde(default)]
    pub conditions: Vec<ConditionQuestion>,
    #[serde(default)]
    pub frames: Vec<FrameRule>,
}

impl DocumentCatalog {
    pub fn document(&self, id: &DocumentId) -> Option<&DocumentRequirement> {
        self.documents.iter().find(|document| &document.id == id)
    }

    pub fn frame_rule(&self, frame: &Frame) -> Option<&FrameRule> {
        self.frames.iter().find(|rule| &rule.frame == frame)
    }
}

/// Load-time consistency failures. These indicate a broken data file, never bad user input.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid catalog JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("scoring weights reference program '{0}' which has no display metadata")]
    MissingProgramProfile(ProgramId),
    #[error("program '{0}' is declared more than once")]
    DuplicateProgram(ProgramId),
    #[error("question '{0}' is declared more than once")]
    DuplicateQuestion(String),
    #[error("document '{document}' is declared more than once for program '{program}'")]
    DuplicateDocument {
        program: ProgramId,
        document: DocumentId,
    },
    #[error(
        "document '{document}' for program '{program}' has no activation rule \
         (required_for_all, required_for_frames or required_when)"
    )]
    DeadRequirement {
        program: ProgramId,
        document: DocumentId,
    },
    #[error("thresholds must satisfy medium_match <= high_match <= 100 (high {high}, medium {medium})")]
    InvalidThresholds { high: u8, medium: u8 },
}

/// Complete, validated configuration for one deployment of the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsidyCatalog {
    question_set: QuestionSet,
    programs: Vec<ProgramProfile>,
    catalogs: Vec<DocumentCatalog>,
}

impl SubsidyCatalog {
    pub fn new(
        question_set: QuestionSet,
        programs: Vec<ProgramProfile>,
        catalogs: Vec<DocumentCatalog>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            question_set,
            programs,
            catalogs,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Directory-backed catalog when configured, the built-in one otherwise.
    pub fn load(config: &CatalogConfig) -> Result<Self, CatalogError> {
        match &config.data_dir {
            Some(dir) => Self::from_dir(dir),
            None => {
                let catalog = Self::standard();
                catalog.validate()?;
                Ok(catalog)
            }
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let thresholds = self.question_set.threshold_scores;
        if thresholds.medium_match > thresholds.high_match || thresholds.high_match > 100 {
            return Err(CatalogError::InvalidThresholds {
                high: thresholds.high_match,
                medium: thresholds.medium_match,
            });
        }

        let mut question_ids = HashSet::new();
        for question in &self.question_set.questions {
            if !question_ids.insert(question.id.as_str()) {
                return Err(CatalogError::DuplicateQuestion(question.id.clone()));
            }
        }

        let mut program_ids = HashSet::new();
        for profile in &self.programs {
            if !program_ids.insert(&profile.id) {
                return Err(CatalogError::DuplicateProgram(profile.id.clone()));
            }
        }

        for (program, _) in self.question_set.scoring_weights.programs() {
            if !program_ids.contains(&program) {
                return Err(CatalogError::MissingProgramProfile(program));
            }
        }

        let mut catalog_ids = HashSet::new();
        for catalog in &self.catalogs {
            if !program_ids.contains(&catalog.program) {
                return Err(CatalogError::MissingProgramProfile(catalog.program.clone()));
            }
            if !catalog_ids.insert(&catalog.program) {
                return Err(CatalogError::DuplicateProgram(catalog.program.clone()));
            }

            let mut document_ids = HashSet::new();
            for document in &catalog.documents {
                if !document_ids.insert(&document.id) {
                    return Err(CatalogError::DuplicateDocument {
                        program: catalog.program.clone(),
                        document: document.id.clone(),
                    });
                }
                if !document.has_activation_rule() {
                    return Err(CatalogError::DeadRequirement {
                        program: catalog.program.clone(),
                        document: document.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn questions(&self) -> &[Question] {
        &self.question_set.questions
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.question_set
            .questions
            .iter()
            .find(|question| question.id == id)
    }

    pub fn weights(&self) -> &WeightTable {
        &self.question_set.scoring_weights
    }

    pub fn thresholds(&self) -> MatchThresholds {
        self.question_set.threshold_scores
    }

    pub fn programs(&self) -> &[ProgramProfile] {
        &self.programs
    }

    pub fn program(&self, id: &ProgramId) -> Option<&ProgramProfile> {
        self.programs.iter().find(|profile| &profile.id == id)
    }

    pub fn documents_for(&self, program: &ProgramId) -> Option<&DocumentCatalog> {
        self.catalogs
            .iter()
            .find(|catalog| &catalog.program == program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question_set(weights: WeightTable) -> QuestionSet {
        QuestionSet {
            questions: vec![Question {
                id: "q1".to_string(),
                question: "業種は？".to_string(),
                options: vec![AnswerOption {
                    value: "general".to_string(),
                    label: "一般".to_string(),
                    icon: String::new(),
                    description: String::new(),
                }],
            }],
            scoring_weights: weights,
            threshold_scores: MatchThresholds::default(),
        }
    }

    fn profile(id: &str) -> ProgramProfile {
        ProgramProfile {
            id: ProgramId::new(id),
            name: id.to_uppercase(),
            description: format!("{id} program"),
            icon: "*".to_string(),
        }
    }

    fn weights(programs: &[&str]) -> WeightTable {
        WeightTable::new(
            programs
                .iter()
                .map(|program| {
                    (
                        ProgramId::new(*program),
                        TokenWeights::from([("general".to_string(), 10)]),
                    )
                })
                .collect(),
        )
    }

    fn document(id: &str) -> DocumentRequirement {
        DocumentRequirement {
            id: DocumentId::new(id),
            name: id.to_string(),
            category: "basic".to_string(),
            description: String::new(),
            required_for_all: true,
            required_for_frames: Vec::new(),
            required_when: None,
            template_questions: Vec::new(),
        }
    }

    #[test]
    fn standard_catalog_passes_validation() {
        let catalog = SubsidyCatalog::standard();
        catalog.validate().expect("built-in catalog is consistent");
        assert!(!catalog.questions().is_empty());
        for (program, _) in catalog.weights().programs() {
            assert!(catalog.program(&program).is_some());
            assert!(catalog.documents_for(&program).is_some());
        }
    }

    #[test]
    fn weight_program_without_profile_fails_fast() {
        let error = SubsidyCatalog::new(
            question_set(weights(&["it_donyu", "monozukuri"])),
            vec![profile("it_donyu")],
            Vec::new(),
        )
        .expect_err("missing metadata rejected");

        match error {
            CatalogError::MissingProgramProfile(program) => {
                assert_eq!(program, ProgramId::new("monozukuri"))
            }
            other => panic!("expected missing profile, got {other:?}"),
        }
    }

    #[test]
    fn dead_requirements_are_rejected_at_load() {
        let mut dead = document("orphan");
        dead.required_for_all = false;
        let error = SubsidyCatalog::new(
            question_set(weights(&["it_donyu"])),
            vec![profile("it_donyu")],
            vec![DocumentCatalog {
                program: ProgramId::new("it_donyu"),
                documents: vec![document("base"), dead],
                conditions: Vec::new(),
                frames: Vec::new(),
            }],
        )
        .expect_err("dead entry rejected");

        assert!(matches!(
            error,
            CatalogError::DeadRequirement { ref document, .. } if document.as_str() == "orphan"
        ));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut set = question_set(weights(&["it_donyu"]));
        set.threshold_scores = MatchThresholds {
            high_match: 30,
            medium_match: 60,
        };
        let error = SubsidyCatalog::new(set, vec![profile("it_donyu")], Vec::new())
            .expect_err("thresholds rejected");
        assert!(matches!(error, CatalogError::InvalidThresholds { .. }));
    }

    #[test]
    fn duplicate_documents_are_rejected() {
        let error = SubsidyCatalog::new(
            question_set(weights(&["it_donyu"])),
            vec![profile("it_donyu")],
            vec![DocumentCatalog {
                program: ProgramId::new("it_donyu"),
                documents: vec![document("base"), document("base")],
                conditions: Vec::new(),
                frames: Vec::new(),
            }],
        )
        .expect_err("duplicate rejected");
        assert!(matches!(error, CatalogError::DuplicateDocument { .. }));
    }

    #[test]
    fn template_questions_accept_strings_and_objects() {
        let json = r#"{
            "id": "plan",
            "name": "事業計画書",
            "category": "計画",
            "required_for_all": true,
            "template_questions": ["現状の課題は？", {"id": "goal", "prompt": "導入後の目標は？"}, "効果は？"]
        }"#;
        let requirement: DocumentRequirement = serde_json::from_str(json).expect("parses");
        let ids: Vec<&str> = requirement
            .template_questions
            .iter()
            .map(|question| question.id.as_str())
            .collect();
        assert_eq!(ids, vec!["q1", "goal", "q3"]);
        assert_eq!(requirement.description, "");
        assert!(requirement.required_when.is_none());
    }

    #[test]
    fn duplicate_template_question_ids_fail_to_parse() {
        let json = r#"{
            "id": "plan", "name": "x", "category": "y", "required_for_all": true,
            "template_questions": ["first", {"id": "q1", "prompt": "clash"}]
        }"#;
        assert!(serde_json::from_str::<DocumentRequirement>(json).is_err());
    }

    #[test]
    fn weight_lookup_defaults_to_zero() {
        let table = weights(&["it_donyu"]);
        assert_eq!(table.weight(&ProgramId::new("it_donyu"), "general"), 10);
        assert_eq!(table.weight(&ProgramId::new("it_donyu"), "unknown"), 0);
        assert_eq!(table.weight(&ProgramId::new("missing"), "general"), 0);
    }

    #[test]
    fn unset_frame_detects_blank_tokens() {
        assert!(Frame::unset().is_unset());
        assert!(Frame::new("  ").is_unset());
        assert!(!Frame::new("digital").is_unset());
    }
}
