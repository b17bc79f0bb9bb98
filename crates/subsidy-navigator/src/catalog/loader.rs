use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::{
    CatalogError, ConditionQuestion, DocumentCatalog, DocumentRequirement, Frame, FrameRule,
    OrderedEntries, ProgramProfile, QuestionSet, SubsidyCatalog,
};

const QUESTIONS_FILE: &str = "questions.json";
const PROGRAMS_FILE: &str = "programs.json";
const DOCUMENTS_DIR: &str = "documents";
const DECISION_RULES_DIR: &str = "decision_rules";

#[derive(Debug, Deserialize)]
struct ProgramsFile {
    programs: Vec<ProgramProfile>,
}

#[derive(Debug, Deserialize)]
struct DocumentsFile {
    documents: Vec<DocumentRequirement>,
    #[serde(default)]
    conditions: Vec<ConditionQuestion>,
}

#[derive(Debug, Deserialize)]
struct DecisionRulesFile {
    #[serde(default)]
    frames: OrderedEntries<String>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn program_file(dir: &Path, subdir: &str, program: &str) -> PathBuf {
    dir.join(subdir).join(format!("{program}.json"))
}

impl SubsidyCatalog {
    /// Reads `questions.json`, `programs.json`, and the per-program
    /// `documents/` and `decision_rules/` files beneath `dir`.
    ///
    /// Programs without a documents file have no catalog; requirement lookups
    /// for them report an unknown program.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let question_set: QuestionSet = read_json(&dir.join(QUESTIONS_FILE))?;
        let ProgramsFile { programs } = read_json(&dir.join(PROGRAMS_FILE))?;

        let mut catalogs = Vec::new();
        for profile in &programs {
            let documents_path = program_file(dir, DOCUMENTS_DIR, profile.id.as_str());
            if !documents_path.is_file() {
                debug!(program = %profile.id, "no document catalog on disk");
                continue;
            }
            let DocumentsFile {
                documents,
                conditions,
            } = read_json(&documents_path)?;

            let rules_path = program_file(dir, DECISION_RULES_DIR, profile.id.as_str());
            let frames = if rules_path.is_file() {
                let rules: DecisionRulesFile = read_json(&rules_path)?;
                rules
                    .frames
                    .iter()
                    .map(|(frame, description)| FrameRule {
                        frame: Frame::new(frame),
                        description: description.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            };

            catalogs.push(DocumentCatalog {
                program: profile.id.clone(),
                documents,
                conditions,
                frames,
            });
        }

        let catalog = SubsidyCatalog::new(question_set, programs, catalogs)?;
        info!(
            dir = %dir.display(),
            questions = catalog.questions().len(),
            programs = catalog.programs().len(),
            "loaded subsidy catalog"
        );
        Ok(catalog)
    }
}
