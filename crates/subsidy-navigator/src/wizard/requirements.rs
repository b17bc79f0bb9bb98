use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{ConditionKey, DocumentRequirement, Frame, ProgramId, SubsidyCatalog};

/// Answers to the supplementary yes/no questions. Missing keys read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionFlags(BTreeMap<ConditionKey, bool>);

impl ConditionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: bool) -> Self {
        self.set(ConditionKey::new(key), value);
        self
    }

    pub fn set(&mut self, key: ConditionKey, value: bool) {
        self.0.insert(key, value);
    }

    pub fn is_set(&self, key: &ConditionKey) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConditionKey, bool)> {
        self.0.iter().map(|(key, value)| (key, *value))
    }
}

impl FromIterator<(ConditionKey, bool)> for ConditionFlags {
    fn from_iter<I: IntoIterator<Item = (ConditionKey, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Why a catalog entry is part of the resolved set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InclusionReason {
    AllFrames,
    Frame(Frame),
    Condition(ConditionKey),
}

impl InclusionReason {
    pub fn summary(&self) -> String {
        match self {
            InclusionReason::AllFrames => "全ての申請枠で必要".to_string(),
            InclusionReason::Frame(frame) => format!("申請枠「{frame}」で必要"),
            InclusionReason::Condition(key) => format!("条件「{key}」に該当するため必要"),
        }
    }
}

impl DocumentRequirement {
    /// First matching activation rule; an unset frame only admits `required_for_all`.
    pub fn inclusion_reason(
        &self,
        frame: &Frame,
        conditions: &ConditionFlags,
    ) -> Option<InclusionReason> {
        if self.required_for_all {
            return Some(InclusionReason::AllFrames);
        }
        if frame.is_unset() {
            return None;
        }
        if self.required_for_frames.contains(frame) {
            return Some(InclusionReason::Frame(frame.clone()));
        }
        match &self.required_when {
            Some(key) if conditions.is_set(key) => Some(InclusionReason::Condition(key.clone())),
            _ => None,
        }
    }
}

/// Required documents for a frame and condition set, in catalog order.
pub fn resolve<'a>(
    documents: &'a [DocumentRequirement],
    frame: &Frame,
    conditions: &ConditionFlags,
) -> Vec<&'a DocumentRequirement> {
    documents
        .iter()
        .filter(|document| document.inclusion_reason(frame, conditions).is_some())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown subsidy program '{0}'")]
    UnknownProgram(ProgramId),
}

impl SubsidyCatalog {
    /// Distinguishes "program has no catalog" from "nothing is required".
    pub fn requirements_for(
        &self,
        program: &ProgramId,
        frame: &Frame,
        conditions: &ConditionFlags,
    ) -> Result<Vec<&DocumentRequirement>, ResolveError> {
        let catalog = self
            .documents_for(program)
            .ok_or_else(|| ResolveError::UnknownProgram(program.clone()))?;
        Ok(resolve(&catalog.documents, frame, conditions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DocumentId;

    fn entry(id: &str) -> DocumentRequirement {
        DocumentRequirement {
            id: DocumentId::new(id),
            name: id.to_string(),
            category: "test".to_string(),
            description: String::new(),
            required_for_all: false,
            required_for_frames: Vec::new(),
            required_when: None,
            template_questions: Vec::new(),
        }
    }

    fn abc_catalog() -> Vec<DocumentRequirement> {
        let mut a = entry("A");
        a.required_for_all = true;
        let mut b = entry("B");
        b.required_for_frames = vec![Frame::new("digital")];
        let mut c = entry("C");
        c.required_when = Some(ConditionKey::new("ceo_over_60"));
        vec![a, b, c]
    }

    fn ids(resolved: &[&DocumentRequirement]) -> Vec<String> {
        resolved.iter().map(|document| document.id.0.clone()).collect()
    }

    #[test]
    fn digital_frame_with_condition_includes_everything_in_order() {
        let catalog = abc_catalog();
        let conditions = ConditionFlags::new().with("ceo_over_60", true);
        let resolved = resolve(&catalog, &Frame::new("digital"), &conditions);
        assert_eq!(ids(&resolved), vec!["A", "B", "C"]);
    }

    #[test]
    fn normal_frame_without_conditions_keeps_only_universal_entries() {
        let catalog = abc_catalog();
        let resolved = resolve(&catalog, &Frame::new("normal"), &ConditionFlags::new());
        assert_eq!(ids(&resolved), vec!["A"]);
    }

    #[test]
    fn unset_frame_returns_required_for_all_only() {
        let catalog = abc_catalog();
        let conditions = ConditionFlags::new().with("ceo_over_60", true);
        let resolved = resolve(&catalog, &Frame::unset(), &conditions);
        assert_eq!(ids(&resolved), vec!["A"]);

        let resolved = resolve(&catalog, &Frame::unset(), &ConditionFlags::new());
        assert_eq!(ids(&resolved), vec!["A"]);
    }

    #[test]
    fn false_and_missing_conditions_do_not_activate() {
        let catalog = abc_catalog();
        let conditions = ConditionFlags::new().with("ceo_over_60", false);
        assert_eq!(ids(&resolve(&catalog, &Frame::new("normal"), &conditions)), vec!["A"]);
        let other = ConditionFlags::new().with("unrelated", true);
        assert_eq!(ids(&resolve(&catalog, &Frame::new("normal"), &other)), vec!["A"]);
    }

    #[test]
    fn universal_entries_survive_any_frame_or_conditions() {
        let catalog = SubsidyCatalog::standard();
        for program in catalog.programs() {
            let documents = &catalog
                .documents_for(&program.id)
                .expect("standard catalog present")
                .documents;
            for frame in ["", "normal", "digital", "green", "founding", "nonsense"] {
                for flag in [true, false] {
                    let conditions = ConditionFlags::new()
                        .with("ceo_over_60", flag)
                        .with("is_corporation", flag);
                    let resolved = resolve(documents, &Frame::new(frame), &conditions);
                    for universal in documents.iter().filter(|d| d.required_for_all) {
                        assert!(resolved.iter().any(|d| d.id == universal.id));
                    }
                }
            }
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let catalog = abc_catalog();
        let conditions = ConditionFlags::new().with("ceo_over_60", true);
        let first = resolve(&catalog, &Frame::new("digital"), &conditions);
        let second = resolve(&catalog, &Frame::new("digital"), &conditions);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_program_is_reported_explicitly() {
        let catalog = SubsidyCatalog::standard();
        let error = catalog
            .requirements_for(
                &ProgramId::new("jigyou_saikouchiku"),
                &Frame::new("normal"),
                &ConditionFlags::new(),
            )
            .expect_err("unknown program");
        assert_eq!(
            error,
            ResolveError::UnknownProgram(ProgramId::new("jigyou_saikouchiku"))
        );
    }

    #[test]
    fn inclusion_reason_names_the_rule() {
        let catalog = abc_catalog();
        let conditions = ConditionFlags::new().with("ceo_over_60", true);
        let frame = Frame::new("digital");
        assert_eq!(
            catalog[0].inclusion_reason(&frame, &conditions),
            Some(InclusionReason::AllFrames)
        );
        assert_eq!(
            catalog[1].inclusion_reason(&frame, &conditions),
            Some(InclusionReason::Frame(Frame::new("digital")))
        );
        assert_eq!(
            catalog[2].inclusion_reason(&frame, &conditions),
            Some(InclusionReason::Condition(ConditionKey::new("ceo_over_60")))
        );
    }
}
