use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{DocumentId, DocumentRequirement};

/// Free-text answers for one document, keyed by template question id.
pub type DocumentAnswers = BTreeMap<String, String>;

/// Everything the applicant has typed into the per-document forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<DocumentId, DocumentAnswers>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_answer(
        &mut self,
        document: DocumentId,
        question_id: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.0
            .entry(document)
            .or_default()
            .insert(question_id.into(), value.into());
    }

    /// Later values overwrite earlier ones; untouched questions keep their text.
    pub fn merge(&mut self, document: DocumentId, answers: DocumentAnswers) {
        self.0.entry(document).or_default().extend(answers);
    }

    pub fn answers_for(&self, document: &DocumentId) -> Option<&DocumentAnswers> {
        self.0.get(document)
    }

    pub fn answer(&self, document: &DocumentId, question_id: &str) -> Option<&str> {
        self.0
            .get(document)
            .and_then(|answers| answers.get(question_id))
            .map(String::as_str)
    }
}

fn is_answered(value: Option<&String>) -> bool {
    value.map(|text| !text.trim().is_empty()).unwrap_or(false)
}

/// Every template question needs non-blank text. A missing entry counts as unanswered.
pub fn is_complete(requirement: &DocumentRequirement, answers: Option<&DocumentAnswers>) -> bool {
    requirement
        .template_questions
        .iter()
        .all(|question| is_answered(answers.and_then(|entry| entry.get(&question.id))))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub completed: usize,
    pub total: usize,
}

impl CompletionSummary {
    /// Drives the "all documents ready" banner.
    pub fn is_fully_complete(&self) -> bool {
        self.completed == self.total
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

pub fn completion_count(requirements: &[&DocumentRequirement], data: &FormData) -> CompletionSummary {
    let completed = requirements
        .iter()
        .filter(|requirement| is_complete(requirement, data.answers_for(&requirement.id)))
        .count();

    CompletionSummary {
        completed,
        total: requirements.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateQuestion;

    fn requirement(id: &str, questions: usize) -> DocumentRequirement {
        DocumentRequirement {
            id: DocumentId::new(id),
            name: id.to_string(),
            category: "計画".to_string(),
            description: String::new(),
            required_for_all: true,
            required_for_frames: Vec::new(),
            required_when: None,
            template_questions: (0..questions)
                .map(|index| TemplateQuestion::new(format!("q{}", index + 1), "prompt"))
                .collect(),
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> DocumentAnswers {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn empty_answer_leaves_document_incomplete() {
        let plan = requirement("plan", 2);
        assert!(!is_complete(&plan, Some(&answers(&[("q1", "x"), ("q2", "")]))));
        assert!(is_complete(&plan, Some(&answers(&[("q1", "x"), ("q2", "y")]))));
    }

    #[test]
    fn whitespace_only_counts_as_unanswered() {
        let plan = requirement("plan", 2);
        assert!(!is_complete(&plan, Some(&answers(&[("q1", "x"), ("q2", " \n\t　")]))));
    }

    #[test]
    fn missing_entry_counts_as_unanswered() {
        let plan = requirement("plan", 1);
        assert!(!is_complete(&plan, None));
        assert!(!is_complete(&plan, Some(&answers(&[("other", "x")]))));
    }

    #[test]
    fn completion_count_tracks_each_document() {
        let plan = requirement("plan", 2);
        let registry = requirement("registry", 1);
        let mut data = FormData::new();
        data.set_answer(DocumentId::new("plan"), "q1", "課題");
        data.set_answer(DocumentId::new("plan"), "q2", "目標");

        let summary = completion_count(&[&plan, &registry], &data);
        assert_eq!(summary, CompletionSummary { completed: 1, total: 2 });
        assert!(!summary.is_fully_complete());
        assert_eq!(summary.percent(), 50);

        data.set_answer(DocumentId::new("registry"), "q1", "株式会社サンプル");
        let summary = completion_count(&[&plan, &registry], &data);
        assert!(summary.is_fully_complete());
        assert_eq!(summary.percent(), 100);
    }

    #[test]
    fn merge_overwrites_only_supplied_questions() {
        let mut data = FormData::new();
        data.set_answer(DocumentId::new("plan"), "q1", "first");
        data.set_answer(DocumentId::new("plan"), "q2", "second");
        data.merge(DocumentId::new("plan"), answers(&[("q2", "revised")]));

        assert_eq!(data.answer(&DocumentId::new("plan"), "q1"), Some("first"));
        assert_eq!(data.answer(&DocumentId::new("plan"), "q2"), Some("revised"));
    }
}
