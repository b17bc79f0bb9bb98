use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{
    CatalogError, MatchThresholds, ProgramId, ProgramProfile, SubsidyCatalog, WeightTable,
};

/// Applicant's choice for one scoring question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(alias = "questionId")]
    pub question_id: String,
    #[serde(alias = "selectedValue")]
    pub selected_value: String,
}

impl Answer {
    pub fn new(question_id: impl Into<String>, selected_value: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            selected_value: selected_value.into(),
        }
    }
}

/// Replaces an earlier answer to the same question in place, otherwise appends.
pub fn upsert_answer(answers: &mut Vec<Answer>, answer: Answer) {
    match answers
        .iter_mut()
        .find(|existing| existing.question_id == answer.question_id)
    {
        Some(existing) => *existing = answer,
        None => answers.push(answer),
    }
}

/// Collapses repeated questions to their last answer, keeping first-seen order.
pub fn latest_per_question(answers: &[Answer]) -> Vec<Answer> {
    let mut latest = Vec::with_capacity(answers.len());
    for answer in answers {
        upsert_answer(&mut latest, answer.clone());
    }
    latest
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    High,
    Medium,
    Low,
}

impl MatchLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "高い適合度",
            Self::Medium => "中程度の適合度",
            Self::Low => "低い適合度",
        }
    }
}

impl MatchThresholds {
    pub fn level(&self, score: u8) -> MatchLevel {
        if score >= self.high_match {
            MatchLevel::High
        } else if score >= self.medium_match {
            MatchLevel::Medium
        } else {
            MatchLevel::Low
        }
    }
}

/// One non-zero weight that went into a program's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub question_id: String,
    pub token: String,
    pub weight: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidyMatch {
    pub program: ProgramId,
    pub name: String,
    pub score: u8,
    pub level: MatchLevel,
    pub description: String,
    pub icon: String,
    pub contributions: Vec<ScoreContribution>,
}

pub const MAX_SCORE: i32 = 100;

/// Stateless ranking of subsidy programs against a set of answers.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: WeightTable,
    thresholds: MatchThresholds,
    profiles: Vec<ProgramProfile>,
}

impl ScoringEngine {
    /// Fails when a weighted program has no display metadata.
    pub fn new(
        weights: WeightTable,
        thresholds: MatchThresholds,
        profiles: Vec<ProgramProfile>,
    ) -> Result<Self, CatalogError> {
        for (program, _) in weights.programs() {
            if !profiles.iter().any(|profile| profile.id == program) {
                return Err(CatalogError::MissingProgramProfile(program));
            }
        }

        Ok(Self {
            weights,
            thresholds,
            profiles,
        })
    }

    pub fn from_catalog(catalog: &SubsidyCatalog) -> Result<Self, CatalogError> {
        Self::new(
            catalog.weights().clone(),
            catalog.thresholds(),
            catalog.programs().to_vec(),
        )
    }

    pub fn thresholds(&self) -> MatchThresholds {
        self.thresholds
    }

    pub fn match_level(&self, score: u8) -> MatchLevel {
        self.thresholds.level(score)
    }

    /// Ranks every weighted program, highest score first.
    ///
    /// Tokens without a weight contribute nothing and only the last answer to
    /// a question counts. Equal scores keep the declaration order of the
    /// weight table.
    pub fn score(&self, answers: &[Answer]) -> Vec<SubsidyMatch> {
        let answers = latest_per_question(answers);
        let mut matches: Vec<SubsidyMatch> = self
            .weights
            .programs()
            .filter_map(|(program, weights)| {
                let profile = self.profiles.iter().find(|profile| profile.id == program)?;

                let contributions: Vec<ScoreContribution> = answers
                    .iter()
                    .filter_map(|answer| {
                        let weight = weights.get(&answer.selected_value).copied()?;
                        (weight != 0).then(|| ScoreContribution {
                            question_id: answer.question_id.clone(),
                            token: answer.selected_value.clone(),
                            weight,
                        })
                    })
                    .collect();

                let subtotal = contributions
                    .iter()
                    .fold(0i32, |total, c| total.saturating_add(c.weight));
                let score = subtotal.clamp(0, MAX_SCORE) as u8;

                Some(SubsidyMatch {
                    program,
                    name: profile.name.clone(),
                    score,
                    level: self.thresholds.level(score),
                    description: profile.description.clone(),
                    icon: profile.icon.clone(),
                    contributions,
                })
            })
            .collect();

        matches.sort_by(|left, right| right.score.cmp(&left.score));

        debug!(
            answers = answers.len(),
            top = matches.first().map(|m| m.program.as_str()).unwrap_or("none"),
            "scored subsidy programs"
        );
        matches
    }
}
