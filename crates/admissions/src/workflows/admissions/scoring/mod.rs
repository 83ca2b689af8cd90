//! Qualification scoring for supervisors.
//!
//! [`calculate_score`] turns raw research metrics into a [`ScoreDetail`] breakdown and a total;
//! [`GradeStandards`] maps that total onto a [`GradeLevel`] and the capacity attached to it.

mod detail;
mod rules;
mod standards;

pub use detail::{OtherScores, PaperScores, ProjectScores, ScoreDetail};
pub use rules::{calculate_score, ScoreCard, FUNDS_SCORE_CAP};
pub use standards::{GradeLevel, GradeStandard, GradeStandards, StandardsError};

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// Raw metrics a supervisor reports for a qualification review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationMetrics {
    pub sci_papers: u32,
    pub ei_papers: u32,
    pub core_papers: u32,
    pub national_projects: u32,
    pub province_projects: u32,
    pub other_projects: u32,
    /// Funding amount in ten-thousands.
    pub research_funds: f64,
    pub students_count: u32,
    pub awards: String,
}

impl QualificationMetrics {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.research_funds.is_finite() || self.research_funds < 0.0 {
            return Err(ValidationError::InvalidResearchFunds(self.research_funds));
        }
        Ok(())
    }
}

/// Stateless evaluator binding the scoring rubric to a grade table.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    standards: GradeStandards,
}

impl ScoringEngine {
    pub fn new(standards: GradeStandards) -> Self {
        Self { standards }
    }

    pub fn standards(&self) -> &GradeStandards {
        &self.standards
    }

    /// Validates, scores and grades a set of metrics.
    pub fn evaluate(&self, metrics: &QualificationMetrics) -> Result<ScoreCard, ValidationError> {
        metrics.validate()?;
        Ok(calculate_score(metrics))
    }

    pub fn review_level(&self, score: u32) -> GradeLevel {
        self.standards.review_level(score)
    }
}
