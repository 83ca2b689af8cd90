use serde::{Deserialize, Serialize};

use super::detail::{OtherScores, PaperScores, ProjectScores, ScoreDetail};
use super::QualificationMetrics;

const SCI_PAPER_POINTS: u32 = 20;
const EI_PAPER_POINTS: u32 = 15;
const CORE_PAPER_POINTS: u32 = 10;
const NATIONAL_PROJECT_POINTS: u32 = 30;
const PROVINCE_PROJECT_POINTS: u32 = 20;
const OTHER_PROJECT_POINTS: u32 = 10;
const FUNDS_POINTS_PER_UNIT: f64 = 2.0;
const STUDENT_OUTPUT_POINTS: u32 = 5;

/// Research funding never contributes more than this.
pub const FUNDS_SCORE_CAP: u32 = 50;

/// Total score plus the breakdown it was summed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: u32,
    pub detail: ScoreDetail,
}

/// Scores a set of metrics. Pure; callers validate funds beforehand.
pub fn calculate_score(metrics: &QualificationMetrics) -> ScoreCard {
    let detail = ScoreDetail {
        papers: PaperScores {
            sci: metrics.sci_papers.saturating_mul(SCI_PAPER_POINTS),
            ei: metrics.ei_papers.saturating_mul(EI_PAPER_POINTS),
            core_journal: metrics.core_papers.saturating_mul(CORE_PAPER_POINTS),
        },
        projects: ProjectScores {
            national: metrics
                .national_projects
                .saturating_mul(NATIONAL_PROJECT_POINTS),
            provincial: metrics
                .province_projects
                .saturating_mul(PROVINCE_PROJECT_POINTS),
            other: metrics.other_projects.saturating_mul(OTHER_PROJECT_POINTS),
        },
        other: OtherScores {
            research_funds: funds_points(metrics.research_funds),
            student_output: metrics.students_count.saturating_mul(STUDENT_OUTPUT_POINTS),
        },
    };

    ScoreCard {
        score: detail.total(),
        detail,
    }
}

fn funds_points(research_funds: f64) -> u32 {
    // NaN and negatives clamp to zero through the float-to-int cast.
    let raw = (research_funds * FUNDS_POINTS_PER_UNIT).floor();
    (raw as u32).min(FUNDS_SCORE_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference_metrics() -> QualificationMetrics {
        QualificationMetrics {
            sci_papers: 2,
            ei_papers: 1,
            core_papers: 3,
            national_projects: 1,
            province_projects: 0,
            other_projects: 0,
            research_funds: 10.0,
            students_count: 2,
            awards: "Provincial teaching award".to_string(),
        }
    }

    #[test]
    fn reference_metrics_score_145() {
        let card = calculate_score(&reference_metrics());
        assert_eq!(card.detail.papers.total(), 85);
        assert_eq!(card.detail.projects.total(), 30);
        assert_eq!(card.detail.other.total(), 30);
        assert_eq!(card.score, 145);
    }

    #[test]
    fn funds_contribution_is_floored_and_capped() {
        let mut metrics = QualificationMetrics {
            research_funds: 3.7,
            ..QualificationMetrics::default()
        };
        assert_eq!(calculate_score(&metrics).detail.other.research_funds, 7);

        metrics.research_funds = 25.0;
        assert_eq!(calculate_score(&metrics).detail.other.research_funds, 50);

        metrics.research_funds = 400.0;
        assert_eq!(calculate_score(&metrics).score, FUNDS_SCORE_CAP);
    }

    #[test]
    fn empty_metrics_score_zero() {
        let card = calculate_score(&QualificationMetrics::default());
        assert_eq!(card.score, 0);
    }

    #[test]
    fn huge_counts_saturate_instead_of_overflowing() {
        let metrics = QualificationMetrics {
            sci_papers: u32::MAX,
            national_projects: u32::MAX,
            ..QualificationMetrics::default()
        };
        assert_eq!(calculate_score(&metrics).score, u32::MAX);
    }

    proptest! {
        #[test]
        fn scoring_is_deterministic(
            sci in 0u32..50, ei in 0u32..50, core in 0u32..50,
            national in 0u32..20, province in 0u32..20, other in 0u32..20,
            funds in 0.0f64..100.0, students in 0u32..40,
        ) {
            let metrics = QualificationMetrics {
                sci_papers: sci,
                ei_papers: ei,
                core_papers: core,
                national_projects: national,
                province_projects: province,
                other_projects: other,
                research_funds: funds,
                students_count: students,
                awards: String::new(),
            };
            let first = calculate_score(&metrics);
            let second = calculate_score(&metrics);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.score, first.detail.total());
            prop_assert!(first.detail.other.research_funds <= FUNDS_SCORE_CAP);
        }
    }
}
