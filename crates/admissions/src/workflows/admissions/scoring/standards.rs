use std::fmt;

use serde::{Deserialize, Serialize};

/// Categorical review outcome. Ordering follows strength: `Unqualified < Qualified < Good < Excellent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeLevel {
    Unqualified,
    Qualified,
    Good,
    Excellent,
}

impl GradeLevel {
    /// Checked from strongest to weakest when grading.
    pub const DESCENDING: [GradeLevel; 3] =
        [GradeLevel::Excellent, GradeLevel::Good, GradeLevel::Qualified];

    pub const fn label(self) -> &'static str {
        match self {
            GradeLevel::Unqualified => "unqualified",
            GradeLevel::Qualified => "qualified",
            GradeLevel::Good => "good",
            GradeLevel::Excellent => "excellent",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeStandard {
    pub min_score: u32,
    pub max_students: u32,
}

/// Score thresholds and capacity per grade. Loaded once per process and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeStandards {
    pub excellent: GradeStandard,
    pub good: GradeStandard,
    pub qualified: GradeStandard,
    #[serde(default)]
    pub unqualified: GradeStandard,
}

impl Default for GradeStandards {
    fn default() -> Self {
        Self {
            excellent: GradeStandard {
                min_score: 140,
                max_students: 5,
            },
            good: GradeStandard {
                min_score: 100,
                max_students: 4,
            },
            qualified: GradeStandard {
                min_score: 60,
                max_students: 2,
            },
            unqualified: GradeStandard {
                min_score: 0,
                max_students: 0,
            },
        }
    }
}

impl GradeStandards {
    /// Parses and validates a JSON standards document.
    pub fn from_json(raw: &str) -> Result<Self, StandardsError> {
        let standards: GradeStandards = serde_json::from_str(raw).map_err(StandardsError::Parse)?;
        standards.validate()?;
        Ok(standards)
    }

    /// Thresholds must not increase from excellent down to qualified.
    pub fn validate(&self) -> Result<(), StandardsError> {
        let pairs = [
            (GradeLevel::Excellent, GradeLevel::Good),
            (GradeLevel::Good, GradeLevel::Qualified),
        ];
        for (higher, lower) in pairs {
            if self.get(higher).min_score < self.get(lower).min_score {
                return Err(StandardsError::Inverted { higher, lower });
            }
        }
        Ok(())
    }

    pub fn get(&self, level: GradeLevel) -> GradeStandard {
        match level {
            GradeLevel::Excellent => self.excellent,
            GradeLevel::Good => self.good,
            GradeLevel::Qualified => self.qualified,
            GradeLevel::Unqualified => self.unqualified,
        }
    }

    /// Highest grade whose threshold `score` meets, inclusive. No upper clamp.
    pub fn review_level(&self, score: u32) -> GradeLevel {
        GradeLevel::DESCENDING
            .into_iter()
            .find(|level| score >= self.get(*level).min_score)
            .unwrap_or(GradeLevel::Unqualified)
    }

    pub fn max_students(&self, level: GradeLevel) -> u32 {
        self.get(level).max_students
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("standards document is malformed: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("{higher} threshold is below the {lower} threshold")]
    Inverted {
        higher: GradeLevel,
        lower: GradeLevel,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn thresholds_are_inclusive() {
        let standards = GradeStandards::default();
        assert_eq!(standards.review_level(140), GradeLevel::Excellent);
        assert_eq!(standards.review_level(139), GradeLevel::Good);
        assert_eq!(standards.review_level(100), GradeLevel::Good);
        assert_eq!(standards.review_level(60), GradeLevel::Qualified);
        assert_eq!(standards.review_level(59), GradeLevel::Unqualified);
    }

    #[test]
    fn scores_far_above_the_top_threshold_stay_excellent() {
        let standards = GradeStandards::default();
        assert_eq!(standards.review_level(u32::MAX), GradeLevel::Excellent);
    }

    #[test]
    fn unqualified_defaults_when_missing_from_document() {
        let standards = GradeStandards::from_json(
            r#"{"excellent":{"min_score":120,"max_students":3},
                "good":{"min_score":80,"max_students":2},
                "qualified":{"min_score":40,"max_students":1}}"#,
        )
        .expect("parses");
        assert_eq!(standards.get(GradeLevel::Unqualified), GradeStandard::default());
        assert_eq!(standards.max_students(GradeLevel::Good), 2);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut standards = GradeStandards::default();
        standards.good.min_score = 150;
        assert!(matches!(
            standards.validate(),
            Err(StandardsError::Inverted {
                higher: GradeLevel::Excellent,
                lower: GradeLevel::Good
            })
        ));
    }

    proptest! {
        #[test]
        fn grading_is_monotone(a in 0u32..400, b in 0u32..400) {
            let standards = GradeStandards::default();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(standards.review_level(low) <= standards.review_level(high));
        }
    }
}
