use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperScores {
    pub sci: u32,
    pub ei: u32,
    pub core_journal: u32,
}

impl PaperScores {
    pub fn total(&self) -> u32 {
        self.sci.saturating_add(self.ei).saturating_add(self.core_journal)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectScores {
    pub national: u32,
    pub provincial: u32,
    pub other: u32,
}

impl ProjectScores {
    pub fn total(&self) -> u32 {
        self.national
            .saturating_add(self.provincial)
            .saturating_add(self.other)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherScores {
    pub research_funds: u32,
    pub student_output: u32,
}

impl OtherScores {
    pub fn total(&self) -> u32 {
        self.research_funds.saturating_add(self.student_output)
    }
}

/// Score breakdown grouped by category, then sub-metric.
///
/// Persisted as a nested JSON document:
/// `{"papers":{"sci":..,"ei":..,"core_journal":..},"projects":{..},"other":{..}}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub papers: PaperScores,
    pub projects: ProjectScores,
    pub other: OtherScores,
}

impl ScoreDetail {
    pub fn total(&self) -> u32 {
        self.papers
            .total()
            .saturating_add(self.projects.total())
            .saturating_add(self.other.total())
    }

    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_document(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn detail() -> ScoreDetail {
        ScoreDetail {
            papers: PaperScores {
                sci: 40,
                ei: 15,
                core_journal: 30,
            },
            projects: ProjectScores {
                national: 30,
                provincial: 0,
                other: 0,
            },
            other: OtherScores {
                research_funds: 20,
                student_output: 10,
            },
        }
    }

    #[test]
    fn document_is_grouped_by_category() {
        let document = detail().to_document().expect("serializes");
        let value: Value = serde_json::from_str(&document).expect("valid json");
        assert_eq!(value["papers"]["sci"], 40);
        assert_eq!(value["projects"]["national"], 30);
        assert_eq!(value["other"]["research_funds"], 20);
    }

    #[test]
    fn document_round_trips_every_leaf() {
        let original = detail();
        let restored =
            ScoreDetail::from_document(&original.to_document().expect("serializes"))
                .expect("deserializes");
        assert_eq!(restored, original);
        assert_eq!(restored.total(), 145);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(ScoreDetail::from_document(r#"{"papers":{}}"#).is_err());
    }
}
