//! Process supervision: the admin-defined windows the admissions round moves through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationRecord, ApplicationStatus, ApprovalStatus, PhaseId, UserId};
use super::errors::{PolicyViolation, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    StudentApplication,
    SupervisorReview,
    AdminApproval,
}

impl PhaseKind {
    pub const fn label(self) -> &'static str {
        match self {
            PhaseKind::StudentApplication => "student application",
            PhaseKind::SupervisorReview => "supervisor review",
            PhaseKind::AdminApproval => "admin approval",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    InProgress,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessPhase {
    pub id: PhaseId,
    pub kind: PhaseKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: PhaseStatus,
    pub supervisor_id: UserId,
    pub notes: String,
}

impl ProcessPhase {
    /// Inclusive on both ends.
    pub fn overlaps(&self, plan: &PhasePlan) -> bool {
        self.status != PhaseStatus::Ended
            && plan.starts_at <= self.ends_at
            && self.starts_at <= plan.ends_at
    }
}

/// Admin request to open a new phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePlan {
    pub kind: PhaseKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

impl PhasePlan {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ends_at <= self.starts_at {
            return Err(ValidationError::InvalidPhaseWindow);
        }
        Ok(())
    }
}

pub fn check_conflicts(existing: &[ProcessPhase], plan: &PhasePlan) -> Result<(), PolicyViolation> {
    if existing.iter().any(|phase| phase.overlaps(plan)) {
        return Err(PolicyViolation::PhaseConflict);
    }
    Ok(())
}

/// Latest-started phase still in progress.
pub fn current_phase(phases: &[ProcessPhase]) -> Option<&ProcessPhase> {
    phases
        .iter()
        .filter(|phase| phase.status == PhaseStatus::InProgress)
        .max_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)))
}

/// Progress counters relevant to the phase in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PhaseStatistics {
    StudentApplication {
        total_applications: usize,
        pending_reviews: usize,
    },
    SupervisorReview {
        pending_reviews: usize,
    },
    AdminApproval {
        pending_approvals: usize,
    },
}

impl PhaseStatistics {
    pub fn collect(kind: PhaseKind, applications: &[ApplicationRecord]) -> Self {
        let pending_reviews = applications
            .iter()
            .filter(|app| app.status == ApplicationStatus::Pending)
            .count();

        match kind {
            PhaseKind::StudentApplication => PhaseStatistics::StudentApplication {
                total_applications: applications.len(),
                pending_reviews,
            },
            PhaseKind::SupervisorReview => PhaseStatistics::SupervisorReview { pending_reviews },
            PhaseKind::AdminApproval => PhaseStatistics::AdminApproval {
                pending_approvals: applications
                    .iter()
                    .filter(|app| app.approval_status() == Some(ApprovalStatus::PendingAdminReview))
                    .count(),
            },
        }
    }
}
