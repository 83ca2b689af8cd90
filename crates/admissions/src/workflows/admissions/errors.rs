use std::fmt;

use serde::Serialize;

use super::domain::{ApplicationId, PhaseId, QualificationId, StudentId, TeacherId};
use super::repository::RepositoryError;

/// Malformed input, rejected before anything is read or written.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("priority must be between 1 and 3, got {0}")]
    PriorityOutOfRange(u8),
    #[error("research funds must be a finite, non-negative amount, got {0}")]
    InvalidResearchFunds(f64),
    #[error("quota batch is empty")]
    EmptyQuotaBatch,
    #[error("quota batch lists {0} more than once")]
    DuplicateQuotaEntry(TeacherId),
    #[error("phase must end after it starts")]
    InvalidPhaseWindow,
    #[error("{field} must not be empty")]
    MissingField { field: &'static str },
}

/// Business rule rejections. Each variant carries a fixed, user-facing reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum PolicyViolation {
    #[error("must submit first choice first")]
    FirstChoiceRequired,
    #[error("wait for current review")]
    AwaitingReview,
    #[error("already has an approved choice")]
    AlreadyApproved,
    #[error("submit in order")]
    OutOfOrder,
    #[error("maximum three choices reached")]
    MaximumChoicesReached,
    #[error("already applied to this supervisor")]
    DuplicateApplication,
    #[error("student eligibility has not been approved")]
    StudentNotEligible,
    #[error("supervisor is not qualified to accept students")]
    SupervisorUnavailable,
    #[error("quota full")]
    QuotaFull,
    #[error("quota is below the number of admitted students")]
    QuotaBelowAdmitted,
    #[error("qualification already submitted this year")]
    DuplicateQualification,
    #[error("phase window overlaps an active phase")]
    PhaseConflict,
    #[error("account is already registered")]
    AlreadyRegistered,
    #[error("no eligible students to draw")]
    NoDrawCandidates,
}

impl PolicyViolation {
    pub fn reason(self) -> String {
        self.to_string()
    }
}

/// A transition requested from a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransition {
    #[error("application has already been processed")]
    NotPending,
    #[error("admission is not awaiting administrative review")]
    NotAwaitingApproval,
    #[error("qualification has already been reviewed")]
    AlreadyReviewed,
}

/// Identifies a record for not-found and ownership errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    Student(StudentId),
    Teacher(TeacherId),
    Application(ApplicationId),
    Qualification(QualificationId),
    Phase(PhaseId),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Student(id) => id.fmt(f),
            RecordRef::Teacher(id) => id.fmt(f),
            RecordRef::Application(id) => id.fmt(f),
            RecordRef::Qualification(id) => id.fmt(f),
            RecordRef::Phase(id) => id.fmt(f),
        }
    }
}

/// Error raised by the admissions service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error("{0} does not exist")]
    NotFound(RecordRef),
    #[error("not permitted to modify {0}")]
    Forbidden(RecordRef),
    #[error(transparent)]
    InvalidState(#[from] InvalidTransition),
    #[error("operation failed")]
    Store(#[from] RepositoryError),
}

impl AdmissionsError {
    /// Policy reason if this is a rule rejection rather than a system failure.
    pub fn policy(&self) -> Option<PolicyViolation> {
        match self {
            AdmissionsError::Policy(violation) => Some(*violation),
            _ => None,
        }
    }
}
