use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::scoring::{GradeLevel, QualificationMetrics, ScoreDetail};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, " {}"), self.0)
            }
        }
    };
}

record_id!(
    /// Account identifier of whoever performs an operation (student, supervisor or admin).
    UserId,
    "user"
);
record_id!(StudentId, "student");
record_id!(TeacherId, "supervisor");
record_id!(ApplicationId, "application");
record_id!(QualificationId, "qualification");
record_id!(DrawId, "draw");
record_id!(PhaseId, "phase");
record_id!(LogId, "log entry");

/// Qualification is valid for three years from approval.
pub const QUALIFICATION_VALIDITY_YEARS: i32 = 3;

/// Students may hold at most this many ranked choices.
pub const MAX_CHOICES: u8 = 3;

/// Ranked choice slot. Only 1..=3 can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const FIRST: Priority = Priority(1);

    pub const fn get(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Option<Priority> {
        Priority::try_from(self.0 + 1).ok()
    }
}

impl TryFrom<u8> for Priority {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=MAX_CHOICES).contains(&value) {
            Ok(Priority(value))
        } else {
            Err(ValidationError::PriorityOutOfRange(value))
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "choice {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Pending,
    Approved,
    Rejected,
}

impl EligibilityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EligibilityStatus::Pending => "pending",
            EligibilityStatus::Approved => "approved",
            EligibilityStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: StudentId,
    pub user_id: UserId,
    pub name: String,
    pub status: EligibilityStatus,
    pub initial_score: f64,
    pub retest_score: f64,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl StudentRecord {
    pub fn total_score(&self) -> f64 {
        self.initial_score + self.retest_score
    }
}

/// Registration payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRegistration {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub initial_score: f64,
    #[serde(default)]
    pub retest_score: f64,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStatus {
    NotApplied,
    Pending,
    Approved,
    Rejected,
}

impl QualificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QualificationStatus::NotApplied => "not_applied",
            QualificationStatus::Pending => "pending",
            QualificationStatus::Approved => "approved",
            QualificationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    Allocated,
}

/// Administrative quota metadata stamped by the last override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaAllocation {
    pub status: QuotaStatus,
    pub year: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherRecord {
    pub id: TeacherId,
    pub user_id: UserId,
    pub name: String,
    pub title: Option<String>,
    pub qualification_status: QualificationStatus,
    pub review_level: Option<GradeLevel>,
    pub qualification_year: Option<i32>,
    pub qualification_expires_at: Option<DateTime<Utc>>,
    pub max_students: u32,
    pub quota: Option<QuotaAllocation>,
}

impl TeacherRecord {
    /// Approved and not yet expired at `now`.
    pub fn is_qualified_at(&self, now: DateTime<Utc>) -> bool {
        self.qualification_status == QualificationStatus::Approved
            && self
                .qualification_expires_at
                .map(|expires| expires > now)
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherRegistration {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Supervisor-side lifecycle of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_active(self) -> bool {
        match self {
            ApplicationStatus::Pending | ApplicationStatus::Approved => true,
            ApplicationStatus::Rejected => false,
        }
    }
}

/// Administrative overlay, only present once a supervisor has approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    PendingAdminReview,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApprovalStatus::PendingAdminReview => "pending_admin_review",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// Administrative verdict on a supervisor-approved application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionApproval {
    pub status: ApprovalStatus,
    pub approver_id: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

impl AdmissionApproval {
    pub fn awaiting_review() -> Self {
        Self {
            status: ApprovalStatus::PendingAdminReview,
            approver_id: None,
            decided_at: None,
            comment: None,
        }
    }
}

/// Free-text statements attached to an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatements {
    #[serde(default)]
    pub personal_statement: String,
    #[serde(default)]
    pub research_interest: String,
    #[serde(default)]
    pub apply_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub teacher_id: TeacherId,
    pub priority: Priority,
    pub status: ApplicationStatus,
    pub statements: ApplicationStatements,
    pub process_comment: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub approval: Option<AdmissionApproval>,
    pub created_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn approval_status(&self) -> Option<ApprovalStatus> {
        self.approval.as_ref().map(|approval| approval.status)
    }

    pub fn view(&self) -> ApplicationView {
        ApplicationView {
            id: self.id,
            student_id: self.student_id,
            teacher_id: self.teacher_id,
            priority: self.priority.get(),
            status: self.status.label(),
            approval_status: self.approval_status().map(ApprovalStatus::label),
            process_comment: self.process_comment.clone(),
            created_at: self.created_at,
        }
    }
}

/// Sanitized representation returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub student_id: StudentId,
    pub teacher_id: TeacherId,
    pub priority: u8,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a student asks for when applying to a supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRequest {
    pub student_id: StudentId,
    pub teacher_id: TeacherId,
    pub priority: Priority,
    #[serde(flatten)]
    pub statements: ApplicationStatements,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

/// Verdict an administrator gives a qualification application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ReviewStatus {
    fn from(value: ReviewDecision) -> Self {
        match value {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::Rejected => ReviewStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationRecord {
    pub id: QualificationId,
    pub teacher_id: TeacherId,
    pub year: i32,
    pub metrics: QualificationMetrics,
    pub score: u32,
    pub score_detail: ScoreDetail,
    pub review_level: GradeLevel,
    pub status: ReviewStatus,
    pub reviewer_id: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub id: DrawId,
    pub teacher_id: TeacherId,
    pub student_id: StudentId,
    pub result: DrawResult,
    pub drawn_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawResult {
    Selected,
}

pub(crate) fn calendar_year(now: DateTime<Utc>) -> i32 {
    now.year()
}
