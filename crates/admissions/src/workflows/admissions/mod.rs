//! Graduate admissions: ranked student applications, supervisor acceptance under capacity,
//! administrative sign-off, and the qualification scoring that decides which supervisors may
//! take students at all.

pub mod approval;
pub mod audit;
pub mod capacity;
pub mod clock;
pub mod domain;
pub mod errors;
pub mod export;
pub mod lifecycle;
pub mod lottery;
pub mod memory;
pub mod phases;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod sequencing;
pub mod service;

#[cfg(test)]
mod tests;

pub use approval::AdmissionSummary;
pub use audit::{LogFilter, OperationKind, OperationLog, RecordKind};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    AdmissionDecision, ApplicationId, ApplicationRecord, ApplicationRequest,
    ApplicationStatements, ApplicationStatus, ApplicationView, ApprovalStatus, DrawId, DrawRecord,
    EligibilityStatus, Priority, QualificationId, QualificationRecord, QualificationStatus,
    ReviewDecision, ReviewStatus, StudentId, StudentRecord, StudentRegistration, TeacherId,
    TeacherRecord, TeacherRegistration, UserId,
};
pub use errors::{AdmissionsError, InvalidTransition, PolicyViolation, RecordRef, ValidationError};
pub use export::{write_roster, ExportError, RosterRow};
pub use lottery::DrawCandidate;
pub use memory::InMemoryAdmissionsStore;
pub use phases::{PhaseKind, PhasePlan, PhaseStatistics, PhaseStatus, ProcessPhase};
pub use repository::{AdmissionsRepository, RecordTransaction, RepositoryError};
pub use router::admissions_router;
pub use scoring::{
    calculate_score, GradeLevel, GradeStandard, GradeStandards, QualificationMetrics, ScoreCard,
    ScoreDetail, ScoringEngine, StandardsError,
};
pub use service::{
    AcceptOutcome, AdmissionsOverview, AdmissionsService, ApplicationStatistics, DeletionSummary,
    DrawOutcome, QuotaEntry, QuotaUpdate, SupervisorLoad,
};
