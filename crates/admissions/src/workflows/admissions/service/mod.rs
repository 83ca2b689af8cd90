//! Admissions service: every operation loads, validates and writes inside one store
//! transaction, and appends its operation-log entries to that same transaction.

mod applications;
mod oversight;
mod qualifications;
mod quotas;
mod registry;
mod reports;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use super::clock::{Clock, SystemClock};
use super::domain::{
    ApplicationId, ApplicationRecord, QualificationId, QualificationRecord, StudentId,
    StudentRecord, TeacherId, TeacherRecord,
};
use super::errors::{AdmissionsError, RecordRef};
use super::repository::{AdmissionsRepository, RecordTransaction};
use super::scoring::{GradeStandards, ScoringEngine};

pub use applications::AcceptOutcome;
pub use oversight::DrawOutcome;
pub use quotas::{QuotaEntry, QuotaUpdate};
pub use registry::DeletionSummary;
pub use reports::{AdmissionsOverview, ApplicationStatistics, SupervisorLoad};

/// Service composing the record store, the scoring engine and the clock.
pub struct AdmissionsService<R> {
    repository: Arc<R>,
    engine: Arc<ScoringEngine>,
    clock: Arc<dyn Clock>,
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    pub fn new(repository: Arc<R>, standards: GradeStandards) -> Self {
        Self::with_clock(repository, standards, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        standards: GradeStandards,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            engine: Arc::new(ScoringEngine::new(standards)),
            clock,
        }
    }

    pub fn standards(&self) -> &GradeStandards {
        self.engine.standards()
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn transaction<T>(
        &self,
        operation: &'static str,
        work: impl FnOnce(&mut dyn RecordTransaction) -> Result<T, AdmissionsError>,
    ) -> Result<T, AdmissionsError> {
        let outcome = self.repository.transaction(work);
        if let Err(err) = &outcome {
            report_failure(operation, err);
        }
        outcome
    }

    /// Applications, students and supervisors from a single snapshot.
    pub(crate) fn read_all(
        &self,
    ) -> Result<(Vec<ApplicationRecord>, Vec<StudentRecord>, Vec<TeacherRecord>), AdmissionsError>
    {
        self.transaction("read_all", |tx| {
            Ok((tx.applications()?, tx.students()?, tx.teachers()?))
        })
    }
}

fn report_failure(operation: &'static str, err: &AdmissionsError) {
    match err {
        AdmissionsError::Store(source) => {
            error!(operation, error = %source, "admissions transaction rolled back");
        }
        AdmissionsError::Policy(violation) => {
            warn!(operation, reason = %violation, "request refused by admissions policy");
        }
        other => {
            warn!(operation, error = %other, "request rejected");
        }
    }
}

fn load_student(
    tx: &dyn RecordTransaction,
    id: StudentId,
) -> Result<StudentRecord, AdmissionsError> {
    tx.student(id)?
        .ok_or(AdmissionsError::NotFound(RecordRef::Student(id)))
}

fn load_teacher(
    tx: &dyn RecordTransaction,
    id: TeacherId,
) -> Result<TeacherRecord, AdmissionsError> {
    tx.teacher(id)?
        .ok_or(AdmissionsError::NotFound(RecordRef::Teacher(id)))
}

fn load_application(
    tx: &dyn RecordTransaction,
    id: ApplicationId,
) -> Result<ApplicationRecord, AdmissionsError> {
    tx.application(id)?
        .ok_or(AdmissionsError::NotFound(RecordRef::Application(id)))
}

fn load_qualification(
    tx: &dyn RecordTransaction,
    id: QualificationId,
) -> Result<QualificationRecord, AdmissionsError> {
    tx.qualification(id)?
        .ok_or(AdmissionsError::NotFound(RecordRef::Qualification(id)))
}
