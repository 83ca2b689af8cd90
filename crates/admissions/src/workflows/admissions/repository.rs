use chrono::{DateTime, Utc};

use super::audit::{NewOperationLog, OperationLog};
use super::domain::{
    AdmissionApproval, ApplicationId, ApplicationRecord, ApplicationStatements, ApplicationStatus,
    DrawId, DrawRecord, DrawResult, EligibilityStatus, Priority, QualificationId,
    QualificationRecord, QualificationStatus, ReviewStatus, StudentId, StudentRecord, TeacherId,
    TeacherRecord, UserId,
};
use super::phases::{PhaseKind, PhaseStatus, ProcessPhase};
use super::scoring::{GradeLevel, QualificationMetrics, ScoreDetail};
use super::domain::PhaseId;

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("failed to snapshot record: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Transactional record store.
///
/// `transaction` runs `work` against a [`RecordTransaction`]. Returning `Ok` commits every
/// write made through it; returning `Err` discards all of them. Reads go through the same
/// entry point so a caller always validates against the state it is about to write.
pub trait AdmissionsRepository: Send + Sync {
    fn transaction<T, E>(
        &self,
        work: impl FnOnce(&mut dyn RecordTransaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepositoryError>;
}

/// CRUD view of the store inside one transaction.
pub trait RecordTransaction {
    fn students(&self) -> Result<Vec<StudentRecord>, RepositoryError>;
    fn insert_student(&mut self, student: NewStudent) -> Result<StudentRecord, RepositoryError>;
    fn update_student(&mut self, student: StudentRecord) -> Result<(), RepositoryError>;
    fn delete_student(&mut self, id: StudentId) -> Result<(), RepositoryError>;

    fn teachers(&self) -> Result<Vec<TeacherRecord>, RepositoryError>;
    fn insert_teacher(&mut self, teacher: NewTeacher) -> Result<TeacherRecord, RepositoryError>;
    fn update_teacher(&mut self, teacher: TeacherRecord) -> Result<(), RepositoryError>;
    fn delete_teacher(&mut self, id: TeacherId) -> Result<(), RepositoryError>;

    fn applications(&self) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    fn insert_application(
        &mut self,
        application: NewApplication,
    ) -> Result<ApplicationRecord, RepositoryError>;
    fn update_application(&mut self, application: ApplicationRecord)
        -> Result<(), RepositoryError>;
    fn delete_application(&mut self, id: ApplicationId) -> Result<(), RepositoryError>;

    fn qualifications(&self) -> Result<Vec<QualificationRecord>, RepositoryError>;
    fn insert_qualification(
        &mut self,
        qualification: NewQualification,
    ) -> Result<QualificationRecord, RepositoryError>;
    fn update_qualification(
        &mut self,
        qualification: QualificationRecord,
    ) -> Result<(), RepositoryError>;
    fn delete_qualification(&mut self, id: QualificationId) -> Result<(), RepositoryError>;

    fn draws(&self) -> Result<Vec<DrawRecord>, RepositoryError>;
    fn insert_draw(&mut self, draw: NewDraw) -> Result<DrawRecord, RepositoryError>;
    fn delete_draw(&mut self, id: DrawId) -> Result<(), RepositoryError>;

    fn phases(&self) -> Result<Vec<ProcessPhase>, RepositoryError>;
    fn insert_phase(&mut self, phase: NewPhase) -> Result<ProcessPhase, RepositoryError>;
    fn update_phase(&mut self, phase: ProcessPhase) -> Result<(), RepositoryError>;

    fn logs(&self) -> Result<Vec<OperationLog>, RepositoryError>;
    fn append_log(&mut self, entry: NewOperationLog) -> Result<OperationLog, RepositoryError>;

    fn student(&self, id: StudentId) -> Result<Option<StudentRecord>, RepositoryError> {
        Ok(self.students()?.into_iter().find(|student| student.id == id))
    }

    fn teacher(&self, id: TeacherId) -> Result<Option<TeacherRecord>, RepositoryError> {
        Ok(self.teachers()?.into_iter().find(|teacher| teacher.id == id))
    }

    fn application(&self, id: ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self.applications()?.into_iter().find(|app| app.id == id))
    }

    fn applications_for_student(
        &self,
        id: StudentId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self
            .applications()?
            .into_iter()
            .filter(|app| app.student_id == id)
            .collect())
    }

    fn applications_for_teacher(
        &self,
        id: TeacherId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self
            .applications()?
            .into_iter()
            .filter(|app| app.teacher_id == id)
            .collect())
    }

    fn qualification(
        &self,
        id: QualificationId,
    ) -> Result<Option<QualificationRecord>, RepositoryError> {
        Ok(self.qualifications()?.into_iter().find(|qual| qual.id == id))
    }

    fn qualification_for_year(
        &self,
        teacher_id: TeacherId,
        year: i32,
    ) -> Result<Option<QualificationRecord>, RepositoryError> {
        Ok(self
            .qualifications()?
            .into_iter()
            .find(|qual| qual.teacher_id == teacher_id && qual.year == year))
    }

    fn phase(&self, id: PhaseId) -> Result<Option<ProcessPhase>, RepositoryError> {
        Ok(self.phases()?.into_iter().find(|phase| phase.id == id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub user_id: UserId,
    pub name: String,
    pub status: EligibilityStatus,
    pub initial_score: f64,
    pub retest_score: f64,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl NewStudent {
    pub fn into_record(self, id: StudentId) -> StudentRecord {
        StudentRecord {
            id,
            user_id: self.user_id,
            name: self.name,
            status: self.status,
            initial_score: self.initial_score,
            retest_score: self.retest_score,
            phone: self.phone,
            email: self.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTeacher {
    pub user_id: UserId,
    pub name: String,
    pub title: Option<String>,
}

impl NewTeacher {
    pub fn into_record(self, id: TeacherId) -> TeacherRecord {
        TeacherRecord {
            id,
            user_id: self.user_id,
            name: self.name,
            title: self.title,
            qualification_status: QualificationStatus::NotApplied,
            review_level: None,
            qualification_year: None,
            qualification_expires_at: None,
            max_students: 0,
            quota: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub student_id: StudentId,
    pub teacher_id: TeacherId,
    pub priority: Priority,
    pub statements: ApplicationStatements,
    pub created_at: DateTime<Utc>,
}

impl NewApplication {
    pub fn into_record(self, id: ApplicationId) -> ApplicationRecord {
        ApplicationRecord {
            id,
            student_id: self.student_id,
            teacher_id: self.teacher_id,
            priority: self.priority,
            status: ApplicationStatus::Pending,
            statements: self.statements,
            process_comment: None,
            processed_at: None,
            approval: None::<AdmissionApproval>,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQualification {
    pub teacher_id: TeacherId,
    pub year: i32,
    pub metrics: QualificationMetrics,
    pub score: u32,
    pub score_detail: ScoreDetail,
    pub review_level: GradeLevel,
    pub created_at: DateTime<Utc>,
}

impl NewQualification {
    pub fn into_record(self, id: QualificationId) -> QualificationRecord {
        QualificationRecord {
            id,
            teacher_id: self.teacher_id,
            year: self.year,
            metrics: self.metrics,
            score: self.score,
            score_detail: self.score_detail,
            review_level: self.review_level,
            status: ReviewStatus::Pending,
            reviewer_id: None,
            reviewed_at: None,
            review_comment: None,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDraw {
    pub teacher_id: TeacherId,
    pub student_id: StudentId,
    pub result: DrawResult,
    pub drawn_at: DateTime<Utc>,
}

impl NewDraw {
    pub fn into_record(self, id: DrawId) -> DrawRecord {
        DrawRecord {
            id,
            teacher_id: self.teacher_id,
            student_id: self.student_id,
            result: self.result,
            drawn_at: self.drawn_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPhase {
    pub kind: PhaseKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub supervisor_id: UserId,
    pub notes: String,
}

impl NewPhase {
    pub fn into_record(self, id: PhaseId) -> ProcessPhase {
        ProcessPhase {
            id,
            kind: self.kind,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: PhaseStatus::InProgress,
            supervisor_id: self.supervisor_id,
            notes: self.notes,
        }
    }
}
