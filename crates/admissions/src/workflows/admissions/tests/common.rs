use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::admissions::audit::{NewOperationLog, OperationLog};
use crate::workflows::admissions::clock::FixedClock;
use crate::workflows::admissions::domain::{
    ApplicationId, ApplicationRecord, ApplicationRequest, ApplicationStatements, DrawId,
    DrawRecord, EligibilityStatus, Priority, QualificationId, QualificationRecord,
    ReviewDecision, StudentId, StudentRecord, StudentRegistration, TeacherId, TeacherRecord,
    TeacherRegistration, UserId,
};
use crate::workflows::admissions::memory::InMemoryAdmissionsStore;
use crate::workflows::admissions::phases::ProcessPhase;
use crate::workflows::admissions::repository::{
    AdmissionsRepository, NewApplication, NewDraw, NewPhase, NewQualification, NewStudent,
    NewTeacher, RecordTransaction, RepositoryError,
};
use crate::workflows::admissions::scoring::{GradeStandards, QualificationMetrics};
use crate::workflows::admissions::service::AdmissionsService;

pub(super) const ADMIN: UserId = UserId(1);

pub(super) fn start_of_round() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn build_service() -> (
    AdmissionsService<InMemoryAdmissionsStore>,
    Arc<InMemoryAdmissionsStore>,
    Arc<FixedClock>,
) {
    let store = Arc::new(InMemoryAdmissionsStore::new());
    let clock = Arc::new(FixedClock::new(start_of_round()));
    let service =
        AdmissionsService::with_clock(store.clone(), GradeStandards::default(), clock.clone());
    (service, store, clock)
}

/// sci=2, ei=1, core=3, national=1, funds=10, students=2: 145 points, excellent.
pub(super) fn reference_metrics() -> QualificationMetrics {
    QualificationMetrics {
        sci_papers: 2,
        ei_papers: 1,
        core_papers: 3,
        national_projects: 1,
        province_projects: 0,
        other_projects: 0,
        research_funds: 10.0,
        students_count: 2,
        awards: "provincial teaching award".to_string(),
    }
}

/// Exactly 60 points: graded qualified, capacity 2.
pub(super) fn qualified_metrics() -> QualificationMetrics {
    QualificationMetrics {
        sci_papers: 3,
        ..QualificationMetrics::default()
    }
}

pub(super) fn eligible_student<R>(
    service: &AdmissionsService<R>,
    user: u64,
    name: &str,
) -> StudentRecord
where
    R: AdmissionsRepository + 'static,
{
    let student = service
        .register_student(StudentRegistration {
            user_id: UserId(user),
            name: name.to_string(),
            initial_score: 350.0 + user as f64,
            retest_score: 80.0,
            phone: None,
            email: Some(format!("{}@example.edu", name.to_lowercase())),
        })
        .expect("student registers");
    service
        .review_student(student.id, EligibilityStatus::Approved, ADMIN)
        .expect("eligibility approved")
}

pub(super) fn qualified_teacher<R>(
    service: &AdmissionsService<R>,
    user: u64,
    name: &str,
    metrics: QualificationMetrics,
) -> TeacherRecord
where
    R: AdmissionsRepository + 'static,
{
    let teacher = service
        .register_teacher(TeacherRegistration {
            user_id: UserId(user),
            name: name.to_string(),
            title: Some("Professor".to_string()),
        })
        .expect("teacher registers");
    let qualification = service
        .submit_qualification(teacher.id, metrics)
        .expect("qualification submitted");
    service
        .review_qualification(qualification.id, ADMIN, ReviewDecision::Approved, None)
        .expect("qualification approved");
    service.teacher(teacher.id).expect("teacher present")
}

pub(super) fn request(student: StudentId, teacher: TeacherId, priority: u8) -> ApplicationRequest {
    ApplicationRequest {
        student_id: student,
        teacher_id: teacher,
        priority: Priority::try_from(priority).expect("valid priority"),
        statements: ApplicationStatements {
            personal_statement: "I enjoy systems research.".to_string(),
            research_interest: "distributed storage".to_string(),
            apply_reason: "strong lab fit".to_string(),
        },
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store that lets a fixed number of application updates through per transaction and
/// fails the next one.
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryAdmissionsStore,
    pub(super) allowed_application_updates: usize,
}

impl AdmissionsRepository for FlakyStore {
    fn transaction<T, E>(
        &self,
        work: impl FnOnce(&mut dyn RecordTransaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepositoryError>,
    {
        let allowed = self.allowed_application_updates;
        self.inner.transaction(|tx| {
            let mut flaky = FlakyTransaction {
                inner: tx,
                remaining: allowed,
            };
            work(&mut flaky)
        })
    }
}

struct FlakyTransaction<'a> {
    inner: &'a mut dyn RecordTransaction,
    remaining: usize,
}

impl RecordTransaction for FlakyTransaction<'_> {
    fn students(&self) -> Result<Vec<StudentRecord>, RepositoryError> {
        self.inner.students()
    }

    fn insert_student(&mut self, student: NewStudent) -> Result<StudentRecord, RepositoryError> {
        self.inner.insert_student(student)
    }

    fn update_student(&mut self, student: StudentRecord) -> Result<(), RepositoryError> {
        self.inner.update_student(student)
    }

    fn delete_student(&mut self, id: StudentId) -> Result<(), RepositoryError> {
        self.inner.delete_student(id)
    }

    fn teachers(&self) -> Result<Vec<TeacherRecord>, RepositoryError> {
        self.inner.teachers()
    }

    fn insert_teacher(&mut self, teacher: NewTeacher) -> Result<TeacherRecord, RepositoryError> {
        self.inner.insert_teacher(teacher)
    }

    fn update_teacher(&mut self, teacher: TeacherRecord) -> Result<(), RepositoryError> {
        self.inner.update_teacher(teacher)
    }

    fn delete_teacher(&mut self, id: TeacherId) -> Result<(), RepositoryError> {
        self.inner.delete_teacher(id)
    }

    fn applications(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.inner.applications()
    }

    fn insert_application(
        &mut self,
        application: NewApplication,
    ) -> Result<ApplicationRecord, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn update_application(
        &mut self,
        application: ApplicationRecord,
    ) -> Result<(), RepositoryError> {
        if self.remaining == 0 {
            return Err(RepositoryError::Unavailable("write timed out".to_string()));
        }
        self.remaining -= 1;
        self.inner.update_application(application)
    }

    fn delete_application(&mut self, id: ApplicationId) -> Result<(), RepositoryError> {
        self.inner.delete_application(id)
    }

    fn qualifications(&self) -> Result<Vec<QualificationRecord>, RepositoryError> {
        self.inner.qualifications()
    }

    fn insert_qualification(
        &mut self,
        qualification: NewQualification,
    ) -> Result<QualificationRecord, RepositoryError> {
        self.inner.insert_qualification(qualification)
    }

    fn update_qualification(
        &mut self,
        qualification: QualificationRecord,
    ) -> Result<(), RepositoryError> {
        self.inner.update_qualification(qualification)
    }

    fn delete_qualification(&mut self, id: QualificationId) -> Result<(), RepositoryError> {
        self.inner.delete_qualification(id)
    }

    fn draws(&self) -> Result<Vec<DrawRecord>, RepositoryError> {
        self.inner.draws()
    }

    fn insert_draw(&mut self, draw: NewDraw) -> Result<DrawRecord, RepositoryError> {
        self.inner.insert_draw(draw)
    }

    fn delete_draw(&mut self, id: DrawId) -> Result<(), RepositoryError> {
        self.inner.delete_draw(id)
    }

    fn phases(&self) -> Result<Vec<ProcessPhase>, RepositoryError> {
        self.inner.phases()
    }

    fn insert_phase(&mut self, phase: NewPhase) -> Result<ProcessPhase, RepositoryError> {
        self.inner.insert_phase(phase)
    }

    fn update_phase(&mut self, phase: ProcessPhase) -> Result<(), RepositoryError> {
        self.inner.update_phase(phase)
    }

    fn logs(&self) -> Result<Vec<OperationLog>, RepositoryError> {
        self.inner.logs()
    }

    fn append_log(&mut self, entry: NewOperationLog) -> Result<OperationLog, RepositoryError> {
        self.inner.append_log(entry)
    }
}

/// Store whose every transaction fails before doing any work.
pub(super) struct OfflineStore;

impl AdmissionsRepository for OfflineStore {
    fn transaction<T, E>(
        &self,
        _work: impl FnOnce(&mut dyn RecordTransaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}
