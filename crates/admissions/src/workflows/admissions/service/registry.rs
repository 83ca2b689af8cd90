use serde::Serialize;
use tracing::{debug, info};

use super::{load_student, load_teacher, AdmissionsService};
use crate::workflows::admissions::audit::{NewOperationLog, RecordKind};
use crate::workflows::admissions::domain::{
    EligibilityStatus, StudentId, StudentRecord, StudentRegistration, TeacherId, TeacherRecord,
    TeacherRegistration, UserId,
};
use crate::workflows::admissions::errors::{AdmissionsError, PolicyViolation, ValidationError};
use crate::workflows::admissions::repository::{AdmissionsRepository, NewStudent, NewTeacher};

/// Rows removed alongside a student or supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub applications: usize,
    pub draws: usize,
    pub qualifications: usize,
}

fn require_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "name" });
    }
    Ok(())
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    /// New students start with eligibility pending admin review.
    pub fn register_student(
        &self,
        registration: StudentRegistration,
    ) -> Result<StudentRecord, AdmissionsError> {
        require_name(&registration.name)?;
        let now = self.now();

        let student = self.transaction("register_student", |tx| {
            if tx
                .students()?
                .iter()
                .any(|student| student.user_id == registration.user_id)
            {
                return Err(PolicyViolation::AlreadyRegistered.into());
            }
            let created = tx.insert_student(NewStudent {
                user_id: registration.user_id,
                name: registration.name,
                status: EligibilityStatus::Pending,
                initial_score: registration.initial_score,
                retest_score: registration.retest_score,
                phone: registration.phone,
                email: registration.email,
            })?;
            tx.append_log(NewOperationLog::insert(
                RecordKind::Student,
                created.id.0,
                Some(created.user_id),
                &created,
                now,
            )?)?;
            Ok(created)
        })?;

        info!(student = %student.id, user = %student.user_id, "student registered");
        Ok(student)
    }

    /// Admin eligibility review.
    pub fn review_student(
        &self,
        student_id: StudentId,
        status: EligibilityStatus,
        reviewer_id: UserId,
    ) -> Result<StudentRecord, AdmissionsError> {
        let now = self.now();
        let student = self.transaction("review_student", |tx| {
            let mut student = load_student(tx, student_id)?;
            let before = student.clone();
            student.status = status;
            tx.update_student(student.clone())?;
            tx.append_log(NewOperationLog::update(
                RecordKind::Student,
                student.id.0,
                Some(reviewer_id),
                &before,
                &student,
                now,
            )?)?;
            Ok(student)
        })?;

        info!(
            student = %student.id,
            status = student.status.label(),
            "student eligibility reviewed"
        );
        Ok(student)
    }

    /// Removes the student with their applications and draw records.
    pub fn delete_student(
        &self,
        student_id: StudentId,
        admin_id: UserId,
    ) -> Result<DeletionSummary, AdmissionsError> {
        let now = self.now();
        let summary = self.transaction("delete_student", |tx| {
            let student = load_student(tx, student_id)?;
            let mut summary = DeletionSummary::default();

            for app in tx.applications_for_student(student.id)? {
                tx.delete_application(app.id)?;
                tx.append_log(NewOperationLog::delete(
                    RecordKind::Application,
                    app.id.0,
                    Some(admin_id),
                    &app,
                    now,
                )?)?;
                summary.applications += 1;
            }
            for draw in tx.draws()? {
                if draw.student_id != student.id {
                    continue;
                }
                tx.delete_draw(draw.id)?;
                tx.append_log(NewOperationLog::delete(
                    RecordKind::Draw,
                    draw.id.0,
                    Some(admin_id),
                    &draw,
                    now,
                )?)?;
                summary.draws += 1;
            }

            tx.delete_student(student.id)?;
            tx.append_log(NewOperationLog::delete(
                RecordKind::Student,
                student.id.0,
                Some(admin_id),
                &student,
                now,
            )?)?;
            Ok(summary)
        })?;

        info!(
            student = %student_id,
            applications = summary.applications,
            draws = summary.draws,
            "student deleted"
        );
        Ok(summary)
    }

    /// New supervisors have no qualification and no capacity.
    pub fn register_teacher(
        &self,
        registration: TeacherRegistration,
    ) -> Result<TeacherRecord, AdmissionsError> {
        require_name(&registration.name)?;
        let now = self.now();

        let teacher = self.transaction("register_teacher", |tx| {
            if tx
                .teachers()?
                .iter()
                .any(|teacher| teacher.user_id == registration.user_id)
            {
                return Err(PolicyViolation::AlreadyRegistered.into());
            }
            let created = tx.insert_teacher(NewTeacher {
                user_id: registration.user_id,
                name: registration.name,
                title: registration.title,
            })?;
            tx.append_log(NewOperationLog::insert(
                RecordKind::Teacher,
                created.id.0,
                Some(created.user_id),
                &created,
                now,
            )?)?;
            Ok(created)
        })?;

        info!(supervisor = %teacher.id, user = %teacher.user_id, "supervisor registered");
        Ok(teacher)
    }

    /// Removes the supervisor with their applications, draw records and qualification
    /// applications.
    pub fn delete_teacher(
        &self,
        teacher_id: TeacherId,
        admin_id: UserId,
    ) -> Result<DeletionSummary, AdmissionsError> {
        let now = self.now();
        let summary = self.transaction("delete_teacher", |tx| {
            let teacher = load_teacher(tx, teacher_id)?;
            let mut summary = DeletionSummary::default();

            for app in tx.applications_for_teacher(teacher.id)? {
                tx.delete_application(app.id)?;
                tx.append_log(NewOperationLog::delete(
                    RecordKind::Application,
                    app.id.0,
                    Some(admin_id),
                    &app,
                    now,
                )?)?;
                summary.applications += 1;
            }
            for draw in tx.draws()? {
                if draw.teacher_id != teacher.id {
                    continue;
                }
                tx.delete_draw(draw.id)?;
                tx.append_log(NewOperationLog::delete(
                    RecordKind::Draw,
                    draw.id.0,
                    Some(admin_id),
                    &draw,
                    now,
                )?)?;
                summary.draws += 1;
            }
            for qualification in tx.qualifications()? {
                if qualification.teacher_id != teacher.id {
                    continue;
                }
                tx.delete_qualification(qualification.id)?;
                tx.append_log(NewOperationLog::delete(
                    RecordKind::Qualification,
                    qualification.id.0,
                    Some(admin_id),
                    &qualification,
                    now,
                )?)?;
                summary.qualifications += 1;
            }

            tx.delete_teacher(teacher.id)?;
            tx.append_log(NewOperationLog::delete(
                RecordKind::Teacher,
                teacher.id.0,
                Some(admin_id),
                &teacher,
                now,
            )?)?;
            Ok(summary)
        })?;

        info!(
            supervisor = %teacher_id,
            applications = summary.applications,
            draws = summary.draws,
            qualifications = summary.qualifications,
            "supervisor deleted"
        );
        Ok(summary)
    }

    pub fn student(&self, student_id: StudentId) -> Result<StudentRecord, AdmissionsError> {
        debug!(student = %student_id, "fetching student");
        self.transaction("student", |tx| load_student(tx, student_id))
    }

    pub fn teacher(&self, teacher_id: TeacherId) -> Result<TeacherRecord, AdmissionsError> {
        debug!(supervisor = %teacher_id, "fetching supervisor");
        self.transaction("teacher", |tx| load_teacher(tx, teacher_id))
    }
}
