use serde::Serialize;
use tracing::{debug, info};

use super::{load_application, load_student, load_teacher, AdmissionsService};
use crate::workflows::admissions::approval;
use crate::workflows::admissions::audit::{NewOperationLog, RecordKind};
use crate::workflows::admissions::capacity::{admitted_count, check_accept};
use crate::workflows::admissions::domain::{
    AdmissionDecision, ApplicationId, ApplicationRecord, ApplicationRequest, ApplicationStatus,
    EligibilityStatus, Priority, StudentId, TeacherId, UserId,
};
use crate::workflows::admissions::errors::{AdmissionsError, PolicyViolation, RecordRef};
use crate::workflows::admissions::lifecycle::{self, CLAIMED_COMMENT, REJECTED_COMMENT};
use crate::workflows::admissions::repository::{AdmissionsRepository, NewApplication};
use crate::workflows::admissions::sequencing::{check_submission, next_available_priority};

/// Result of a supervisor acceptance: the approved application plus every sibling that was
/// auto-rejected in the same transaction.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    pub application: ApplicationRecord,
    pub rejected_siblings: Vec<ApplicationId>,
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    /// Submit a ranked choice for a student.
    pub fn submit_application(
        &self,
        request: ApplicationRequest,
    ) -> Result<ApplicationRecord, AdmissionsError> {
        let now = self.now();
        let record = self.transaction("submit_application", |tx| {
            let student = load_student(tx, request.student_id)?;
            if student.status != EligibilityStatus::Approved {
                return Err(PolicyViolation::StudentNotEligible.into());
            }
            let teacher = load_teacher(tx, request.teacher_id)?;
            if !teacher.is_qualified_at(now) {
                return Err(PolicyViolation::SupervisorUnavailable.into());
            }

            let existing = tx.applications_for_student(student.id)?;
            check_submission(&existing, teacher.id, request.priority)?;

            let created = tx.insert_application(NewApplication {
                student_id: student.id,
                teacher_id: teacher.id,
                priority: request.priority,
                statements: request.statements,
                created_at: now,
            })?;
            tx.append_log(NewOperationLog::insert(
                RecordKind::Application,
                created.id.0,
                Some(student.user_id),
                &created,
                now,
            )?)?;
            Ok(created)
        })?;

        info!(
            application = %record.id,
            student = %record.student_id,
            supervisor = %record.teacher_id,
            priority = record.priority.get(),
            "application submitted"
        );
        Ok(record)
    }

    /// Delete a still-pending application on behalf of the student who owns it.
    pub fn withdraw_application(
        &self,
        application_id: ApplicationId,
        student_id: StudentId,
    ) -> Result<(), AdmissionsError> {
        let now = self.now();
        self.transaction("withdraw_application", |tx| {
            let app = load_application(tx, application_id)?;
            if app.student_id != student_id {
                return Err(AdmissionsError::Forbidden(RecordRef::Application(app.id)));
            }
            lifecycle::ensure_pending(&app)?;

            let operator = tx.student(student_id)?.map(|student| student.user_id);
            tx.delete_application(app.id)?;
            tx.append_log(NewOperationLog::delete(
                RecordKind::Application,
                app.id.0,
                operator,
                &app,
                now,
            )?)?;
            Ok(())
        })?;

        info!(application = %application_id, student = %student_id, "application withdrawn");
        Ok(())
    }

    /// Supervisor acceptance. Claims the student: their other pending choices are rejected in
    /// the same transaction.
    pub fn accept_application(
        &self,
        application_id: ApplicationId,
        teacher_id: TeacherId,
    ) -> Result<AcceptOutcome, AdmissionsError> {
        let now = self.now();
        let outcome = self.transaction("accept_application", |tx| {
            let mut app = load_application(tx, application_id)?;
            if app.teacher_id != teacher_id {
                return Err(AdmissionsError::Forbidden(RecordRef::Application(app.id)));
            }
            lifecycle::ensure_pending(&app)?;

            let teacher = load_teacher(tx, teacher_id)?;
            let admitted = admitted_count(&tx.applications_for_teacher(teacher.id)?);
            check_accept(&teacher, admitted, now)?;

            let before = app.clone();
            lifecycle::approve(&mut app, now)?;
            tx.update_application(app.clone())?;
            tx.append_log(NewOperationLog::update(
                RecordKind::Application,
                app.id.0,
                Some(teacher.user_id),
                &before,
                &app,
                now,
            )?)?;

            let mut rejected_siblings = Vec::new();
            for mut sibling in tx.applications_for_student(app.student_id)? {
                if sibling.id == app.id || sibling.status != ApplicationStatus::Pending {
                    continue;
                }
                let before = sibling.clone();
                lifecycle::reject(&mut sibling, CLAIMED_COMMENT, now)?;
                tx.update_application(sibling.clone())?;
                tx.append_log(NewOperationLog::update(
                    RecordKind::Application,
                    sibling.id.0,
                    Some(teacher.user_id),
                    &before,
                    &sibling,
                    now,
                )?)?;
                rejected_siblings.push(sibling.id);
            }

            Ok(AcceptOutcome {
                application: app,
                rejected_siblings,
            })
        })?;

        info!(
            application = %outcome.application.id,
            supervisor = %teacher_id,
            siblings_rejected = outcome.rejected_siblings.len(),
            "application accepted"
        );
        Ok(outcome)
    }

    /// Supervisor rejection. A blank comment falls back to the standard wording.
    pub fn reject_application(
        &self,
        application_id: ApplicationId,
        teacher_id: TeacherId,
        comment: Option<String>,
    ) -> Result<ApplicationRecord, AdmissionsError> {
        let now = self.now();
        let comment = comment
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| REJECTED_COMMENT.to_string());

        let record = self.transaction("reject_application", |tx| {
            let mut app = load_application(tx, application_id)?;
            if app.teacher_id != teacher_id {
                return Err(AdmissionsError::Forbidden(RecordRef::Application(app.id)));
            }
            let teacher = load_teacher(tx, teacher_id)?;

            let before = app.clone();
            lifecycle::reject(&mut app, comment, now)?;
            tx.update_application(app.clone())?;
            tx.append_log(NewOperationLog::update(
                RecordKind::Application,
                app.id.0,
                Some(teacher.user_id),
                &before,
                &app,
                now,
            )?)?;
            Ok(app)
        })?;

        info!(application = %record.id, supervisor = %teacher_id, "application rejected");
        Ok(record)
    }

    /// Administrative sign-off on a supervisor-approved application.
    pub fn approve_admission(
        &self,
        application_id: ApplicationId,
        approver_id: UserId,
        decision: AdmissionDecision,
        comment: Option<String>,
    ) -> Result<ApplicationRecord, AdmissionsError> {
        let now = self.now();
        let record = self.transaction("approve_admission", |tx| {
            let mut app = load_application(tx, application_id)?;
            let before = app.clone();
            approval::decide(&mut app, decision, approver_id, comment, now)?;
            tx.update_application(app.clone())?;
            tx.append_log(NewOperationLog::update(
                RecordKind::Application,
                app.id.0,
                Some(approver_id),
                &before,
                &app,
                now,
            )?)?;
            Ok(app)
        })?;

        info!(
            application = %record.id,
            approver = %approver_id,
            decision = ?decision,
            "admission decided"
        );
        Ok(record)
    }

    pub fn application(
        &self,
        application_id: ApplicationId,
    ) -> Result<ApplicationRecord, AdmissionsError> {
        debug!(application = %application_id, "fetching application");
        self.transaction("application", |tx| load_application(tx, application_id))
    }

    /// The priority the student may submit next, `None` while blocked or exhausted.
    pub fn next_priority(
        &self,
        student_id: StudentId,
    ) -> Result<Option<Priority>, AdmissionsError> {
        self.transaction("next_priority", |tx| {
            let student = load_student(tx, student_id)?;
            Ok(next_available_priority(
                &tx.applications_for_student(student.id)?,
            ))
        })
    }
}
