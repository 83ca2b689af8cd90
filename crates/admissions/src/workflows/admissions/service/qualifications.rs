use tracing::{debug, info};

use super::{load_qualification, load_teacher, AdmissionsService};
use crate::workflows::admissions::audit::{NewOperationLog, RecordKind};
use crate::workflows::admissions::capacity::{
    admitted_count, grant_qualification, revoke_qualification,
};
use crate::workflows::admissions::domain::{
    calendar_year, QualificationId, QualificationRecord, QualificationStatus, ReviewDecision,
    ReviewStatus, TeacherId, UserId,
};
use crate::workflows::admissions::errors::{
    AdmissionsError, InvalidTransition, PolicyViolation, RecordRef,
};
use crate::workflows::admissions::repository::{AdmissionsRepository, NewQualification};
use crate::workflows::admissions::scoring::QualificationMetrics;

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    /// Score and file a supervisor's qualification application for the current year.
    pub fn submit_qualification(
        &self,
        teacher_id: TeacherId,
        metrics: QualificationMetrics,
    ) -> Result<QualificationRecord, AdmissionsError> {
        let card = self.engine.evaluate(&metrics)?;
        let level = self.engine.review_level(card.score);
        let now = self.now();
        let year = calendar_year(now);

        let record = self.transaction("submit_qualification", |tx| {
            let mut teacher = load_teacher(tx, teacher_id)?;
            if tx.qualification_for_year(teacher.id, year)?.is_some() {
                return Err(PolicyViolation::DuplicateQualification.into());
            }

            let created = tx.insert_qualification(NewQualification {
                teacher_id: teacher.id,
                year,
                metrics,
                score: card.score,
                score_detail: card.detail,
                review_level: level,
                created_at: now,
            })?;
            tx.append_log(NewOperationLog::insert(
                RecordKind::Qualification,
                created.id.0,
                Some(teacher.user_id),
                &created,
                now,
            )?)?;

            if matches!(
                teacher.qualification_status,
                QualificationStatus::NotApplied | QualificationStatus::Rejected
            ) {
                let before = teacher.clone();
                teacher.qualification_status = QualificationStatus::Pending;
                tx.update_teacher(teacher.clone())?;
                tx.append_log(NewOperationLog::update(
                    RecordKind::Teacher,
                    teacher.id.0,
                    Some(teacher.user_id),
                    &before,
                    &teacher,
                    now,
                )?)?;
            }
            Ok(created)
        })?;

        info!(
            qualification = %record.id,
            supervisor = %teacher_id,
            score = record.score,
            level = %record.review_level,
            "qualification submitted"
        );
        Ok(record)
    }

    /// Replace the metrics of a qualification that has not been reviewed yet.
    pub fn amend_qualification(
        &self,
        qualification_id: QualificationId,
        teacher_id: TeacherId,
        metrics: QualificationMetrics,
    ) -> Result<QualificationRecord, AdmissionsError> {
        let card = self.engine.evaluate(&metrics)?;
        let level = self.engine.review_level(card.score);
        let now = self.now();

        let record = self.transaction("amend_qualification", |tx| {
            let mut qualification = load_qualification(tx, qualification_id)?;
            if qualification.teacher_id != teacher_id {
                return Err(AdmissionsError::Forbidden(RecordRef::Qualification(
                    qualification.id,
                )));
            }
            if qualification.status != ReviewStatus::Pending {
                return Err(InvalidTransition::AlreadyReviewed.into());
            }
            let teacher = load_teacher(tx, teacher_id)?;

            let before = qualification.clone();
            qualification.metrics = metrics;
            qualification.score = card.score;
            qualification.score_detail = card.detail;
            qualification.review_level = level;
            qualification.updated_at = Some(now);
            tx.update_qualification(qualification.clone())?;
            tx.append_log(NewOperationLog::update(
                RecordKind::Qualification,
                qualification.id.0,
                Some(teacher.user_id),
                &before,
                &qualification,
                now,
            )?)?;
            Ok(qualification)
        })?;

        info!(
            qualification = %record.id,
            score = record.score,
            level = %record.review_level,
            "qualification amended"
        );
        Ok(record)
    }

    /// Record an administrator's verdict and propagate it to the supervisor's capacity.
    /// Reviewed applications may be reviewed again; the latest verdict wins.
    pub fn review_qualification(
        &self,
        qualification_id: QualificationId,
        reviewer_id: UserId,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<QualificationRecord, AdmissionsError> {
        let now = self.now();
        let standards = self.engine.standards();

        let record = self.transaction("review_qualification", |tx| {
            let mut qualification = load_qualification(tx, qualification_id)?;
            let before = qualification.clone();
            qualification.status = decision.into();
            qualification.reviewer_id = Some(reviewer_id);
            qualification.reviewed_at = Some(now);
            qualification.review_comment = comment;
            qualification.updated_at = Some(now);
            tx.update_qualification(qualification.clone())?;
            tx.append_log(NewOperationLog::update(
                RecordKind::Qualification,
                qualification.id.0,
                Some(reviewer_id),
                &before,
                &qualification,
                now,
            )?)?;

            let mut teacher = load_teacher(tx, qualification.teacher_id)?;
            let before = teacher.clone();
            match decision {
                ReviewDecision::Approved => {
                    let admitted = admitted_count(&tx.applications_for_teacher(teacher.id)?);
                    grant_qualification(
                        &mut teacher,
                        qualification.review_level,
                        standards,
                        admitted,
                        now,
                    )?
                }
                ReviewDecision::Rejected => revoke_qualification(&mut teacher, now),
            }
            tx.update_teacher(teacher.clone())?;
            tx.append_log(NewOperationLog::update(
                RecordKind::Teacher,
                teacher.id.0,
                Some(reviewer_id),
                &before,
                &teacher,
                now,
            )?)?;
            Ok(qualification)
        })?;

        info!(
            qualification = %record.id,
            supervisor = %record.teacher_id,
            status = record.status.label(),
            reviewer = %reviewer_id,
            "qualification reviewed"
        );
        Ok(record)
    }

    pub fn qualification(
        &self,
        qualification_id: QualificationId,
    ) -> Result<QualificationRecord, AdmissionsError> {
        self.transaction("qualification", |tx| load_qualification(tx, qualification_id))
    }

    /// Applications awaiting review, oldest first.
    pub fn pending_qualifications(&self) -> Result<Vec<QualificationRecord>, AdmissionsError> {
        let mut pending: Vec<QualificationRecord> =
            self.transaction("pending_qualifications", |tx| {
                Ok(tx
                    .qualifications()?
                    .into_iter()
                    .filter(|qualification| qualification.status == ReviewStatus::Pending)
                    .collect())
            })?;
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        debug!(count = pending.len(), "listed pending qualifications");
        Ok(pending)
    }

    /// A supervisor's applications across years, newest year first.
    pub fn qualification_history(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<QualificationRecord>, AdmissionsError> {
        let mut history: Vec<QualificationRecord> =
            self.transaction("qualification_history", |tx| {
                let teacher = load_teacher(tx, teacher_id)?;
                Ok(tx
                    .qualifications()?
                    .into_iter()
                    .filter(|qualification| qualification.teacher_id == teacher.id)
                    .collect())
            })?;
        history.sort_by(|a, b| b.year.cmp(&a.year));
        Ok(history)
    }
}
