use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    AdmissionDecision, ApplicationRecord, ApplicationStatus, ApprovalStatus, UserId,
};
use super::errors::InvalidTransition;

/// Records the administrative verdict on a supervisor-approved application.
///
/// Terminal: a decided admission cannot be decided again, and the supervisor-side status is
/// left untouched either way.
pub fn decide(
    app: &mut ApplicationRecord,
    decision: AdmissionDecision,
    approver: UserId,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), InvalidTransition> {
    if app.status != ApplicationStatus::Approved {
        return Err(InvalidTransition::NotAwaitingApproval);
    }

    let approval = match app.approval.as_mut() {
        Some(approval) if approval.status == ApprovalStatus::PendingAdminReview => approval,
        _ => return Err(InvalidTransition::NotAwaitingApproval),
    };

    approval.status = match decision {
        AdmissionDecision::Approved => ApprovalStatus::Approved,
        AdmissionDecision::Rejected => ApprovalStatus::Rejected,
    };
    approval.approver_id = Some(approver);
    approval.decided_at = Some(now);
    approval.comment = comment;
    Ok(())
}

/// Counts shown on the admissions overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionSummary {
    pub total: usize,
    pub awaiting_approval: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl AdmissionSummary {
    pub fn from_records(records: &[ApplicationRecord]) -> Self {
        records
            .iter()
            .filter_map(ApplicationRecord::approval_status)
            .fold(Self::default(), |mut summary, status| {
                summary.total += 1;
                match status {
                    ApprovalStatus::PendingAdminReview => summary.awaiting_approval += 1,
                    ApprovalStatus::Approved => summary.approved += 1,
                    ApprovalStatus::Rejected => summary.rejected += 1,
                }
                summary
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::admissions::domain::{
        AdmissionApproval, ApplicationId, ApplicationStatements, Priority, StudentId, TeacherId,
    };

    fn supervisor_approved() -> ApplicationRecord {
        ApplicationRecord {
            id: ApplicationId(4),
            student_id: StudentId(2),
            teacher_id: TeacherId(3),
            priority: Priority::FIRST,
            status: ApplicationStatus::Approved,
            statements: ApplicationStatements::default(),
            process_comment: None,
            processed_at: Some(Utc::now()),
            approval: Some(AdmissionApproval::awaiting_review()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn decision_is_stamped_and_final() {
        let mut app = supervisor_approved();
        decide(
            &mut app,
            AdmissionDecision::Approved,
            UserId(1),
            Some("welcome".to_string()),
            Utc::now(),
        )
        .expect("first decision succeeds");

        let approval = app.approval.clone().expect("approval present");
        assert_eq!(approval.status, ApprovalStatus::Approved);
        assert_eq!(approval.approver_id, Some(UserId(1)));
        assert!(approval.decided_at.is_some());

        assert_eq!(
            decide(&mut app, AdmissionDecision::Rejected, UserId(1), None, Utc::now()),
            Err(InvalidTransition::NotAwaitingApproval)
        );
        assert_eq!(app.status, ApplicationStatus::Approved);
    }

    #[test]
    fn rejection_keeps_supervisor_status() {
        let mut app = supervisor_approved();
        decide(&mut app, AdmissionDecision::Rejected, UserId(1), None, Utc::now())
            .expect("decision succeeds");
        assert_eq!(app.status, ApplicationStatus::Approved);
        assert_eq!(app.approval_status(), Some(ApprovalStatus::Rejected));
    }

    #[test]
    fn pending_applications_cannot_be_admitted() {
        let mut app = supervisor_approved();
        app.status = ApplicationStatus::Pending;
        app.approval = None;
        assert_eq!(
            decide(&mut app, AdmissionDecision::Approved, UserId(1), None, Utc::now()),
            Err(InvalidTransition::NotAwaitingApproval)
        );
    }

    #[test]
    fn summary_counts_by_approval_status() {
        let mut decided = supervisor_approved();
        decide(&mut decided, AdmissionDecision::Approved, UserId(1), None, Utc::now())
            .expect("decision succeeds");
        let summary = AdmissionSummary::from_records(&[decided, supervisor_approved()]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.awaiting_approval, 1);
        assert_eq!(summary.approved, 1);
    }
}
