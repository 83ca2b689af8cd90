use chrono::{DateTime, Utc};

use super::domain::{AdmissionApproval, ApplicationRecord, ApplicationStatus};
use super::errors::InvalidTransition;

pub const ACCEPTED_COMMENT: &str = "application approved";
pub const REJECTED_COMMENT: &str = "application not approved";
pub const CLAIMED_COMMENT: &str = "claimed by another supervisor";

pub fn ensure_pending(app: &ApplicationRecord) -> Result<(), InvalidTransition> {
    match app.status {
        ApplicationStatus::Pending => Ok(()),
        ApplicationStatus::Approved | ApplicationStatus::Rejected => {
            Err(InvalidTransition::NotPending)
        }
    }
}

/// Supervisor acceptance. Opens the administrative review overlay.
pub fn approve(app: &mut ApplicationRecord, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
    ensure_pending(app)?;
    app.status = ApplicationStatus::Approved;
    app.process_comment = Some(ACCEPTED_COMMENT.to_string());
    app.processed_at = Some(now);
    app.approval = Some(AdmissionApproval::awaiting_review());
    Ok(())
}

pub fn reject(
    app: &mut ApplicationRecord,
    comment: impl Into<String>,
    now: DateTime<Utc>,
) -> Result<(), InvalidTransition> {
    ensure_pending(app)?;
    app.status = ApplicationStatus::Rejected;
    app.process_comment = Some(comment.into());
    app.processed_at = Some(now);
    Ok(())
}
