//! Ranked-choice rules for student applications.
//!
//! Every function here works on a snapshot of one student's applications that the caller
//! loaded inside the current transaction.

use std::cmp::Ordering;

use super::domain::{ApplicationRecord, ApplicationStatus, Priority, TeacherId, MAX_CHOICES};
use super::errors::PolicyViolation;

/// Checks whether `requested` may be claimed next, given every application the student holds.
pub fn check_priority(
    existing: &[ApplicationRecord],
    requested: Priority,
) -> Result<(), PolicyViolation> {
    if existing
        .iter()
        .any(|app| app.status == ApplicationStatus::Approved)
    {
        return Err(PolicyViolation::AlreadyApproved);
    }

    if existing
        .iter()
        .any(|app| app.status == ApplicationStatus::Pending)
    {
        return Err(PolicyViolation::AwaitingReview);
    }

    let claimed = existing.len();
    if claimed >= usize::from(MAX_CHOICES) {
        return Err(PolicyViolation::MaximumChoicesReached);
    }

    if claimed == 0 && requested != Priority::FIRST {
        return Err(PolicyViolation::FirstChoiceRequired);
    }

    if usize::from(requested.get()) != claimed + 1 {
        return Err(PolicyViolation::OutOfOrder);
    }

    Ok(())
}

/// Full admission check for a new application, in reporting order.
pub fn check_submission(
    existing: &[ApplicationRecord],
    teacher_id: TeacherId,
    requested: Priority,
) -> Result<(), PolicyViolation> {
    if existing.len() >= usize::from(MAX_CHOICES) {
        return Err(PolicyViolation::MaximumChoicesReached);
    }

    if existing.iter().any(|app| app.teacher_id == teacher_id) {
        return Err(PolicyViolation::DuplicateApplication);
    }

    check_priority(existing, requested)
}

/// The priority a student may submit next, or `None` while blocked.
pub fn next_available_priority(existing: &[ApplicationRecord]) -> Option<Priority> {
    let latest = existing.iter().max_by(|a, b| submission_order(a, b));

    match latest {
        None => Some(Priority::FIRST),
        Some(app) => match app.status {
            ApplicationStatus::Pending | ApplicationStatus::Approved => None,
            ApplicationStatus::Rejected => app.priority.next(),
        },
    }
}

/// Orders a supervisor's review queue: priority, then earliest submission, then id.
pub fn review_order(a: &ApplicationRecord, b: &ApplicationRecord) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| submission_order(a, b))
}

fn submission_order(a: &ApplicationRecord, b: &ApplicationRecord) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts in place into review order.
pub fn sort_for_review(applications: &mut [ApplicationRecord]) {
    applications.sort_by(review_order);
}
