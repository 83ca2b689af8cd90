//! Supervisor capacity rules.
//!
//! `max_students` has two writers: qualification review and quota overrides. Whichever wrote
//! last is the effective capacity. The admitted count is always derived from approved
//! applications, never cached on the supervisor. Neither writer may set a capacity below the
//! admitted count; only a rejected review, which zeroes capacity, is exempt.

use chrono::{DateTime, Duration, Months, Utc};

use super::domain::{
    calendar_year, ApplicationRecord, ApplicationStatus, QualificationStatus, QuotaAllocation,
    QuotaStatus, TeacherRecord, QUALIFICATION_VALIDITY_YEARS,
};
use super::errors::PolicyViolation;
use super::scoring::{GradeLevel, GradeStandards};

/// Number of approved applications among `applications`.
pub fn admitted_count(applications: &[ApplicationRecord]) -> u32 {
    applications
        .iter()
        .filter(|app| app.status == ApplicationStatus::Approved)
        .count() as u32
}

/// A supervisor may take one more student only while qualified and under capacity.
pub fn check_accept(
    teacher: &TeacherRecord,
    admitted: u32,
    now: DateTime<Utc>,
) -> Result<(), PolicyViolation> {
    if !teacher.is_qualified_at(now) {
        return Err(PolicyViolation::SupervisorUnavailable);
    }
    if admitted >= teacher.max_students {
        return Err(PolicyViolation::QuotaFull);
    }
    Ok(())
}

/// Seats still open, zero when the qualification has lapsed.
pub fn remaining_seats(teacher: &TeacherRecord, admitted: u32, now: DateTime<Utc>) -> u32 {
    if teacher.is_qualified_at(now) {
        teacher.max_students.saturating_sub(admitted)
    } else {
        0
    }
}

pub fn qualification_expiry(approved_at: DateTime<Utc>) -> DateTime<Utc> {
    let months = Months::new(12 * QUALIFICATION_VALIDITY_YEARS as u32);
    approved_at
        .checked_add_months(months)
        .unwrap_or_else(|| {
            approved_at + Duration::days(365 * i64::from(QUALIFICATION_VALIDITY_YEARS))
        })
}

/// Applies an approved qualification review: capacity becomes the grade's configured cap.
pub fn grant_qualification(
    teacher: &mut TeacherRecord,
    level: GradeLevel,
    standards: &GradeStandards,
    admitted: u32,
    now: DateTime<Utc>,
) -> Result<(), PolicyViolation> {
    let max_students = standards.max_students(level);
    if max_students < admitted {
        return Err(PolicyViolation::QuotaBelowAdmitted);
    }
    teacher.qualification_status = QualificationStatus::Approved;
    teacher.review_level = Some(level);
    teacher.qualification_year = Some(calendar_year(now));
    teacher.qualification_expires_at = Some(qualification_expiry(now));
    teacher.max_students = max_students;
    Ok(())
}

/// Applies a rejected qualification review: capacity drops to zero.
pub fn revoke_qualification(teacher: &mut TeacherRecord, now: DateTime<Utc>) {
    teacher.qualification_status = QualificationStatus::Rejected;
    teacher.review_level = None;
    teacher.qualification_year = Some(calendar_year(now));
    teacher.qualification_expires_at = None;
    teacher.max_students = 0;
}

/// Administrative override of capacity, independent of grade.
pub fn apply_quota(
    teacher: &mut TeacherRecord,
    max_students: u32,
    comment: Option<String>,
    admitted: u32,
    now: DateTime<Utc>,
) -> Result<(), PolicyViolation> {
    if max_students < admitted {
        return Err(PolicyViolation::QuotaBelowAdmitted);
    }
    teacher.max_students = max_students;
    teacher.quota = Some(QuotaAllocation {
        status: QuotaStatus::Allocated,
        year: calendar_year(now),
        comment,
    });
    Ok(())
}
