use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::{load_student, load_teacher, AdmissionsService};
use crate::workflows::admissions::approval::AdmissionSummary;
use crate::workflows::admissions::capacity::remaining_seats;
use crate::workflows::admissions::domain::{
    ApplicationRecord, ApplicationStatus, QualificationStatus, StudentId, TeacherId,
    TeacherRecord,
};
use crate::workflows::admissions::errors::AdmissionsError;
use crate::workflows::admissions::repository::AdmissionsRepository;
use crate::workflows::admissions::scoring::GradeLevel;
use crate::workflows::admissions::sequencing::sort_for_review;

/// A supervisor with live application counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorLoad {
    pub teacher_id: TeacherId,
    pub name: String,
    pub title: Option<String>,
    pub qualification_status: QualificationStatus,
    pub review_level: Option<GradeLevel>,
    pub max_students: u32,
    pub admitted: u32,
    pub pending: u32,
    pub remaining: u32,
}

impl SupervisorLoad {
    fn tally(
        teacher: &TeacherRecord,
        applications: &[ApplicationRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let (mut admitted, mut pending) = (0u32, 0u32);
        for app in applications.iter().filter(|app| app.teacher_id == teacher.id) {
            match app.status {
                ApplicationStatus::Approved => admitted += 1,
                ApplicationStatus::Pending => pending += 1,
                ApplicationStatus::Rejected => {}
            }
        }
        Self {
            teacher_id: teacher.id,
            name: teacher.name.clone(),
            title: teacher.title.clone(),
            qualification_status: teacher.qualification_status,
            review_level: teacher.review_level,
            max_students: teacher.max_students,
            admitted,
            pending,
            remaining: remaining_seats(teacher, admitted, now),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationStatistics {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl ApplicationStatistics {
    pub fn from_records(records: &[ApplicationRecord]) -> Self {
        records.iter().fold(Self::default(), |mut stats, app| {
            stats.total += 1;
            match app.status {
                ApplicationStatus::Pending => stats.pending += 1,
                ApplicationStatus::Approved => stats.approved += 1,
                ApplicationStatus::Rejected => stats.rejected += 1,
            }
            stats
        })
    }
}

/// Supervisor-approved applications with their administrative progress.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionsOverview {
    pub applications: Vec<ApplicationRecord>,
    pub summary: AdmissionSummary,
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    /// Every application a student holds, newest first.
    pub fn student_applications(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ApplicationRecord>, AdmissionsError> {
        let mut applications = self.transaction("student_applications", |tx| {
            let student = load_student(tx, student_id)?;
            Ok(tx.applications_for_student(student.id)?)
        })?;
        applications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(applications)
    }

    /// Pending applications addressed to a supervisor, in review order.
    pub fn review_queue(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<ApplicationRecord>, AdmissionsError> {
        let mut queue: Vec<ApplicationRecord> = self.transaction("review_queue", |tx| {
            let teacher = load_teacher(tx, teacher_id)?;
            Ok(tx
                .applications_for_teacher(teacher.id)?
                .into_iter()
                .filter(|app| app.status == ApplicationStatus::Pending)
                .collect())
        })?;
        sort_for_review(&mut queue);
        debug!(supervisor = %teacher_id, pending = queue.len(), "built review queue");
        Ok(queue)
    }

    /// Supervisors students may currently apply to, by name.
    pub fn available_supervisors(&self) -> Result<Vec<SupervisorLoad>, AdmissionsError> {
        let now = self.now();
        let mut available: Vec<SupervisorLoad> =
            self.transaction("available_supervisors", |tx| {
                let applications = tx.applications()?;
                Ok(tx
                    .teachers()?
                    .iter()
                    .filter(|teacher| teacher.is_qualified_at(now))
                    .map(|teacher| SupervisorLoad::tally(teacher, &applications, now))
                    .collect())
            })?;
        available.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.teacher_id.cmp(&b.teacher_id)));
        Ok(available)
    }

    /// All supervisors with their counts, by id.
    pub fn supervisor_roster(&self) -> Result<Vec<SupervisorLoad>, AdmissionsError> {
        let now = self.now();
        self.transaction("supervisor_roster", |tx| {
            let applications = tx.applications()?;
            Ok(tx
                .teachers()?
                .iter()
                .map(|teacher| SupervisorLoad::tally(teacher, &applications, now))
                .collect())
        })
    }

    /// Supervisor-approved applications, most recently processed first.
    pub fn pending_admissions(&self) -> Result<AdmissionsOverview, AdmissionsError> {
        let mut applications: Vec<ApplicationRecord> =
            self.transaction("pending_admissions", |tx| {
                Ok(tx
                    .applications()?
                    .into_iter()
                    .filter(|app| app.status == ApplicationStatus::Approved)
                    .collect())
            })?;
        applications.sort_by(|a, b| {
            b.processed_at
                .cmp(&a.processed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        let summary = AdmissionSummary::from_records(&applications);
        Ok(AdmissionsOverview {
            applications,
            summary,
        })
    }

    pub fn application_statistics(&self) -> Result<ApplicationStatistics, AdmissionsError> {
        self.transaction("application_statistics", |tx| {
            Ok(ApplicationStatistics::from_records(&tx.applications()?))
        })
    }
}
