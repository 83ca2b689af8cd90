//! CSV export of the admissions roster.

use std::io::Write;

use serde::Serialize;

use super::domain::{ApplicationRecord, ApplicationStatus, StudentRecord, TeacherRecord};
use super::errors::AdmissionsError;
use super::repository::AdmissionsRepository;
use super::service::AdmissionsService;

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Admissions(AdmissionsError),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "failed to write roster: {}", err),
            ExportError::Csv(err) => write!(f, "failed to encode roster: {}", err),
            ExportError::Admissions(err) => write!(f, "failed to load roster: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Csv(err) => Some(err),
            ExportError::Admissions(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<AdmissionsError> for ExportError {
    fn from(err: AdmissionsError) -> Self {
        Self::Admissions(err)
    }
}

/// One admitted student as written to the roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterRow {
    pub application_id: u64,
    pub student: String,
    pub supervisor: String,
    pub priority: u8,
    pub status: &'static str,
    pub approval_status: &'static str,
    pub initial_score: f64,
    pub retest_score: f64,
    pub total_score: f64,
}

/// Supervisor-approved applications joined with their student and supervisor, by
/// application id. Applications whose student or supervisor is missing are skipped.
pub fn roster_rows(
    applications: &[ApplicationRecord],
    students: &[StudentRecord],
    teachers: &[TeacherRecord],
) -> Vec<RosterRow> {
    let mut rows: Vec<RosterRow> = applications
        .iter()
        .filter(|app| app.status == ApplicationStatus::Approved)
        .filter_map(|app| {
            let student = students.iter().find(|student| student.id == app.student_id)?;
            let teacher = teachers.iter().find(|teacher| teacher.id == app.teacher_id)?;
            Some(RosterRow {
                application_id: app.id.0,
                student: student.name.clone(),
                supervisor: teacher.name.clone(),
                priority: app.priority.get(),
                status: app.status.label(),
                approval_status: app.approval_status().map_or("", |status| status.label()),
                initial_score: student.initial_score,
                retest_score: student.retest_score,
                total_score: student.total_score(),
            })
        })
        .collect();
    rows.sort_by_key(|row| row.application_id);
    rows
}

pub fn write_roster<W: Write>(writer: W, rows: &[RosterRow]) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    pub fn admissions_roster(&self) -> Result<Vec<RosterRow>, AdmissionsError> {
        let (applications, students, teachers) = self.read_all()?;
        Ok(roster_rows(&applications, &students, &teachers))
    }

    pub fn export_roster<W: Write>(&self, writer: W) -> Result<usize, ExportError> {
        let rows = self.admissions_roster()?;
        write_roster(writer, &rows)?;
        Ok(rows.len())
    }
}
