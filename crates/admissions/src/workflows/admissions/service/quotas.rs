use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{load_teacher, AdmissionsService};
use crate::workflows::admissions::audit::{NewOperationLog, RecordKind};
use crate::workflows::admissions::capacity::{admitted_count, apply_quota};
use crate::workflows::admissions::domain::{TeacherId, TeacherRecord, UserId};
use crate::workflows::admissions::errors::{AdmissionsError, ValidationError};
use crate::workflows::admissions::repository::{AdmissionsRepository, RecordTransaction};

/// Capacity override for a single supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUpdate {
    pub max_students: u32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// One line of a batch override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEntry {
    pub teacher_id: TeacherId,
    pub max_students: u32,
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    pub fn update_quota(
        &self,
        teacher_id: TeacherId,
        update: QuotaUpdate,
        admin_id: UserId,
    ) -> Result<TeacherRecord, AdmissionsError> {
        let now = self.now();
        let teacher = self.transaction("update_quota", |tx| {
            override_quota(tx, teacher_id, update.max_students, update.comment, admin_id, now)
        })?;

        info!(
            supervisor = %teacher.id,
            max_students = teacher.max_students,
            admin = %admin_id,
            "quota updated"
        );
        Ok(teacher)
    }

    /// Applies every entry or none of them.
    pub fn batch_update_quota(
        &self,
        entries: Vec<QuotaEntry>,
        comment: Option<String>,
        admin_id: UserId,
    ) -> Result<Vec<TeacherRecord>, AdmissionsError> {
        if entries.is_empty() {
            return Err(ValidationError::EmptyQuotaBatch.into());
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.teacher_id) {
                return Err(ValidationError::DuplicateQuotaEntry(entry.teacher_id).into());
            }
        }

        let now = self.now();
        let updated = self.transaction("batch_update_quota", |tx| {
            let mut updated = Vec::with_capacity(entries.len());
            for entry in &entries {
                updated.push(override_quota(
                    tx,
                    entry.teacher_id,
                    entry.max_students,
                    comment.clone(),
                    admin_id,
                    now,
                )?);
            }
            Ok(updated)
        })?;

        info!(supervisors = updated.len(), admin = %admin_id, "quota batch applied");
        Ok(updated)
    }
}

fn override_quota(
    tx: &mut dyn RecordTransaction,
    teacher_id: TeacherId,
    max_students: u32,
    comment: Option<String>,
    admin_id: UserId,
    now: DateTime<Utc>,
) -> Result<TeacherRecord, AdmissionsError> {
    let mut teacher = load_teacher(tx, teacher_id)?;
    let admitted = admitted_count(&tx.applications_for_teacher(teacher.id)?);

    let before = teacher.clone();
    apply_quota(&mut teacher, max_students, comment, admitted, now)?;
    tx.update_teacher(teacher.clone())?;
    tx.append_log(NewOperationLog::update(
        RecordKind::Teacher,
        teacher.id.0,
        Some(admin_id),
        &before,
        &teacher,
        now,
    )?)?;
    Ok(teacher)
}
