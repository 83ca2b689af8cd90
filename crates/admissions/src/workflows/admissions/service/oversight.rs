use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use super::{load_teacher, AdmissionsService};
use crate::workflows::admissions::audit::{LogFilter, NewOperationLog, OperationLog, RecordKind};
use crate::workflows::admissions::domain::{
    DrawRecord, DrawResult, PhaseId, StudentId, TeacherId, UserId,
};
use crate::workflows::admissions::errors::{AdmissionsError, PolicyViolation, RecordRef};
use crate::workflows::admissions::lottery::{self, DrawCandidate};
use crate::workflows::admissions::phases::{
    check_conflicts, current_phase, PhaseKind, PhasePlan, PhaseStatistics, PhaseStatus,
    ProcessPhase,
};
use crate::workflows::admissions::repository::{AdmissionsRepository, NewDraw, NewPhase};

#[derive(Debug, Clone, Serialize)]
pub struct DrawOutcome {
    pub draw: DrawRecord,
    pub candidate: DrawCandidate,
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    pub fn draw_candidates(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<DrawCandidate>, AdmissionsError> {
        self.transaction("draw_candidates", |tx| {
            let teacher = load_teacher(tx, teacher_id)?;
            Ok(lottery::candidates(
                teacher.id,
                &tx.students()?,
                &tx.applications()?,
                &tx.draws()?,
            ))
        })
    }

    /// Draws one candidate uniformly at random and records the result.
    pub fn draw_lot<G: Rng>(
        &self,
        teacher_id: TeacherId,
        rng: &mut G,
    ) -> Result<DrawOutcome, AdmissionsError> {
        let now = self.now();
        let outcome = self.transaction("draw_lot", |tx| {
            let teacher = load_teacher(tx, teacher_id)?;
            let pool = lottery::candidates(
                teacher.id,
                &tx.students()?,
                &tx.applications()?,
                &tx.draws()?,
            );
            let candidate = lottery::pick(&pool, rng)
                .cloned()
                .ok_or(PolicyViolation::NoDrawCandidates)?;

            let draw = tx.insert_draw(NewDraw {
                teacher_id: teacher.id,
                student_id: candidate.student_id,
                result: DrawResult::Selected,
                drawn_at: now,
            })?;
            tx.append_log(NewOperationLog::insert(
                RecordKind::Draw,
                draw.id.0,
                Some(teacher.user_id),
                &draw,
                now,
            )?)?;
            Ok(DrawOutcome { draw, candidate })
        })?;

        info!(
            supervisor = %teacher_id,
            student = %outcome.candidate.student_id,
            "lottery draw recorded"
        );
        Ok(outcome)
    }

    /// Draws a supervisor has made, optionally narrowed to one student, newest first.
    pub fn draw_history(
        &self,
        teacher_id: TeacherId,
        student_id: Option<StudentId>,
    ) -> Result<Vec<DrawRecord>, AdmissionsError> {
        let mut history: Vec<DrawRecord> = self.transaction("draw_history", |tx| {
            let teacher = load_teacher(tx, teacher_id)?;
            Ok(tx
                .draws()?
                .into_iter()
                .filter(|draw| draw.teacher_id == teacher.id)
                .filter(|draw| student_id.map_or(true, |student| draw.student_id == student))
                .collect())
        })?;
        history.sort_by(|a, b| b.drawn_at.cmp(&a.drawn_at).then_with(|| b.id.cmp(&a.id)));
        Ok(history)
    }

    /// Opens a phase window. Refused when it touches any phase not yet ended.
    pub fn open_phase(
        &self,
        plan: PhasePlan,
        admin_id: UserId,
    ) -> Result<ProcessPhase, AdmissionsError> {
        plan.validate()?;
        let now = self.now();

        let phase = self.transaction("open_phase", |tx| {
            check_conflicts(&tx.phases()?, &plan)?;
            let created = tx.insert_phase(NewPhase {
                kind: plan.kind,
                starts_at: plan.starts_at,
                ends_at: plan.ends_at,
                supervisor_id: admin_id,
                notes: plan.notes,
            })?;
            tx.append_log(NewOperationLog::insert(
                RecordKind::Phase,
                created.id.0,
                Some(admin_id),
                &created,
                now,
            )?)?;
            Ok(created)
        })?;

        info!(phase = %phase.id, kind = phase.kind.label(), "process phase opened");
        Ok(phase)
    }

    pub fn current_phase(&self) -> Result<Option<ProcessPhase>, AdmissionsError> {
        self.transaction("current_phase", |tx| {
            Ok(current_phase(&tx.phases()?).cloned())
        })
    }

    /// Moves a phase between in-progress and ended; `notes` replaces the existing notes
    /// when given.
    pub fn update_phase_status(
        &self,
        phase_id: PhaseId,
        status: PhaseStatus,
        notes: Option<String>,
        admin_id: UserId,
    ) -> Result<ProcessPhase, AdmissionsError> {
        let now = self.now();
        let phase = self.transaction("update_phase_status", |tx| {
            let mut phase = tx
                .phase(phase_id)?
                .ok_or(AdmissionsError::NotFound(RecordRef::Phase(phase_id)))?;
            let before = phase.clone();
            phase.status = status;
            if let Some(notes) = notes {
                phase.notes = notes;
            }
            tx.update_phase(phase.clone())?;
            tx.append_log(NewOperationLog::update(
                RecordKind::Phase,
                phase.id.0,
                Some(admin_id),
                &before,
                &phase,
                now,
            )?)?;
            Ok(phase)
        })?;

        info!(phase = %phase.id, status = ?phase.status, "process phase updated");
        Ok(phase)
    }

    pub fn phase_statistics(&self, kind: PhaseKind) -> Result<PhaseStatistics, AdmissionsError> {
        self.transaction("phase_statistics", |tx| {
            Ok(PhaseStatistics::collect(kind, &tx.applications()?))
        })
    }

    /// Operation log entries matching `filter`, newest first.
    pub fn operation_logs(&self, filter: &LogFilter) -> Result<Vec<OperationLog>, AdmissionsError> {
        let logs = self.transaction("operation_logs", |tx| Ok(filter.apply(&tx.logs()?)))?;
        debug!(matched = logs.len(), "queried operation log");
        Ok(logs)
    }
}
