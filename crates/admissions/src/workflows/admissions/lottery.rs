//! Lottery draws supervisors use to pick among unplaced students.

use rand::Rng;
use serde::Serialize;

use super::domain::{
    ApplicationRecord, ApplicationStatus, DrawRecord, EligibilityStatus, StudentId, StudentRecord,
    TeacherId,
};

/// A student eligible for a supervisor's draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawCandidate {
    pub student_id: StudentId,
    pub name: String,
    pub total_score: f64,
    pub draw_count: usize,
}

/// Eligible students with no approved application and no application to `teacher_id`,
/// highest total score first.
pub fn candidates(
    teacher_id: TeacherId,
    students: &[StudentRecord],
    applications: &[ApplicationRecord],
    draws: &[DrawRecord],
) -> Vec<DrawCandidate> {
    let mut pool: Vec<DrawCandidate> = students
        .iter()
        .filter(|student| student.status == EligibilityStatus::Approved)
        .filter(|student| {
            !applications.iter().any(|app| {
                app.student_id == student.id
                    && (app.status == ApplicationStatus::Approved || app.teacher_id == teacher_id)
            })
        })
        .map(|student| DrawCandidate {
            student_id: student.id,
            name: student.name.clone(),
            total_score: student.total_score(),
            draw_count: draws
                .iter()
                .filter(|draw| draw.teacher_id == teacher_id && draw.student_id == student.id)
                .count(),
        })
        .collect();

    pool.sort_by(|a, b| {
        b.total_score
            .total_cmp(&a.total_score)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    pool
}

/// Uniform pick from the pool.
pub fn pick<'a, R: Rng>(
    pool: &'a [DrawCandidate],
    rng: &mut R,
) -> Option<&'a DrawCandidate> {
    if pool.is_empty() {
        return None;
    }
    pool.get(rng.random_range(0..pool.len()))
}
