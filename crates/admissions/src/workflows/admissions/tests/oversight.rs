use super::common::*;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::workflows::admissions::audit::{LogFilter, OperationKind, RecordKind};
use crate::workflows::admissions::domain::{DrawResult, EligibilityStatus};
use crate::workflows::admissions::errors::{AdmissionsError, PolicyViolation, ValidationError};
use crate::workflows::admissions::phases::{PhaseKind, PhasePlan, PhaseStatistics, PhaseStatus};

#[test]
fn draw_picks_from_unplaced_eligible_students() {
    let (service, _, _) = build_service();
    let teacher = qualified_teacher(&service, 20, "Dr. Lin", reference_metrics());
    let other = qualified_teacher(&service, 21, "Dr. Zhao", reference_metrics());
    let placed = eligible_student(&service, 10, "Chen");
    let applied = eligible_student(&service, 11, "Wu");
    let open = eligible_student(&service, 12, "Sun");
    service
        .review_student(
            eligible_student(&service, 13, "Li").id,
            EligibilityStatus::Rejected,
            ADMIN,
        )
        .expect("reviewed");

    let app = service
        .submit_application(request(placed.id, other.id, 1))
        .expect("submitted");
    service.accept_application(app.id, other.id).expect("accepted");
    service
        .submit_application(request(applied.id, teacher.id, 1))
        .expect("submitted");

    let candidates = service.draw_candidates(teacher.id).expect("candidates");
    let ids: Vec<_> = candidates.iter().map(|c| c.student_id).collect();
    assert_eq!(ids, vec![open.id]);

    let outcome = service
        .draw_lot(teacher.id, &mut StdRng::seed_from_u64(11))
        .expect("drawn");
    assert_eq!(outcome.candidate.student_id, open.id);
    assert_eq!(outcome.draw.result, DrawResult::Selected);

    let history = service
        .draw_history(teacher.id, Some(open.id))
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(
        service.draw_candidates(teacher.id).expect("candidates")[0].draw_count,
        1
    );
}

#[test]
fn empty_pool_refuses_the_draw() {
    let (service, _, _) = build_service();
    let teacher = qualified_teacher(&service, 20, "Dr. Lin", reference_metrics());
    match service.draw_lot(teacher.id, &mut StdRng::seed_from_u64(1)) {
        Err(AdmissionsError::Policy(PolicyViolation::NoDrawCandidates)) => {}
        other => panic!("expected empty pool, got {other:?}"),
    }
}

fn plan(kind: PhaseKind, start_day: i64, end_day: i64) -> PhasePlan {
    PhasePlan {
        kind,
        starts_at: start_of_round() + Duration::days(start_day),
        ends_at: start_of_round() + Duration::days(end_day),
        notes: String::new(),
    }
}

#[test]
fn phases_cannot_overlap_while_active() {
    let (service, _, _) = build_service();
    let applications = service
        .open_phase(plan(PhaseKind::StudentApplication, 0, 14), ADMIN)
        .expect("opened");

    match service.open_phase(plan(PhaseKind::SupervisorReview, 14, 21), ADMIN) {
        Err(AdmissionsError::Policy(PolicyViolation::PhaseConflict)) => {}
        other => panic!("expected overlap refusal, got {other:?}"),
    }
    assert!(matches!(
        service.open_phase(plan(PhaseKind::SupervisorReview, 21, 14), ADMIN),
        Err(AdmissionsError::Validation(ValidationError::InvalidPhaseWindow))
    ));

    let ended = service
        .update_phase_status(
            applications.id,
            PhaseStatus::Ended,
            Some("closed early".to_string()),
            ADMIN,
        )
        .expect("ended");
    assert_eq!(ended.notes, "closed early");

    let review = service
        .open_phase(plan(PhaseKind::SupervisorReview, 14, 21), ADMIN)
        .expect("opened after the first ended");
    assert_eq!(
        service.current_phase().expect("lookup").map(|phase| phase.id),
        Some(review.id)
    );
}

#[test]
fn phase_statistics_follow_application_state() {
    let (service, _, _) = build_service();
    let teacher = qualified_teacher(&service, 20, "Dr. Lin", reference_metrics());
    let student = eligible_student(&service, 10, "Chen");
    let app = service
        .submit_application(request(student.id, teacher.id, 1))
        .expect("submitted");

    assert_eq!(
        service
            .phase_statistics(PhaseKind::StudentApplication)
            .expect("stats"),
        PhaseStatistics::StudentApplication {
            total_applications: 1,
            pending_reviews: 1,
        }
    );

    service.accept_application(app.id, teacher.id).expect("accepted");
    assert_eq!(
        service
            .phase_statistics(PhaseKind::AdminApproval)
            .expect("stats"),
        PhaseStatistics::AdminApproval {
            pending_approvals: 1
        }
    );
}

#[test]
fn every_committed_mutation_is_logged() {
    let (service, _, clock) = build_service();
    let teacher = qualified_teacher(&service, 20, "Dr. Lin", reference_metrics());
    clock.advance(Duration::days(2));
    let student = eligible_student(&service, 10, "Chen");
    let app = service
        .submit_application(request(student.id, teacher.id, 1))
        .expect("submitted");
    service.accept_application(app.id, teacher.id).expect("accepted");

    let application_logs = service
        .operation_logs(&LogFilter {
            record: Some(RecordKind::Application),
            ..LogFilter::default()
        })
        .expect("logs");
    let operations: Vec<_> = application_logs.iter().map(|log| log.operation).collect();
    assert_eq!(operations, vec![OperationKind::Update, OperationKind::Insert]);
    assert_eq!(application_logs[0].record_id, app.id.0);
    assert!(application_logs[0].old_data.is_some());
    assert!(application_logs[0].new_data.is_some());

    let first_day = service
        .operation_logs(&LogFilter {
            end_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            ..LogFilter::default()
        })
        .expect("logs");
    assert!(first_day
        .iter()
        .all(|log| log.record == RecordKind::Teacher || log.record == RecordKind::Qualification));

    let logged = service.operation_logs(&LogFilter::default()).expect("logs").len();
    assert!(service
        .submit_application(request(student.id, teacher.id, 2))
        .is_err());
    assert_eq!(
        service.operation_logs(&LogFilter::default()).expect("logs").len(),
        logged
    );
}
