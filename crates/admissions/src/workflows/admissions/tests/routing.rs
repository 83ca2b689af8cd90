use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::admissions::domain::ApplicationStatus;
use crate::workflows::admissions::router::{
    admissions_router, submit_handler, withdraw_handler, WithdrawBody,
};
use crate::workflows::admissions::scoring::GradeStandards;
use crate::workflows::admissions::service::AdmissionsService;

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize body")))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

fn submission(student: u64, teacher: u64, priority: u8) -> Value {
    json!({
        "student_id": student,
        "teacher_id": teacher,
        "priority": priority,
        "statements": {
            "personal_statement": "I enjoy systems research.",
            "research_interest": "distributed storage",
            "apply_reason": "strong lab fit"
        }
    })
}

#[tokio::test]
async fn submit_route_creates_application() {
    let (service, _, _) = build_service();
    let student = eligible_student(&service, 10, "Chen");
    let teacher = qualified_teacher(&service, 20, "Dr. Lin", reference_metrics());
    let router = admissions_router(Arc::new(service));

    let response = router
        .oneshot(post_json(
            "/api/v1/admissions/applications",
            &submission(student.id.0, teacher.id.0, 1),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["priority"], 1);
    assert_eq!(body["teacher_id"], teacher.id.0);
}

#[tokio::test]
async fn sequencing_refusal_reports_reason_with_conflict() {
    let (service, _, _) = build_service();
    let student = eligible_student(&service, 10, "Chen");
    let lin = qualified_teacher(&service, 20, "Dr. Lin", reference_metrics());
    let zhao = qualified_teacher(&service, 21, "Dr. Zhao", reference_metrics());
    service
        .submit_application(request(student.id, lin.id, 1))
        .expect("first choice");
    let service = Arc::new(service);

    let response = submit_handler(State(service.clone()), Json(request(student.id, zhao.id, 2)))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        read_json_body(response).await,
        json!({ "error": "wait for current review" })
    );
}

#[tokio::test]
async fn out_of_range_priority_is_unprocessable() {
    let (service, _, _) = build_service();
    let router = admissions_router(Arc::new(service));

    let response = router
        .oneshot(post_json(
            "/api/v1/admissions/applications",
            &submission(1, 1, 4),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_records_are_not_found() {
    let (service, _, _) = build_service();
    let router = admissions_router(Arc::new(service));

    let response = router
        .oneshot(get("/api/v1/admissions/teachers/404/review-queue"))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        read_json_body(response).await["error"],
        "supervisor 404 does not exist"
    );
}

#[tokio::test]
async fn withdrawing_someone_elses_application_is_forbidden() {
    let (service, _, _) = build_service();
    let owner = eligible_student(&service, 10, "Chen");
    let other = eligible_student(&service, 11, "Wu");
    let teacher = qualified_teacher(&service, 20, "Dr. Lin", reference_metrics());
    let app = service
        .submit_application(request(owner.id, teacher.id, 1))
        .expect("submitted");
    let service = Arc::new(service);

    let response = withdraw_handler(
        State(service.clone()),
        Path(app.id.0),
        Json(WithdrawBody {
            student_id: other.id,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = withdraw_handler(
        State(service.clone()),
        Path(app.id.0),
        Json(WithdrawBody {
            student_id: owner.id,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(service
        .student_applications(owner.id)
        .expect("listing")
        .is_empty());
}

#[tokio::test]
async fn accept_route_reports_claimed_siblings() {
    let (service, _, _) = build_service();
    let student = eligible_student(&service, 10, "Chen");
    let lin = qualified_teacher(&service, 20, "Dr. Lin", reference_metrics());
    let zhao = qualified_teacher(&service, 21, "Dr. Zhao", reference_metrics());
    let first = service
        .submit_application(request(student.id, lin.id, 1))
        .expect("first");
    service
        .reject_application(first.id, lin.id, None)
        .expect("rejected");
    let second = service
        .submit_application(request(student.id, zhao.id, 2))
        .expect("second");
    let service = Arc::new(service);
    let router = admissions_router(service.clone());

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/admissions/applications/{}/accept", second.id.0),
            &json!({ "teacher_id": zhao.id.0 }),
        ))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["application"]["status"], "approved");
    assert_eq!(body["application"]["approval_status"], "pending_admin_review");
    assert_eq!(body["rejected_siblings"], json!([]));
    assert_eq!(
        service.application(second.id).expect("present").status,
        ApplicationStatus::Approved
    );
}

#[tokio::test]
async fn store_failures_hide_their_cause() {
    let service = Arc::new(AdmissionsService::new(
        Arc::new(OfflineStore),
        GradeStandards::default(),
    ));
    let router = admissions_router(service);

    let response = router
        .oneshot(get("/api/v1/admissions/statistics"))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json_body(response).await,
        json!({ "error": "operation failed" })
    );
}

#[tokio::test]
async fn standards_are_published() {
    let (service, _, _) = build_service();
    let router = admissions_router(Arc::new(service));

    let response = router
        .oneshot(get("/api/v1/admissions/standards"))
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["excellent"]["min_score"], 140);
    assert_eq!(body["excellent"]["max_students"], 5);
}

#[tokio::test]
async fn quota_route_overrides_capacity() {
    let (service, _, _) = build_service();
    let teacher = qualified_teacher(&service, 20, "Dr. Lin", qualified_metrics());
    let service = Arc::new(service);
    let router = admissions_router(service.clone());

    let response = router
        .oneshot(
            Request::put(format!(
                "/api/v1/admissions/teachers/{}/quota",
                teacher.id.0
            ))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::to_vec(&json!({ "admin_id": ADMIN.0, "max_students": 4 }))
                    .expect("serialize body"),
            ))
            .expect("request"),
        )
        .await
        .expect("route responds");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        service.teacher(teacher.id).expect("present").max_students,
        4
    );
}
