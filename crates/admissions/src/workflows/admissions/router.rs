use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    AdmissionDecision, ApplicationId, ApplicationRequest, EligibilityStatus, QualificationId,
    ReviewDecision, StudentId, StudentRegistration, TeacherId, TeacherRegistration, UserId,
};
use super::errors::AdmissionsError;
use super::repository::AdmissionsRepository;
use super::scoring::QualificationMetrics;
use super::service::{AdmissionsService, QuotaEntry, QuotaUpdate};

/// Router builder exposing the admissions operations as JSON endpoints.
pub fn admissions_router<R>(service: Arc<AdmissionsService<R>>) -> Router
where
    R: AdmissionsRepository + 'static,
{
    Router::new()
        .route("/api/v1/admissions/students", post(register_student_handler::<R>))
        .route(
            "/api/v1/admissions/students/:student_id/review",
            post(review_student_handler::<R>),
        )
        .route(
            "/api/v1/admissions/students/:student_id/applications",
            get(student_applications_handler::<R>),
        )
        .route(
            "/api/v1/admissions/students/:student_id/next-priority",
            get(next_priority_handler::<R>),
        )
        .route("/api/v1/admissions/teachers", post(register_teacher_handler::<R>))
        .route(
            "/api/v1/admissions/teachers/available",
            get(available_supervisors_handler::<R>),
        )
        .route(
            "/api/v1/admissions/teachers/:teacher_id/review-queue",
            get(review_queue_handler::<R>),
        )
        .route(
            "/api/v1/admissions/teachers/:teacher_id/quota",
            put(update_quota_handler::<R>),
        )
        .route("/api/v1/admissions/quotas", post(batch_quota_handler::<R>))
        .route("/api/v1/admissions/applications", post(submit_handler::<R>))
        .route(
            "/api/v1/admissions/applications/:application_id/withdraw",
            post(withdraw_handler::<R>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/accept",
            post(accept_handler::<R>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/reject",
            post(reject_handler::<R>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/admission",
            post(admission_handler::<R>),
        )
        .route(
            "/api/v1/admissions/approvals",
            get(pending_admissions_handler::<R>),
        )
        .route(
            "/api/v1/admissions/statistics",
            get(statistics_handler::<R>),
        )
        .route(
            "/api/v1/admissions/qualifications",
            post(submit_qualification_handler::<R>),
        )
        .route(
            "/api/v1/admissions/qualifications/:qualification_id/review",
            post(review_qualification_handler::<R>),
        )
        .route("/api/v1/admissions/standards", get(standards_handler::<R>))
        .with_state(service)
}

/// Maps service errors onto status codes. Store failures never leak their cause.
pub(crate) fn error_response(error: AdmissionsError) -> Response {
    let (status, message) = match &error {
        AdmissionsError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        AdmissionsError::Policy(_) => (StatusCode::CONFLICT, error.to_string()),
        AdmissionsError::NotFound(_) => (StatusCode::NOT_FOUND, error.to_string()),
        AdmissionsError::Forbidden(_) => (StatusCode::FORBIDDEN, error.to_string()),
        AdmissionsError::InvalidState(_) => (StatusCode::BAD_REQUEST, error.to_string()),
        AdmissionsError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "operation failed".to_string(),
        ),
    };
    (status, Json(json!({ "error": message }))).into_response()
}

fn respond<T: Serialize>(status: StatusCode, outcome: Result<T, AdmissionsError>) -> Response {
    match outcome {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentReviewBody {
    pub reviewer_id: UserId,
    pub status: EligibilityStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WithdrawBody {
    pub student_id: StudentId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AcceptBody {
    pub teacher_id: TeacherId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectBody {
    pub teacher_id: TeacherId,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdmissionBody {
    pub approver_id: UserId,
    pub status: AdmissionDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QualificationBody {
    pub teacher_id: TeacherId,
    pub metrics: QualificationMetrics,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QualificationReviewBody {
    pub reviewer_id: UserId,
    pub status: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuotaBody {
    pub admin_id: UserId,
    #[serde(flatten)]
    pub update: QuotaUpdate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchQuotaBody {
    pub admin_id: UserId,
    pub entries: Vec<QuotaEntry>,
    #[serde(default)]
    pub comment: Option<String>,
}

pub(crate) async fn register_student_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Json(registration): Json<StudentRegistration>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(StatusCode::CREATED, service.register_student(registration))
}

pub(crate) async fn review_student_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(student_id): Path<u64>,
    Json(body): Json<StudentReviewBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.review_student(StudentId(student_id), body.status, body.reviewer_id),
    )
}

pub(crate) async fn student_applications_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(student_id): Path<u64>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    let outcome = service
        .student_applications(StudentId(student_id))
        .map(|records| records.iter().map(|record| record.view()).collect::<Vec<_>>());
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn next_priority_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(student_id): Path<u64>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    let outcome = service
        .next_priority(StudentId(student_id))
        .map(|priority| json!({ "next_priority": priority }));
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn register_teacher_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Json(registration): Json<TeacherRegistration>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(StatusCode::CREATED, service.register_teacher(registration))
}

pub(crate) async fn available_supervisors_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(StatusCode::OK, service.available_supervisors())
}

pub(crate) async fn review_queue_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(teacher_id): Path<u64>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    let outcome = service
        .review_queue(TeacherId(teacher_id))
        .map(|records| records.iter().map(|record| record.view()).collect::<Vec<_>>());
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn update_quota_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(teacher_id): Path<u64>,
    Json(body): Json<QuotaBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.update_quota(TeacherId(teacher_id), body.update, body.admin_id),
    )
}

pub(crate) async fn batch_quota_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Json(body): Json<BatchQuotaBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.batch_update_quota(body.entries, body.comment, body.admin_id),
    )
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Json(request): Json<ApplicationRequest>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    let outcome = service.submit_application(request).map(|record| record.view());
    respond(StatusCode::CREATED, outcome)
}

pub(crate) async fn withdraw_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(application_id): Path<u64>,
    Json(body): Json<WithdrawBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    match service.withdraw_application(ApplicationId(application_id), body.student_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn accept_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(application_id): Path<u64>,
    Json(body): Json<AcceptBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    let outcome = service
        .accept_application(ApplicationId(application_id), body.teacher_id)
        .map(|accepted| {
            json!({
                "application": accepted.application.view(),
                "rejected_siblings": accepted.rejected_siblings,
            })
        });
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn reject_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(application_id): Path<u64>,
    Json(body): Json<RejectBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    let outcome = service
        .reject_application(ApplicationId(application_id), body.teacher_id, body.comment)
        .map(|record| record.view());
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn admission_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(application_id): Path<u64>,
    Json(body): Json<AdmissionBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    let outcome = service
        .approve_admission(
            ApplicationId(application_id),
            body.approver_id,
            body.status,
            body.comment,
        )
        .map(|record| record.view());
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn pending_admissions_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    let outcome = service.pending_admissions().map(|overview| {
        json!({
            "applications": overview
                .applications
                .iter()
                .map(|record| record.view())
                .collect::<Vec<_>>(),
            "summary": overview.summary,
        })
    });
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn statistics_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(StatusCode::OK, service.application_statistics())
}

pub(crate) async fn submit_qualification_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Json(body): Json<QualificationBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(
        StatusCode::CREATED,
        service.submit_qualification(body.teacher_id, body.metrics),
    )
}

pub(crate) async fn review_qualification_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    Path(qualification_id): Path<u64>,
    Json(body): Json<QualificationReviewBody>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.review_qualification(
            QualificationId(qualification_id),
            body.reviewer_id,
            body.status,
            body.comment,
        ),
    )
}

pub(crate) async fn standards_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
) -> Response
where
    R: AdmissionsRepository + 'static,
{
    (StatusCode::OK, Json(service.standards().clone())).into_response()
}
