use crate::auth::auth::AuthUser;
use crate::engine::Engine;
use crate::model::request::{
    Decision, LeaveType, RequestFilter, RequestKind, RequestStatus, Submission,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Defaults to the caller's own profile
    #[schema(example = 101)]
    pub employee_id: Option<u64>,
    #[schema(example = "Vacation", value_type = String)]
    pub leave_type: LeaveType,
    #[schema(example = "2026-10-19", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-10-21", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
    #[schema(example = "medical-cert-2291")]
    pub evidence_reference: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateOvertime {
    #[schema(example = 101)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-10-14", format = "date", value_type = String)]
    pub request_date: NaiveDate,
    #[schema(example = 2.5)]
    pub hours_requested: f64,
    #[schema(example = "Quarter close")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLateConsideration {
    #[schema(example = 101)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-10-14", format = "date", value_type = String)]
    pub attendance_date: NaiveDate,
    #[schema(example = "Train delay")]
    pub reason: String,
    #[schema(example = "ticket-4471")]
    pub evidence_reference: Option<String>,
}

#[derive(Default, Deserialize, ToSchema)]
pub struct ReviewBody {
    #[schema(example = "Enjoy your break")]
    pub remarks: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct RequestQuery {
    /// Filter by employee ID
    #[param(example = 101)]
    pub employee_id: Option<u64>,
    /// Pending, Approved or Rejected
    #[param(example = "Pending", value_type = Option<String>)]
    pub status: Option<RequestStatus>,
    /// Leave, Overtime or LateConsideration
    #[param(example = "Leave", value_type = Option<String>)]
    pub kind: Option<RequestKind>,
}

#[derive(Deserialize, IntoParams)]
pub struct EmployeeQuery {
    /// Defaults to the caller's own profile
    #[param(example = 101)]
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct KindQuery {
    #[param(example = "Overtime", value_type = Option<String>)]
    pub kind: Option<RequestKind>,
}

async fn submit(
    auth: AuthUser,
    engine: web::Data<Engine>,
    employee_id: Option<u64>,
    submission: Submission,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.target_employee(employee_id)?;
    let record = engine
        .submit(&auth.actor(), employee_id, submission)
        .await?;
    Ok(HttpResponse::Created().json(record))
}

/* =========================
Submit requests
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "id": 1, "employee_id": 101, "kind": "Leave", "status": "Pending",
            "leave_type": "Vacation", "start_date": "2026-10-19", "end_date": "2026-10-21",
            "days_count": 3, "employee_notified": false
        })),
        (status = 400, description = "End date before start date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Insufficient leave credits")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn create_leave(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let p = payload.into_inner();
    let submission = Submission::Leave {
        leave_type: p.leave_type,
        start_date: p.start_date,
        end_date: p.end_date,
        reason: p.reason,
        evidence_reference: p.evidence_reference,
    };
    submit(auth, engine, p.employee_id, submission).await
}

/// Swagger doc for create_overtime endpoint
#[utoipa::path(
    post,
    path = "/api/overtime",
    request_body(
        content = CreateOvertime,
        description = "Overtime request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Overtime request submitted", body = Object),
        (status = 400, description = "Requested hours out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "An overtime request for that date is already pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn create_overtime(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<CreateOvertime>,
) -> actix_web::Result<impl Responder> {
    let p = payload.into_inner();
    let submission = Submission::Overtime {
        request_date: p.request_date,
        hours_requested: p.hours_requested,
        reason: p.reason,
    };
    submit(auth, engine, p.employee_id, submission).await
}

/// Swagger doc for create_late_consideration endpoint
#[utoipa::path(
    post,
    path = "/api/late-consideration",
    request_body(
        content = CreateLateConsideration,
        description = "Late consideration payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Late consideration submitted", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No attendance for that date"),
        (status = 409, description = "Already submitted for that date", body = Object, example = json!({
            "error": "DuplicateRequest",
            "message": "duplicate request: a late consideration for 2026-10-14 already exists"
        })),
        (status = 422, description = "Attendance for that date is not Late")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn create_late_consideration(
    auth: AuthUser,
    engine: web::Data<Engine>,
    payload: web::Json<CreateLateConsideration>,
) -> actix_web::Result<impl Responder> {
    let p = payload.into_inner();
    let submission = Submission::LateConsideration {
        attendance_date: p.attendance_date,
        reason: p.reason,
        evidence_reference: p.evidence_reference,
    };
    submit(auth, engine, p.employee_id, submission).await
}

/* =========================
Review (HR/Admin)
========================= */
async fn review(
    auth: AuthUser,
    engine: web::Data<Engine>,
    request_id: u64,
    body: Option<web::Json<ReviewBody>>,
    decision: Decision,
) -> actix_web::Result<HttpResponse> {
    let remarks = body.and_then(|b| b.into_inner().remarks);
    let record = engine
        .review(&auth.actor(), request_id, decision, remarks)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Swagger doc for approve_request endpoint
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/approve",
    params(
        ("request_id" = u64, Path, description = "ID of the request to approve")
    ),
    request_body(content = ReviewBody, description = "Optional remarks", content_type = "application/json"),
    responses(
        (status = 200, description = "Request approved", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already reviewed", body = Object, example = json!({
            "error": "AlreadyReviewed",
            "message": "request 7 has already been reviewed"
        })),
        (status = 422, description = "Insufficient leave credits")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn approve_request(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewBody>>,
) -> actix_web::Result<impl Responder> {
    review(auth, engine, path.into_inner(), body, Decision::Approve).await
}

/// Swagger doc for reject_request endpoint
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "ID of the request to reject")
    ),
    request_body(content = ReviewBody, description = "Optional remarks", content_type = "application/json"),
    responses(
        (status = 200, description = "Request rejected", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already reviewed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn reject_request(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewBody>>,
) -> actix_web::Result<impl Responder> {
    review(auth, engine, path.into_inner(), body, Decision::Reject).await
}

/* =========================
Notification flag
========================= */
/// Swagger doc for mark_notified endpoint
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/notified",
    params(
        ("request_id" = u64, Path, description = "ID of the reviewed request")
    ),
    responses(
        (status = 200, description = "Flag set (repeat calls are no-ops)", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request still pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn mark_notified(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let record = engine
        .mark_notified(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Swagger doc for mark_all_notified endpoint
#[utoipa::path(
    put,
    path = "/api/requests/notified",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Number of requests flagged", body = Object, example = json!({
            "updated": 2
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn mark_all_notified(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.target_employee(query.employee_id)?;
    let updated = engine.mark_all_notified(&auth.actor(), employee_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

/// Swagger doc for unnotified endpoint
#[utoipa::path(
    get,
    path = "/api/requests/unnotified",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Reviewed requests not yet acknowledged", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn unnotified(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.target_employee(query.employee_id)?;
    let records = engine.unnotified(&auth.actor(), employee_id).await?;
    Ok(HttpResponse::Ok().json(records))
}

/* =========================
Queries
========================= */
/// Swagger doc for get_request endpoint
#[utoipa::path(
    get,
    path = "/api/requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the request to fetch")
    ),
    responses(
        (status = 200, description = "Request found", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found", body = Object, example = json!({
            "error": "NotFound",
            "message": "not found: request 42"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn get_request(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let record = engine.request(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Swagger doc for list_requests endpoint
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestQuery),
    responses(
        (status = 200, description = "Matching requests ordered by id", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn list_requests(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<RequestQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    let filter = RequestFilter {
        employee_id: query.employee_id,
        kind: query.kind,
        status: query.status,
        ..Default::default()
    };
    let records = engine.requests(&auth.actor(), filter).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Swagger doc for pending_count endpoint
#[utoipa::path(
    get,
    path = "/api/requests/pending-count",
    params(KindQuery),
    responses(
        (status = 200, description = "Pending requests awaiting review", body = Object, example = json!({
            "pending": 4
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn pending_count(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<KindQuery>,
) -> actix_web::Result<impl Responder> {
    let pending = engine.pending_count(&auth.actor(), query.kind).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "pending": pending })))
}
