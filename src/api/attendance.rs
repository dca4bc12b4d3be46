use crate::auth::auth::AuthUser;
use crate::engine::{Engine, ledger::Punch, now};
use crate::error::EngineError;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PunchBody {
    /// Employee to punch for. Defaults to the caller's own profile.
    #[schema(example = 101)]
    pub employee_id: Option<u64>,
    /// Timestamp override, honored for Admin only. Defaults to server time.
    #[schema(example = "2026-10-14T08:00:00", format = "date-time", value_type = Option<String>)]
    pub at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceQuery {
    /// Defaults to the caller's own profile
    #[param(example = 101)]
    pub employee_id: Option<u64>,
    #[param(example = "2026-10-14", value_type = String)]
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    #[param(example = 101)]
    pub employee_id: Option<u64>,
    #[param(example = "2026-10-01", value_type = String)]
    pub from: NaiveDate,
    #[param(example = "2026-10-31", value_type = String)]
    pub to: NaiveDate,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CloseStaleBody {
    /// Reference time, defaults to server time
    #[schema(example = "2026-10-15T00:30:00", format = "date-time", value_type = Option<String>)]
    pub at: Option<NaiveDateTime>,
}

fn punch_time(auth: &AuthUser, at: Option<NaiveDateTime>) -> Result<NaiveDateTime, EngineError> {
    match at {
        None => Ok(now()),
        Some(at) if auth.actor().is_admin() => Ok(at),
        Some(_) => Err(EngineError::PermissionDenied(
            "only Admin may set the punch time".into(),
        )),
    }
}

async fn punch(
    auth: AuthUser,
    engine: web::Data<Engine>,
    body: Option<web::Json<PunchBody>>,
    punch: Option<Punch>,
) -> actix_web::Result<HttpResponse> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let employee_id = auth.target_employee(body.employee_id)?;
    let at = punch_time(&auth, body.at)?;
    let actor = auth.actor();

    let record = match punch {
        None => engine.check_in(&actor, employee_id, at).await?,
        Some(p) => engine.punch(&actor, employee_id, at, p).await?,
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": record.status().to_string(),
        "record": record
    })))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(content = PunchBody, description = "Optional punch payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Checked in", body = Object, example = json!({
            "status": "On Time",
            "record": { "employee_id": 101, "date": "2026-10-14", "time_in": "2026-10-14T08:05:00" }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your attendance, or inactive employee"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "error": "DuplicateAction",
            "message": "duplicate action: employee 101 already checked in on 2026-10-14"
        })),
        (status = 422, description = "Rest day or outside the shift window")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    engine: web::Data<Engine>,
    body: Option<web::Json<PunchBody>>,
) -> actix_web::Result<impl Responder> {
    punch(auth, engine, body, None).await
}

/// Lunch start endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/lunch-start",
    request_body(content = PunchBody, description = "Optional punch payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Lunch started", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Not checked in, lunch already taken, or too early for lunch", body = Object, example = json!({
            "error": "InvalidSequence",
            "message": "invalid sequence: at least 3 hours of work are required before lunch; earliest lunch is 11:00"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn lunch_start(
    auth: AuthUser,
    engine: web::Data<Engine>,
    body: Option<web::Json<PunchBody>>,
) -> actix_web::Result<impl Responder> {
    punch(auth, engine, body, Some(Punch::StartLunch)).await
}

/// Lunch end endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/lunch-end",
    request_body(content = PunchBody, description = "Optional punch payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Lunch ended", body = Object),
        (status = 400, description = "Lunch would end before it started"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Lunch not started or already ended")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn lunch_end(
    auth: AuthUser,
    engine: web::Data<Engine>,
    body: Option<web::Json<PunchBody>>,
) -> actix_web::Result<impl Responder> {
    punch(auth, engine, body, Some(Punch::EndLunch)).await
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body(content = PunchBody, description = "Optional punch payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Checked out, hours derived", body = Object, example = json!({
            "status": "On Time, Complete",
            "record": { "total_time": 9.0, "lunch_duration": 1.0, "paid_hours": 8.0, "overtime_hours": 0.0 }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Not checked in, already checked out, or lunch still open", body = Object, example = json!({
            "error": "OpenLunch",
            "message": "lunch break must be ended before checking out"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    engine: web::Data<Engine>,
    body: Option<web::Json<PunchBody>>,
) -> actix_web::Result<impl Responder> {
    punch(auth, engine, body, Some(Punch::CheckOut)).await
}

/// One employee's attendance for one date
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance record with status label", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No attendance for that date")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_attendance(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.target_employee(query.employee_id)?;
    let view = engine
        .attendance_record(&auth.actor(), employee_id, query.date)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// One employee's attendance over a date range
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Attendance records ordered by date", body = Object),
        (status = 400, description = "Range ends before it starts"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_history(
    auth: AuthUser,
    engine: web::Data<Engine>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.target_employee(query.employee_id)?;
    let views = engine
        .attendance_history(&auth.actor(), employee_id, query.from, query.to)
        .await?;
    Ok(HttpResponse::Ok().json(views))
}

/// All attendance for a date (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance/date/{date}",
    params(
        ("date" = String, Path, description = "Attendance date", example = "2026-10-14")
    ),
    responses(
        (status = 200, description = "Attendance records for the date", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_for_date(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<NaiveDate>,
) -> actix_web::Result<impl Responder> {
    let views = engine
        .attendance_for_date(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(views))
}

/// Present / on leave / absent for every active employee (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance/overview/{date}",
    params(
        ("date" = String, Path, description = "Attendance date", example = "2026-10-14")
    ),
    responses(
        (status = 200, description = "One entry per active employee", body = Object, example = json!([
            { "employee_id": 101, "employee_code": "EMP101", "full_name": "Ana Cruz", "class": "Present" },
            { "employee_id": 102, "employee_code": "EMP102", "full_name": "Ben Ong", "class": "OnLeave" }
        ])),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn day_overview(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<NaiveDate>,
) -> actix_web::Result<impl Responder> {
    let entries = engine.day_overview(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Freeze forgotten days as Incomplete (Admin)
#[utoipa::path(
    post,
    path = "/api/attendance/close-stale",
    request_body(content = CloseStaleBody, description = "Optional reference time", content_type = "application/json"),
    responses(
        (status = 200, description = "Records finalized", body = Object, example = json!({
            "closed": 2
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn close_stale(
    auth: AuthUser,
    engine: web::Data<Engine>,
    body: Option<web::Json<CloseStaleBody>>,
) -> actix_web::Result<impl Responder> {
    let at = body.and_then(|b| b.into_inner().at).unwrap_or_else(now);
    let closed = engine.close_stale_days(&auth.actor(), at).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "closed": closed.len(),
        "records": closed
    })))
}
