use crate::auth::auth::AuthUser;
use crate::engine::Engine;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct SummaryQuery {
    #[param(example = "2026-10-01", value_type = String)]
    pub from: NaiveDate,
    #[param(example = "2026-10-31", value_type = String)]
    pub to: NaiveDate,
}

/// Attendance and overtime totals for one employee
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/summary",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        SummaryQuery
    ),
    responses(
        (status = 200, description = "Summary over the range", body = Object, example = json!({
            "employee_id": 101, "from": "2026-10-01", "to": "2026-10-31",
            "days_recorded": 21, "on_time": 19, "late": 2, "excused_late": 1,
            "complete": 20, "undertime": 1, "incomplete": 0,
            "total_paid_hours": 168.5, "average_paid_hours": 8.02,
            "approved_overtime_hours": 3.5, "leave_credits": 12
        })),
        (status = 400, description = "Range ends before it starts"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn employee_summary(
    auth: AuthUser,
    engine: web::Data<Engine>,
    path: web::Path<u64>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let summary = engine
        .employee_summary(&auth.actor(), path.into_inner(), query.from, query.to)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}
