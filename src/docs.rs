use crate::api::attendance::{CloseStaleBody, PunchBody};
use crate::api::requests::{CreateLateConsideration, CreateLeave, CreateOvertime, ReviewBody};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Worklog API",
        version = "1.0.0",
        description = r#"
## Attendance & Request Workflow

Daily attendance punches and the approval workflow for leave, overtime and
late-arrival considerations.

### 🔹 Key Features
- **Attendance**
  - Check-in, lunch start/end and check-out with derived paid hours
  - Status labels such as `On Time, Complete` or `Late, Undertime`
  - Forgotten days freeze as `Incomplete`
- **Requests**
  - Leave (debits leave credits on approval), overtime (reconciled against
    recorded hours), late consideration (excuses a Late day in reports)
  - Pending → Approved / Rejected, then a one-way notified flag
- **Reports**
  - Attendance per date, daily overview, per-employee summary

### 🔐 Security
Every endpoint requires a **JWT Bearer** token. Employees act on their own
records; **Admin** and **HR** review requests and read everyone's data.

### 📦 Errors
Failures return `{ "error": <kind>, "message": <text> }`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::lunch_start,
        crate::api::attendance::lunch_end,
        crate::api::attendance::check_out,
        crate::api::attendance::get_attendance,
        crate::api::attendance::attendance_history,
        crate::api::attendance::attendance_for_date,
        crate::api::attendance::day_overview,
        crate::api::attendance::close_stale,

        crate::api::requests::create_leave,
        crate::api::requests::create_overtime,
        crate::api::requests::create_late_consideration,
        crate::api::requests::approve_request,
        crate::api::requests::reject_request,
        crate::api::requests::mark_notified,
        crate::api::requests::mark_all_notified,
        crate::api::requests::unnotified,
        crate::api::requests::get_request,
        crate::api::requests::list_requests,
        crate::api::requests::pending_count,

        crate::api::reports::employee_summary
    ),
    components(
        schemas(
            PunchBody,
            CloseStaleBody,
            CreateLeave,
            CreateOvertime,
            CreateLateConsideration,
            ReviewBody
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance punches and records"),
        (name = "Requests", description = "Leave, overtime and late consideration workflow"),
        (name = "Reports", description = "Derived summaries"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
