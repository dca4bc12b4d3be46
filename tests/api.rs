use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test, web::Data};
use chrono::{NaiveTime, Weekday};
use serde_json::{Value, json};

use worklog::auth::jwt::issue_token;
use worklog::config::Config;
use worklog::engine::{Engine, EngineSettings};
use worklog::model::employee::EmployeeAccount;
use worklog::model::role::Role;
use worklog::model::shift::ShiftPolicy;
use worklog::routes;
use worklog::store::MemoryStore;

const SECRET: &str = "test-secret";
const ANA: u64 = 101;

fn config() -> Config {
    Config {
        database_url: "mysql://unused".into(),
        jwt_secret: SECRET.into(),
        server_addr: "127.0.0.1:0".into(),
        api_prefix: "/api".into(),
        rate_protected_per_min: 0,
        rest_days: vec![Weekday::Sun],
        shift_cache_ttl_secs: 60,
        log_level: tracing::Level::INFO,
    }
}

fn bearer(user_id: u64, role: Role, employee_id: Option<u64>) -> (&'static str, String) {
    let token = issue_token(user_id, format!("user{user_id}"), role, employee_id, SECRET, 600)
        .expect("token");
    ("Authorization", format!("Bearer {token}"))
}

fn admin() -> (&'static str, String) {
    bearer(1, Role::Admin, None)
}

fn hr() -> (&'static str, String) {
    bearer(2, Role::Hr, None)
}

fn ana() -> (&'static str, String) {
    bearer(1101, Role::Employee, Some(ANA))
}

async fn engine() -> Engine {
    let store = Arc::new(MemoryStore::new());
    let regular = ShiftPolicy::new(
        1,
        "Regular",
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    );
    store.insert_shift(regular.as_default()).await;
    store
        .insert_employee(EmployeeAccount::new(ANA, "EMP101", "Ana Cruz", 5))
        .await;
    Engine::new(store, EngineSettings::default())
}

macro_rules! app {
    () => {{
        let config = config();
        let limiter = routes::build_limiter(config.rate_protected_per_min).unwrap();
        let engine = Data::new(engine().await);
        test::init_service(
            App::new()
                .app_data(Data::new(config.clone()))
                .app_data(engine)
                .configure(|cfg| routes::configure(cfg, &config, &limiter)),
        )
        .await
    }};
}

#[actix_web::test]
async fn missing_token_is_unauthorized() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_backdated_check_in_then_duplicate() {
    let app = app!();
    let body = json!({ "employee_id": ANA, "at": "2026-10-14T08:05:00" });

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(admin())
        .set_json(&body)
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["record"]["employee_id"], json!(ANA));
    assert_eq!(resp["record"]["time_in"], json!("2026-10-14T08:05:00"));

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(admin())
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "DuplicateAction");
}

#[actix_web::test]
async fn employee_cannot_override_punch_time() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(ana())
        .set_json(json!({ "at": "2026-10-14T08:00:00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "PermissionDenied");
}

#[actix_web::test]
async fn check_out_before_check_in_is_rejected() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-out")
        .insert_header(admin())
        .set_json(json!({ "employee_id": ANA, "at": "2026-10-14T17:00:00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "InvalidSequence");
}

#[actix_web::test]
async fn leave_is_submitted_and_reviewed() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/api/leave")
        .insert_header(ana())
        .set_json(json!({
            "leave_type": "Vacation",
            "start_date": "2026-10-19",
            "end_date": "2026-10-20",
            "reason": "family trip"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "Pending");
    assert_eq!(created["kind"], "Leave");
    assert_eq!(created["days_count"], json!(2));
    let id = created["id"].as_u64().unwrap();

    // employees cannot review
    let req = test::TestRequest::put()
        .uri(&format!("/api/requests/{id}/approve"))
        .insert_header(ana())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/requests/{id}/approve"))
        .insert_header(hr())
        .set_json(json!({ "remarks": "enjoy" }))
        .to_request();
    let approved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(approved["status"], "Approved");

    let req = test::TestRequest::put()
        .uri(&format!("/api/requests/{id}/reject"))
        .insert_header(hr())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "AlreadyReviewed");

    let req = test::TestRequest::get()
        .uri("/api/requests/unnotified")
        .insert_header(ana())
        .to_request();
    let unnotified: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unnotified.as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn leave_beyond_credits_is_rejected() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/leave")
        .insert_header(ana())
        .set_json(json!({
            "leave_type": "Sick",
            "start_date": "2026-10-19",
            "end_date": "2026-10-30",
            "reason": "surgery"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "InsufficientCredits");
}

#[actix_web::test]
async fn pending_count_is_for_reviewers() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/api/requests/pending-count")
        .insert_header(ana())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/requests/pending-count")
        .insert_header(hr())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pending"], json!(0));
}

#[actix_web::test]
async fn rejected_token_gets_json_unauthorized() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "Unauthorized");
    assert_eq!(err["message"], "Invalid or expired token");

    let forged = issue_token(1, "user1".into(), Role::Admin, None, "other-secret", 600)
        .expect("token");
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(("Authorization", format!("Bearer {forged}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn caller_without_profile_gets_json_forbidden() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/leave")
        .insert_header(hr())
        .set_json(json!({
            "leave_type": "Vacation",
            "start_date": "2026-10-19",
            "end_date": "2026-10-19",
            "reason": "errand"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "PermissionDenied");
    assert!(err["message"].as_str().unwrap().contains("employee profile"));

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(admin())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["error"], "PermissionDenied");
}
