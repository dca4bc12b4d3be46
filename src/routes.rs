use crate::{
    api::{attendance, reports, requests},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{
    middleware::{Condition, from_fn},
    web,
};
use anyhow::anyhow;

pub type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter for the protected scope. Built once so every worker shares
/// the same buckets.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    GovernorConfigBuilder::default()
        .per_millisecond((60_000 / u64::from(requests_per_min)).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min}/min"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: &Limiter) {
    let limiting = config.rate_protected_per_min > 0;

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Condition::new(limiting, Governor::new(limiter))) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance?employee_id&date
                    .service(web::resource("").route(web::get().to(attendance::get_attendance)))
                    .service(
                        web::resource("/history")
                            .route(web::get().to(attendance::attendance_history)),
                    )
                    .service(
                        web::resource("/date/{date}")
                            .route(web::get().to(attendance::attendance_for_date)),
                    )
                    .service(
                        web::resource("/overview/{date}")
                            .route(web::get().to(attendance::day_overview)),
                    )
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/lunch-start")
                            .route(web::post().to(attendance::lunch_start)),
                    )
                    .service(
                        web::resource("/lunch-end").route(web::post().to(attendance::lunch_end)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/close-stale")
                            .route(web::post().to(attendance::close_stale)),
                    ),
            )
            // submissions
            .service(web::resource("/leave").route(web::post().to(requests::create_leave)))
            .service(web::resource("/overtime").route(web::post().to(requests::create_overtime)))
            .service(
                web::resource("/late-consideration")
                    .route(web::post().to(requests::create_late_consideration)),
            )
            .service(
                web::scope("/requests")
                    // /requests
                    .service(web::resource("").route(web::get().to(requests::list_requests)))
                    // fixed paths before /requests/{id}
                    .service(
                        web::resource("/unnotified").route(web::get().to(requests::unnotified)),
                    )
                    .service(
                        web::resource("/notified")
                            .route(web::put().to(requests::mark_all_notified)),
                    )
                    .service(
                        web::resource("/pending-count")
                            .route(web::get().to(requests::pending_count)),
                    )
                    // /requests/{id}
                    .service(web::resource("/{id}").route(web::get().to(requests::get_request)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(requests::approve_request)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(requests::reject_request)),
                    )
                    .service(
                        web::resource("/{id}/notified")
                            .route(web::put().to(requests::mark_notified)),
                    ),
            )
            .service(
                web::resource("/employees/{id}/summary")
                    .route(web::get().to(reports::employee_summary)),
            ),
    );
}

// LOGIN (external)
//  └─ access_token, signed with JWT_SECRET

// API REQUEST
//  └─ Authorization: Bearer access_token
//       └─ auth_middleware -> AuthUser -> Actor -> Engine
