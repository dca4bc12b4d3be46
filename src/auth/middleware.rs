use crate::auth::auth::{AuthUser, unauthorized};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{AUTHORIZATION, HeaderMap},
    web::Data,
};

fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header encoding")?;
    value
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must start with Bearer")
}

/// Sole place a bearer token is verified. On success the caller is stored as
/// [`AuthUser`] in the request extensions for handlers to extract.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let verified = bearer_token(req.headers()).and_then(|token| {
        verify_token(token, &config.jwt_secret).map_err(|e| {
            tracing::debug!(error = %e, path = %req.path(), "Rejected token");
            "Invalid or expired token"
        })
    });
    let user = match verified.map(AuthUser::from_claims) {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(req.into_response(unauthorized("Invalid role"))),
        Err(message) => return Ok(req.into_response(unauthorized(message))),
    };

    req.extensions_mut().insert(user);
    next.call(req).await
}
