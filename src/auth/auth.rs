use crate::error::EngineError;
use crate::model::{actor::Actor, role::Role};
use crate::models::Claims;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, HttpResponse, dev::Payload, error::InternalError,
};
use futures::future::{Ready, ready};
use serde_json::json;

/// Caller identity, set by `auth_middleware` once the bearer token checks out.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// `None` when the token carries a role id this service does not know.
    pub fn from_claims(claims: Claims) -> Option<Self> {
        Some(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role: Role::from_id(claims.role)?,
            employee_id: claims.employee_id,
        })
    }

    /// Identity handed to the engine's capability checks.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.employee_id, self.role)
    }

    /// The employee a self-service call acts for: the explicit one, else the
    /// caller's own profile.
    pub fn target_employee(&self, explicit: Option<u64>) -> Result<u64, EngineError> {
        explicit
            .or(self.employee_id)
            .ok_or_else(|| EngineError::denied("no employee profile; pass employee_id"))
    }
}

/// `401` with the same `{error, message}` body as engine errors.
pub fn unauthorized(message: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({
        "error": "Unauthorized",
        "message": message
    }))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // only routes wrapped by auth_middleware get here with a user
        let user = req.extensions().get::<AuthUser>().cloned();
        ready(user.ok_or_else(|| {
            InternalError::from_response("unauthenticated", unauthorized("Missing token")).into()
        }))
    }
}
