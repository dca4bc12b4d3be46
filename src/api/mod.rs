use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::error::EngineError;

pub mod attendance;
pub mod reports;
pub mod requests;

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            EngineError::DuplicateAction(_)
            | EngineError::DuplicateRequest(_)
            | EngineError::AlreadyReviewed(_) => StatusCode::CONFLICT,
            EngineError::InvalidTimeRange(_) => StatusCode::BAD_REQUEST,
            EngineError::InvalidSequence(_)
            | EngineError::OpenLunch
            | EngineError::InsufficientCredits { .. }
            | EngineError::NotYetReviewed(_)
            | EngineError::OutsideSchedule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            EngineError::Storage(e) => {
                tracing::error!(error = ?e, "Storage failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            EngineError::NotFound("request 9".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::AlreadyReviewed(3).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::OpenLunch.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            EngineError::Storage(anyhow::anyhow!("down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
