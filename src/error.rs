use derive_more::Display;

/// Failures surfaced by the attendance and request engine.
///
/// Every variant except `Storage` is a recoverable domain rejection raised
/// before anything is written. `Storage` means the backing store failed and
/// the operation was rolled back.
#[derive(Debug, Display)]
pub enum EngineError {
    #[display(fmt = "duplicate action: {}", _0)]
    DuplicateAction(String),

    #[display(fmt = "invalid sequence: {}", _0)]
    InvalidSequence(String),

    #[display(fmt = "lunch break must be ended before checking out")]
    OpenLunch,

    #[display(fmt = "invalid time range: {}", _0)]
    InvalidTimeRange(String),

    #[display(fmt = "duplicate request: {}", _0)]
    DuplicateRequest(String),

    #[display(fmt = "request {} has already been reviewed", _0)]
    AlreadyReviewed(u64),

    #[display(
        fmt = "insufficient leave credits: available {}, required {}",
        available,
        required
    )]
    InsufficientCredits { available: i64, required: i64 },

    #[display(fmt = "request {} has not been reviewed yet", _0)]
    NotYetReviewed(u64),

    #[display(fmt = "not found: {}", _0)]
    NotFound(String),

    #[display(fmt = "permission denied: {}", _0)]
    PermissionDenied(String),

    #[display(fmt = "outside schedule: {}", _0)]
    OutsideSchedule(String),

    #[display(fmt = "storage failure: {}", _0)]
    Storage(anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::DuplicateAction(_) => "DuplicateAction",
            EngineError::InvalidSequence(_) => "InvalidSequence",
            EngineError::OpenLunch => "OpenLunch",
            EngineError::InvalidTimeRange(_) => "InvalidTimeRange",
            EngineError::DuplicateRequest(_) => "DuplicateRequest",
            EngineError::AlreadyReviewed(_) => "AlreadyReviewed",
            EngineError::InsufficientCredits { .. } => "InsufficientCredits",
            EngineError::NotYetReviewed(_) => "NotYetReviewed",
            EngineError::NotFound(_) => "NotFound",
            EngineError::PermissionDenied(_) => "PermissionDenied",
            EngineError::OutsideSchedule(_) => "OutsideSchedule",
            EngineError::Storage(_) => "Storage",
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        EngineError::NotFound(what.into())
    }

    pub(crate) fn sequence(msg: impl Into<String>) -> Self {
        EngineError::InvalidSequence(msg.into())
    }

    pub(crate) fn denied(msg: impl Into<String>) -> Self {
        EngineError::PermissionDenied(msg.into())
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Storage(e) => {
                let source: &(dyn std::error::Error + 'static) = e.as_ref();
                Some(source)
            }
            _ => None,
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(e: anyhow::Error) -> Self {
        EngineError::Storage(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = EngineError::InsufficientCredits {
            available: 2,
            required: 5,
        };
        assert_eq!(
            e.to_string(),
            "insufficient leave credits: available 2, required 5"
        );
        assert_eq!(e.kind(), "InsufficientCredits");
        assert_eq!(
            EngineError::AlreadyReviewed(7).to_string(),
            "request 7 has already been reviewed"
        );
    }

    #[test]
    fn storage_errors_keep_their_source() {
        let e: EngineError = anyhow::anyhow!("connection reset").into();
        assert_eq!(e.kind(), "Storage");
        assert!(std::error::Error::source(&e).is_some());
    }
}
