use chrono::NaiveDateTime;

use crate::error::{EngineError, EngineResult};

/// Round to two decimals, the precision hours are stored and compared at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Elapsed decimal hours from `from` to `to`.
///
/// A negative span (clock skew, out-of-order punches) is rejected instead of
/// producing negative hours.
pub fn hours_between(from: NaiveDateTime, to: NaiveDateTime, what: &str) -> EngineResult<f64> {
    let seconds = (to - from).num_seconds();
    if seconds < 0 {
        return Err(EngineError::InvalidTimeRange(format!(
            "{what} ends at {to} before it starts at {from}"
        )));
    }
    Ok(seconds as f64 / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fractional_hours() {
        assert_eq!(hours_between(at(8, 0), at(17, 0), "shift").unwrap(), 9.0);
        assert_eq!(round2(hours_between(at(8, 0), at(8, 20), "x").unwrap()), 0.33);
        assert_eq!(hours_between(at(8, 0), at(8, 0), "x").unwrap(), 0.0);
    }

    #[test]
    fn negative_span_is_rejected() {
        let err = hours_between(at(13, 0), at(12, 0), "lunch").unwrap_err();
        assert!(matches!(err, EngineError::InvalidTimeRange(_)));
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(7.996), 8.0);
        assert_eq!(round2(1.004), 1.0);
        assert_eq!(round2(0.125), 0.13);
    }
}
