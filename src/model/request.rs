use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum RequestKind {
    Leave,
    Overtime,
    LateConsideration,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum LeaveType {
    Sick,
    Vacation,
    Emergency,
    Personal,
}

/// What an employee asks for, before the engine assigns identity and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Submission {
    Leave {
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: String,
        evidence_reference: Option<String>,
    },
    Overtime {
        request_date: NaiveDate,
        hours_requested: f64,
        reason: String,
    },
    LateConsideration {
        attendance_date: NaiveDate,
        reason: String,
        evidence_reference: Option<String>,
    },
}

impl Submission {
    pub fn kind(&self) -> RequestKind {
        match self {
            Submission::Leave { .. } => RequestKind::Leave,
            Submission::Overtime { .. } => RequestKind::Overtime,
            Submission::LateConsideration { .. } => RequestKind::LateConsideration,
        }
    }

    pub(crate) fn into_payload(self) -> RequestPayload {
        match self {
            Submission::Leave {
                leave_type,
                start_date,
                end_date,
                reason,
                evidence_reference,
            } => RequestPayload::Leave {
                leave_type,
                start_date,
                end_date,
                days_count: (end_date - start_date).num_days() + 1,
                reason,
                evidence_reference,
            },
            Submission::Overtime {
                request_date,
                hours_requested,
                reason,
            } => RequestPayload::Overtime {
                request_date,
                hours_requested,
                reason,
                actual_overtime: None,
            },
            Submission::LateConsideration {
                attendance_date,
                reason,
                evidence_reference,
            } => RequestPayload::LateConsideration {
                attendance_date,
                reason,
                evidence_reference,
            },
        }
    }
}

/// Kind-specific fields of a stored request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RequestPayload {
    Leave {
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        /// Inclusive length of the date span.
        days_count: i64,
        reason: String,
        evidence_reference: Option<String>,
    },
    Overtime {
        request_date: NaiveDate,
        hours_requested: f64,
        reason: String,
        /// Filled by reconciliation from the day's attendance.
        actual_overtime: Option<f64>,
    },
    LateConsideration {
        attendance_date: NaiveDate,
        reason: String,
        evidence_reference: Option<String>,
    },
}

impl RequestPayload {
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestPayload::Leave { .. } => RequestKind::Leave,
            RequestPayload::Overtime { .. } => RequestKind::Overtime,
            RequestPayload::LateConsideration { .. } => RequestKind::LateConsideration,
        }
    }

    /// Whether the request concerns `date`: inside a leave span, or the
    /// overtime / late-consideration day.
    pub fn concerns(&self, date: NaiveDate) -> bool {
        match self {
            RequestPayload::Leave {
                start_date,
                end_date,
                ..
            } => *start_date <= date && date <= *end_date,
            RequestPayload::Overtime { request_date, .. } => *request_date == date,
            RequestPayload::LateConsideration {
                attendance_date, ..
            } => *attendance_date == date,
        }
    }
}

/// Set once, together, when a request leaves `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewed_by: u64,
    pub reviewed_at: NaiveDateTime,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: u64,
    pub employee_id: u64,
    pub status: RequestStatus,
    pub review: Option<Review>,
    pub employee_notified: bool,
    pub created_at: NaiveDateTime,
    #[serde(flatten)]
    pub payload: RequestPayload,
}

impl RequestRecord {
    pub fn pending(employee_id: u64, payload: RequestPayload, created_at: NaiveDateTime) -> Self {
        Self {
            id: 0,
            employee_id,
            status: RequestStatus::Pending,
            review: None,
            employee_notified: false,
            created_at,
            payload,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.payload.kind()
    }

    pub fn is_reviewed(&self) -> bool {
        self.status != RequestStatus::Pending
    }

    /// Pending -> Approved | Rejected, recording who, when and why.
    pub fn apply_review(
        &mut self,
        reviewer_id: u64,
        reviewed_at: NaiveDateTime,
        decision: Decision,
        remarks: Option<String>,
    ) -> EngineResult<()> {
        if self.is_reviewed() {
            return Err(EngineError::AlreadyReviewed(self.id));
        }
        self.status = match decision {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        };
        self.review = Some(Review {
            reviewed_by: reviewer_id,
            reviewed_at,
            remarks,
        });
        Ok(())
    }

    /// Sets the notified flag. Returns false when it was already set.
    pub fn mark_notified(&mut self) -> EngineResult<bool> {
        if !self.is_reviewed() {
            return Err(EngineError::NotYetReviewed(self.id));
        }
        if self.employee_notified {
            return Ok(false);
        }
        self.employee_notified = true;
        Ok(true)
    }
}

/// Selection over stored requests; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFilter {
    pub employee_id: Option<u64>,
    pub kind: Option<RequestKind>,
    pub status: Option<RequestStatus>,
    /// See [`RequestPayload::concerns`].
    pub concerning: Option<NaiveDate>,
    pub unnotified_only: bool,
}

impl RequestFilter {
    pub fn for_employee(employee_id: u64) -> Self {
        Self {
            employee_id: Some(employee_id),
            ..Default::default()
        }
    }

    pub fn kind(mut self, kind: RequestKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn concerning(mut self, date: NaiveDate) -> Self {
        self.concerning = Some(date);
        self
    }

    pub fn matches(&self, record: &RequestRecord) -> bool {
        self.employee_id.is_none_or(|id| record.employee_id == id)
            && self.kind.is_none_or(|k| record.kind() == k)
            && self.status.is_none_or(|s| record.status == s)
            && self.concerning.is_none_or(|d| record.payload.concerns(d))
            && (!self.unnotified_only || (record.is_reviewed() && !record.employee_notified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        date(14).and_hms_opt(9, 0, 0).unwrap()
    }

    fn leave(start: u32, end: u32) -> RequestRecord {
        let payload = Submission::Leave {
            leave_type: LeaveType::Vacation,
            start_date: date(start),
            end_date: date(end),
            reason: "family trip".into(),
            evidence_reference: None,
        }
        .into_payload();
        RequestRecord::pending(3, payload, now())
    }

    #[test]
    fn days_count_is_inclusive() {
        match leave(19, 21).payload {
            RequestPayload::Leave { days_count, .. } => assert_eq!(days_count, 3),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn review_happens_once() {
        let mut req = leave(19, 19);
        req.apply_review(1, now(), Decision::Approve, Some("ok".into()))
            .unwrap();
        let first = req.review.clone();

        let err = req
            .apply_review(2, now(), Decision::Reject, Some("changed my mind".into()))
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyReviewed(_)));
        assert_eq!(req.status, RequestStatus::Approved);
        assert_eq!(req.review, first);
    }

    #[test]
    fn notification_follows_review() {
        let mut req = leave(19, 19);
        assert!(matches!(
            req.mark_notified(),
            Err(EngineError::NotYetReviewed(_))
        ));
        req.apply_review(1, now(), Decision::Reject, None).unwrap();
        assert!(req.mark_notified().unwrap());
        assert!(!req.mark_notified().unwrap());
        assert!(req.employee_notified);
    }

    #[test]
    fn filter_matching() {
        let mut req = leave(19, 21);
        let approved_leave = RequestFilter::for_employee(3)
            .kind(RequestKind::Leave)
            .status(RequestStatus::Approved);
        assert!(!approved_leave.matches(&req));
        req.apply_review(1, now(), Decision::Approve, None).unwrap();
        assert!(approved_leave.matches(&req));
        assert!(approved_leave.clone().concerning(date(20)).matches(&req));
        assert!(!approved_leave.concerning(date(22)).matches(&req));

        let unnotified = RequestFilter {
            unnotified_only: true,
            ..Default::default()
        };
        assert!(unnotified.matches(&req));
    }

    #[test]
    fn enum_strings() {
        assert_eq!(RequestKind::LateConsideration.as_ref(), "LateConsideration");
        assert_eq!("Approved".parse::<RequestStatus>().unwrap(), RequestStatus::Approved);
        assert_eq!(LeaveType::Sick.to_string(), "Sick");
    }
}
