use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::{EngineError, EngineResult};
use crate::model::shift::ShiftPolicy;
use crate::utils::hours::{hours_between, round2};

/// Arrival component of the status, fixed at check-in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum Timeliness {
    #[strum(serialize = "On Time")]
    OnTime,
    Late,
}

/// Closing component of the status, fixed at check-out or day rollover.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum Completeness {
    Complete,
    Undertime,
    /// No check-out before the attendance day closed. Terminal.
    Incomplete,
}

/// Both status axes, rendered as `"Late, Undertime"` style labels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttendanceStatus {
    pub timeliness: Option<Timeliness>,
    pub completeness: Option<Completeness>,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.timeliness, self.completeness) {
            (_, Some(Completeness::Incomplete)) => write!(f, "{}", Completeness::Incomplete),
            (Some(t), Some(c)) => write!(f, "{t}, {c}"),
            (Some(t), None) => write!(f, "{t}"),
            (None, Some(c)) => write!(f, "{c}"),
            (None, None) => write!(f, "Pending"),
        }
    }
}

/// One employee's attendance for one attendance day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    /// Calendar day of `time_in`.
    pub date: NaiveDate,
    /// Shift that governed the day.
    pub shift_id: Option<u64>,
    pub time_in: Option<NaiveDateTime>,
    pub lunch_start: Option<NaiveDateTime>,
    pub lunch_end: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
    pub total_time: Option<f64>,
    pub lunch_duration: Option<f64>,
    pub paid_hours: Option<f64>,
    /// Paid hours beyond the shift target. Informational, not an approval.
    pub overtime_hours: f64,
    pub timeliness: Option<Timeliness>,
    pub completeness: Option<Completeness>,
}

impl AttendanceRecord {
    pub fn new(employee_id: u64, date: NaiveDate) -> Self {
        Self {
            id: 0,
            employee_id,
            date,
            shift_id: None,
            time_in: None,
            lunch_start: None,
            lunch_end: None,
            time_out: None,
            total_time: None,
            lunch_duration: None,
            paid_hours: None,
            overtime_hours: 0.0,
            timeliness: None,
            completeness: None,
        }
    }

    pub fn status(&self) -> AttendanceStatus {
        AttendanceStatus {
            timeliness: self.timeliness,
            completeness: self.completeness,
        }
    }

    /// Checked out, or frozen as `Incomplete`.
    pub fn is_closed(&self) -> bool {
        self.time_out.is_some() || self.completeness.is_some()
    }

    pub fn is_late(&self) -> bool {
        self.timeliness == Some(Timeliness::Late)
    }

    pub fn check_in(&mut self, at: NaiveDateTime, shift: &ShiftPolicy) -> EngineResult<()> {
        if self.time_in.is_some() {
            return Err(EngineError::DuplicateAction(format!(
                "employee {} already checked in on {}",
                self.employee_id, self.date
            )));
        }
        if self.is_closed() {
            return Err(EngineError::sequence("attendance day is already closed"));
        }
        self.time_in = Some(at);
        self.shift_id = Some(shift.id);
        self.timeliness = Some(shift.timeliness(at));
        Ok(())
    }

    pub fn start_lunch(&mut self, at: NaiveDateTime, shift: &ShiftPolicy) -> EngineResult<()> {
        let time_in = self.open_time_in()?;
        if self.lunch_start.is_some() {
            return Err(EngineError::sequence("lunch already started"));
        }
        hours_between(time_in, at, "time before lunch")?;
        let earliest = time_in + shift.min_work_before_lunch();
        if at < earliest {
            return Err(EngineError::sequence(format!(
                "at least {} hours of work are required before lunch; earliest lunch is {}",
                shift.min_hours_before_lunch,
                earliest.format("%H:%M")
            )));
        }
        self.lunch_start = Some(at);
        Ok(())
    }

    pub fn end_lunch(&mut self, at: NaiveDateTime) -> EngineResult<()> {
        self.open_time_in()?;
        let Some(lunch_start) = self.lunch_start else {
            return Err(EngineError::sequence("lunch has not been started"));
        };
        if self.lunch_end.is_some() {
            return Err(EngineError::sequence("lunch already ended"));
        }
        hours_between(lunch_start, at, "lunch break")?;
        self.lunch_end = Some(at);
        Ok(())
    }

    /// Closes the day and derives hours, overtime and the terminal status.
    pub fn check_out(&mut self, at: NaiveDateTime, shift: &ShiftPolicy) -> EngineResult<()> {
        let time_in = self.open_time_in()?;
        let lunch = match (self.lunch_start, self.lunch_end) {
            (Some(_), None) => return Err(EngineError::OpenLunch),
            (Some(start), Some(end)) => {
                hours_between(end, at, "time after lunch")?;
                hours_between(start, end, "lunch break")?
            }
            _ => 0.0,
        };
        let total = hours_between(time_in, at, "work day")?;

        let paid_hours = round2(total - lunch);
        self.time_out = Some(at);
        self.total_time = Some(round2(total));
        self.lunch_duration = Some(round2(lunch));
        self.paid_hours = Some(paid_hours);
        self.overtime_hours = round2((paid_hours - shift.work_hours_target).max(0.0));
        self.completeness = Some(if paid_hours >= shift.work_hours_target {
            Completeness::Complete
        } else {
            Completeness::Undertime
        });
        Ok(())
    }

    /// Freezes a record left open past its day as `Incomplete`.
    pub fn finalize_incomplete(&mut self) {
        if !self.is_closed() {
            self.completeness = Some(Completeness::Incomplete);
        }
    }

    fn open_time_in(&self) -> EngineResult<NaiveDateTime> {
        let Some(time_in) = self.time_in else {
            return Err(EngineError::sequence("not checked in"));
        };
        if self.time_out.is_some() {
            return Err(EngineError::sequence("already checked out"));
        }
        if self.is_closed() {
            return Err(EngineError::sequence("attendance day is already closed"));
        }
        Ok(time_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn shift() -> ShiftPolicy {
        ShiftPolicy::new(
            1,
            "Regular",
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn checked_in(h: u32, m: u32) -> AttendanceRecord {
        let mut rec = AttendanceRecord::new(7, at(h, m).date());
        rec.check_in(at(h, m), &shift()).unwrap();
        rec
    }

    #[test]
    fn full_day_with_lunch() {
        let shift = shift();
        let mut rec = checked_in(8, 0);
        rec.start_lunch(at(12, 0), &shift).unwrap();
        rec.end_lunch(at(13, 0)).unwrap();
        rec.check_out(at(17, 0), &shift).unwrap();

        assert_eq!(rec.total_time, Some(9.0));
        assert_eq!(rec.lunch_duration, Some(1.0));
        assert_eq!(rec.paid_hours, Some(8.0));
        assert_eq!(rec.overtime_hours, 0.0);
        assert_eq!(rec.status().to_string(), "On Time, Complete");
    }

    #[test]
    fn no_lunch_means_paid_equals_total() {
        let shift = shift();
        let mut rec = checked_in(8, 30);
        rec.check_out(at(15, 0), &shift).unwrap();
        assert_eq!(rec.lunch_duration, Some(0.0));
        assert_eq!(rec.paid_hours, rec.total_time);
        assert_eq!(rec.status().to_string(), "Late, Undertime");
    }

    #[test]
    fn overtime_is_the_excess_over_target() {
        let shift = shift();
        let mut rec = checked_in(7, 30);
        rec.start_lunch(at(12, 0), &shift).unwrap();
        rec.end_lunch(at(12, 30)).unwrap();
        rec.check_out(at(18, 15), &shift).unwrap();
        assert_eq!(rec.paid_hours, Some(10.25));
        assert_eq!(rec.overtime_hours, 2.25);
        assert_eq!(rec.completeness, Some(Completeness::Complete));
    }

    #[test]
    fn second_check_in_is_rejected_without_change() {
        let mut rec = checked_in(8, 0);
        let before = rec.clone();
        let err = rec.check_in(at(9, 0), &shift()).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAction(_)));
        assert_eq!(rec, before);
    }

    #[test]
    fn lunch_needs_minimum_work() {
        let shift = shift();
        let mut rec = checked_in(8, 0);
        let err = rec.start_lunch(at(10, 59), &shift).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSequence(_)));
        assert!(rec.lunch_start.is_none());
        rec.start_lunch(at(11, 0), &shift).unwrap();
        assert!(matches!(
            rec.start_lunch(at(11, 30), &shift),
            Err(EngineError::InvalidSequence(_))
        ));
    }

    #[test]
    fn end_lunch_requires_a_started_lunch() {
        let mut rec = checked_in(8, 0);
        assert!(matches!(
            rec.end_lunch(at(13, 0)),
            Err(EngineError::InvalidSequence(_))
        ));
    }

    #[test]
    fn lunch_ending_before_it_starts_is_a_time_range_error() {
        let shift = shift();
        let mut rec = checked_in(8, 0);
        rec.start_lunch(at(12, 0), &shift).unwrap();
        assert!(matches!(
            rec.end_lunch(at(11, 50)),
            Err(EngineError::InvalidTimeRange(_))
        ));
        assert!(rec.lunch_end.is_none());
    }

    #[test]
    fn open_lunch_blocks_check_out() {
        let shift = shift();
        let mut rec = checked_in(8, 0);
        rec.start_lunch(at(12, 0), &shift).unwrap();
        let before = rec.clone();
        assert!(matches!(
            rec.check_out(at(17, 0), &shift),
            Err(EngineError::OpenLunch)
        ));
        assert_eq!(rec, before);
    }

    #[test]
    fn double_check_out_is_a_sequence_error() {
        let shift = shift();
        let mut rec = checked_in(8, 0);
        rec.check_out(at(17, 0), &shift).unwrap();
        let closed = rec.clone();
        assert!(matches!(
            rec.check_out(at(18, 0), &shift),
            Err(EngineError::InvalidSequence(_))
        ));
        assert_eq!(rec, closed);
    }

    #[test]
    fn check_out_without_check_in() {
        let mut rec = AttendanceRecord::new(7, at(8, 0).date());
        assert!(matches!(
            rec.check_out(at(17, 0), &shift()),
            Err(EngineError::InvalidSequence(_))
        ));
    }

    #[test]
    fn incomplete_is_terminal() {
        let shift = shift();
        let mut rec = checked_in(8, 0);
        rec.finalize_incomplete();
        assert_eq!(rec.status().to_string(), "Incomplete");
        assert!(rec.is_closed());
        assert!(matches!(
            rec.check_out(at(17, 0), &shift),
            Err(EngineError::InvalidSequence(_))
        ));
    }

    #[test]
    fn provisional_label_before_check_out() {
        let rec = checked_in(8, 16);
        assert_eq!(rec.status().to_string(), "Late");
        assert_eq!("On Time".parse::<Timeliness>().unwrap(), Timeliness::OnTime);
    }
}
