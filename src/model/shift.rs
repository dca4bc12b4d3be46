use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::model::attendance::Timeliness;

pub const DEFAULT_WORK_HOURS: f64 = 8.0;
pub const DEFAULT_GRACE_PERIOD_MINS: u32 = 15;
pub const DEFAULT_MIN_HOURS_BEFORE_LUNCH: f64 = 3.0;

/// Shift definition governing timeliness and completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShiftPolicy {
    pub id: u64,
    pub name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Paid hours needed for a `Complete` day.
    pub work_hours_target: f64,
    pub grace_period_mins: u32,
    pub min_hours_before_lunch: f64,
    pub is_default: bool,
    pub is_active: bool,
}

impl ShiftPolicy {
    pub fn new(id: u64, name: &str, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            id,
            name: name.to_string(),
            start_time,
            end_time,
            work_hours_target: DEFAULT_WORK_HOURS,
            grace_period_mins: DEFAULT_GRACE_PERIOD_MINS,
            min_hours_before_lunch: DEFAULT_MIN_HOURS_BEFORE_LUNCH,
            is_default: false,
            is_active: true,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Night shifts (e.g. 22:00 - 07:00) end on the next calendar day.
    pub fn crosses_midnight(&self) -> bool {
        self.start_time > self.end_time
    }

    pub fn grace_period(&self) -> Duration {
        Duration::minutes(i64::from(self.grace_period_mins))
    }

    pub fn min_work_before_lunch(&self) -> Duration {
        Duration::seconds((self.min_hours_before_lunch * 3600.0).round() as i64)
    }

    /// Start instant of the shift occurrence a check-in belongs to.
    ///
    /// A check-in in the early-morning tail of a night shift, up to and
    /// including the shift end, belongs to the occurrence that started the
    /// previous evening.
    pub fn start_for(&self, time_in: NaiveDateTime) -> NaiveDateTime {
        let start = time_in.date().and_time(self.start_time);
        if self.crosses_midnight() && time_in.time() <= self.end_time {
            start - Duration::days(1)
        } else {
            start
        }
    }

    pub fn timeliness(&self, time_in: NaiveDateTime) -> Timeliness {
        if time_in <= self.start_for(time_in) + self.grace_period() {
            Timeliness::OnTime
        } else {
            Timeliness::Late
        }
    }

    /// Whether a check-in at this time of day falls inside the schedule.
    pub fn accepts_check_in(&self, time: NaiveTime) -> bool {
        if self.crosses_midnight() {
            // blocked in the daytime gap between end and start
            !(self.end_time < time && time < self.start_time)
        } else {
            time <= self.end_time
        }
    }

    /// Instant after which an attendance day anchored on `date` is closed.
    pub fn day_closes_at(&self, date: NaiveDate) -> NaiveDateTime {
        let days = if self.crosses_midnight() { 2 } else { 1 };
        (date + Duration::days(days)).and_time(NaiveTime::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_time(t(h, m))
    }

    #[test]
    fn grace_window_decides_timeliness() {
        let day = ShiftPolicy::new(1, "Regular", t(8, 0), t(17, 0));
        assert_eq!(day.timeliness(dt(14, 7, 45)), Timeliness::OnTime);
        assert_eq!(day.timeliness(dt(14, 8, 10)), Timeliness::OnTime);
        assert_eq!(day.timeliness(dt(14, 8, 15)), Timeliness::OnTime);
        assert_eq!(day.timeliness(dt(14, 8, 16)), Timeliness::Late);
    }

    #[test]
    fn night_shift_measures_tail_against_previous_evening() {
        let night = ShiftPolicy::new(2, "Night", t(22, 0), t(7, 0));
        assert!(night.crosses_midnight());
        assert_eq!(night.start_for(dt(15, 0, 30)), dt(14, 22, 0));
        assert_eq!(night.timeliness(dt(14, 22, 10)), Timeliness::OnTime);
        assert_eq!(night.timeliness(dt(14, 21, 50)), Timeliness::OnTime);
        assert_eq!(night.timeliness(dt(15, 0, 30)), Timeliness::Late);
    }

    #[test]
    fn night_shift_end_belongs_to_the_tail() {
        let night = ShiftPolicy::new(2, "Night", t(22, 0), t(7, 0));
        assert_eq!(night.start_for(dt(15, 6, 59)), dt(14, 22, 0));
        assert_eq!(night.start_for(dt(15, 7, 0)), dt(14, 22, 0));
        assert_eq!(night.timeliness(dt(15, 6, 59)), Timeliness::Late);
        assert_eq!(night.timeliness(dt(15, 7, 0)), Timeliness::Late);
        assert!(night.accepts_check_in(t(7, 0)));
    }

    #[test]
    fn check_in_window() {
        let day = ShiftPolicy::new(1, "Regular", t(8, 0), t(17, 0));
        assert!(day.accepts_check_in(t(6, 0)));
        assert!(day.accepts_check_in(t(17, 0)));
        assert!(!day.accepts_check_in(t(17, 1)));

        let night = ShiftPolicy::new(2, "Night", t(22, 0), t(7, 0));
        assert!(!night.accepts_check_in(t(21, 55)));
        assert!(night.accepts_check_in(t(22, 0)));
        assert!(night.accepts_check_in(t(7, 0)));
        assert!(!night.accepts_check_in(t(7, 1)));
        assert!(night.accepts_check_in(t(2, 0)));
        assert!(!night.accepts_check_in(t(12, 0)));
    }

    #[test]
    fn day_close() {
        let day = ShiftPolicy::new(1, "Regular", t(8, 0), t(17, 0));
        let night = ShiftPolicy::new(2, "Night", t(22, 0), t(7, 0));
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(day.day_closes_at(date), dt(15, 0, 0));
        assert_eq!(night.day_closes_at(date), dt(16, 0, 0));
    }

    #[test]
    fn lunch_offset_from_decimal_hours() {
        let mut shift = ShiftPolicy::new(1, "Regular", t(8, 0), t(17, 0));
        shift.min_hours_before_lunch = 2.5;
        assert_eq!(shift.min_work_before_lunch(), Duration::minutes(150));
    }
}
