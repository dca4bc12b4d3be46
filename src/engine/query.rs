//! Read-only projections for reporting callers.
//!
//! Nothing here is persisted: excused lateness and leave/absence
//! classification are derived from approved requests on every call.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use strum_macros::Display;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::model::actor::Actor;
use crate::model::attendance::{AttendanceRecord, Completeness, Timeliness};
use crate::model::request::{RequestFilter, RequestKind, RequestPayload, RequestStatus};
use crate::store::StoreTx;
use crate::utils::hours::round2;

/// An attendance record as reported: rendered status plus the late excusal
/// overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceView {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub status: String,
    /// Late, with an approved late consideration for the day.
    pub excused_late: bool,
}

impl AttendanceView {
    fn new(record: AttendanceRecord, excused: bool) -> Self {
        Self {
            status: record.status().to_string(),
            excused_late: excused && record.is_late(),
            record,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Display)]
pub enum DayClass {
    Present,
    OnLeave,
    RestDay,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayEntry {
    pub employee_id: u64,
    pub employee_code: String,
    pub full_name: String,
    pub class: DayClass,
    pub attendance: Option<AttendanceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeSummary {
    pub employee_id: u64,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_recorded: usize,
    pub on_time: usize,
    pub late: usize,
    pub excused_late: usize,
    pub complete: usize,
    pub undertime: usize,
    pub incomplete: usize,
    pub total_paid_hours: f64,
    pub average_paid_hours: f64,
    /// Reconciled `actual_overtime` of approved overtime requests.
    pub approved_overtime_hours: f64,
    pub leave_credits: i64,
}

/// Dates with an approved late consideration, per employee.
async fn excused_days(
    tx: &mut dyn StoreTx,
    filter: RequestFilter,
) -> EngineResult<HashSet<(u64, NaiveDate)>> {
    let filter = filter
        .kind(RequestKind::LateConsideration)
        .status(RequestStatus::Approved);
    let excused = tx
        .find_requests(&filter)
        .await?
        .into_iter()
        .filter_map(|r| match r.payload {
            RequestPayload::LateConsideration {
                attendance_date, ..
            } => Some((r.employee_id, attendance_date)),
            _ => None,
        })
        .collect();
    Ok(excused)
}

fn check_range(from: NaiveDate, to: NaiveDate) -> EngineResult<()> {
    if to < from {
        return Err(EngineError::InvalidTimeRange(format!(
            "range ends on {to} before it starts on {from}"
        )));
    }
    Ok(())
}

impl Engine {
    pub async fn attendance_record(
        &self,
        actor: &Actor,
        employee_id: u64,
        date: NaiveDate,
    ) -> EngineResult<AttendanceView> {
        actor.require_self_or_reviewer(employee_id)?;
        let mut tx = self.store.begin().await?;
        let record = tx.attendance(employee_id, date).await?.ok_or_else(|| {
            EngineError::not_found(format!("attendance of employee {employee_id} on {date}"))
        })?;
        let excused = excused_days(
            tx.as_mut(),
            RequestFilter::for_employee(employee_id).concerning(date),
        )
        .await?;
        Ok(AttendanceView::new(record, excused.contains(&(employee_id, date))))
    }

    pub async fn attendance_for_date(
        &self,
        actor: &Actor,
        date: NaiveDate,
    ) -> EngineResult<Vec<AttendanceView>> {
        actor.require_reviewer()?;
        let mut tx = self.store.begin().await?;
        let records = tx.attendance_on(date).await?;
        let excused = excused_days(tx.as_mut(), RequestFilter::default().concerning(date)).await?;
        Ok(records
            .into_iter()
            .map(|r| {
                let key = (r.employee_id, r.date);
                AttendanceView::new(r, excused.contains(&key))
            })
            .collect())
    }

    pub async fn attendance_history(
        &self,
        actor: &Actor,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<AttendanceView>> {
        actor.require_self_or_reviewer(employee_id)?;
        check_range(from, to)?;
        let mut tx = self.store.begin().await?;
        let records = tx.attendance_between(employee_id, from, to).await?;
        let excused = excused_days(tx.as_mut(), RequestFilter::for_employee(employee_id)).await?;
        Ok(records
            .into_iter()
            .map(|r| {
                let key = (r.employee_id, r.date);
                AttendanceView::new(r, excused.contains(&key))
            })
            .collect())
    }

    /// Classifies every active employee for `date`. Approved leave excuses an
    /// absence.
    pub async fn day_overview(&self, actor: &Actor, date: NaiveDate) -> EngineResult<Vec<DayEntry>> {
        actor.require_reviewer()?;
        let mut tx = self.store.begin().await?;
        let employees = tx.active_employees().await?;
        let mut attendance = tx.attendance_on(date).await?;
        let excused = excused_days(tx.as_mut(), RequestFilter::default().concerning(date)).await?;
        let on_leave: HashSet<u64> = tx
            .find_requests(
                &RequestFilter::default()
                    .kind(RequestKind::Leave)
                    .status(RequestStatus::Approved)
                    .concerning(date),
            )
            .await?
            .into_iter()
            .map(|r| r.employee_id)
            .collect();
        let rest_day = self.settings.rest_days.contains(&date.weekday());

        let entries = employees
            .into_iter()
            .map(|employee| {
                let record = attendance
                    .iter()
                    .position(|r| r.employee_id == employee.id)
                    .map(|i| attendance.swap_remove(i));
                let class = match &record {
                    Some(_) => DayClass::Present,
                    None if on_leave.contains(&employee.id) => DayClass::OnLeave,
                    None if rest_day => DayClass::RestDay,
                    None => DayClass::Absent,
                };
                DayEntry {
                    employee_id: employee.id,
                    employee_code: employee.employee_code,
                    full_name: employee.full_name,
                    class,
                    attendance: record.map(|r| {
                        let key = (r.employee_id, r.date);
                        AttendanceView::new(r, excused.contains(&key))
                    }),
                }
            })
            .collect();
        Ok(entries)
    }

    pub async fn employee_summary(
        &self,
        actor: &Actor,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<EmployeeSummary> {
        actor.require_self_or_reviewer(employee_id)?;
        check_range(from, to)?;
        let mut tx = self.store.begin().await?;
        let employee = tx
            .employee(employee_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("employee {employee_id}")))?;
        let records = tx.attendance_between(employee_id, from, to).await?;
        let excused = excused_days(tx.as_mut(), RequestFilter::for_employee(employee_id)).await?;
        let overtime = tx
            .find_requests(
                &RequestFilter::for_employee(employee_id)
                    .kind(RequestKind::Overtime)
                    .status(RequestStatus::Approved),
            )
            .await?;

        let mut summary = EmployeeSummary {
            employee_id,
            from,
            to,
            days_recorded: records.len(),
            on_time: 0,
            late: 0,
            excused_late: 0,
            complete: 0,
            undertime: 0,
            incomplete: 0,
            total_paid_hours: 0.0,
            average_paid_hours: 0.0,
            approved_overtime_hours: 0.0,
            leave_credits: employee.leave_credits,
        };
        let mut paid_days = 0;
        for record in &records {
            match record.timeliness {
                Some(Timeliness::OnTime) => summary.on_time += 1,
                Some(Timeliness::Late) => {
                    summary.late += 1;
                    if excused.contains(&(record.employee_id, record.date)) {
                        summary.excused_late += 1;
                    }
                }
                None => {}
            }
            match record.completeness {
                Some(Completeness::Complete) => summary.complete += 1,
                Some(Completeness::Undertime) => summary.undertime += 1,
                Some(Completeness::Incomplete) => summary.incomplete += 1,
                None => {}
            }
            if let Some(paid) = record.paid_hours {
                summary.total_paid_hours += paid;
                paid_days += 1;
            }
        }
        if paid_days > 0 {
            summary.average_paid_hours = round2(summary.total_paid_hours / f64::from(paid_days));
        }
        summary.total_paid_hours = round2(summary.total_paid_hours);

        let approved_overtime: f64 = overtime
            .iter()
            .filter_map(|r| match &r.payload {
                RequestPayload::Overtime {
                    request_date,
                    actual_overtime,
                    ..
                } if (from..=to).contains(request_date) => *actual_overtime,
                _ => None,
            })
            .sum();
        summary.approved_overtime_hours = round2(approved_overtime);

        Ok(summary)
    }
}
