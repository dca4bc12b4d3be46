use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::engine::{Engine, active_employee, reconcile};
use crate::error::{EngineError, EngineResult};
use crate::model::actor::Actor;
use crate::model::attendance::AttendanceRecord;
use crate::model::shift::ShiftPolicy;
use crate::store::StoreTx;

/// Punches that follow a check-in on the same attendance day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Punch {
    StartLunch,
    EndLunch,
    CheckOut,
}

impl Engine {
    /// Opens the attendance day of `at`'s calendar date.
    pub async fn check_in(
        &self,
        actor: &Actor,
        employee_id: u64,
        at: NaiveDateTime,
    ) -> EngineResult<AttendanceRecord> {
        actor.require_self_or_admin(employee_id)?;
        let shift = self.shifts.resolve(self.store.as_ref(), employee_id).await?;

        let mut tx = self.store.begin().await?;
        active_employee(tx.as_mut(), employee_id).await?;
        self.ensure_work_day(&shift, at)?;
        close_own_stale_days(tx.as_mut(), &shift, employee_id, at).await?;

        let date = at.date();
        let existing = tx.attendance(employee_id, date).await?;
        let mut record = existing
            .clone()
            .unwrap_or_else(|| AttendanceRecord::new(employee_id, date));
        record.check_in(at, &shift)?;

        if existing.is_some() {
            tx.update_attendance(&record).await?;
        } else {
            record.id = tx.insert_attendance(&record).await?.ok_or_else(|| {
                EngineError::DuplicateAction(format!(
                    "employee {employee_id} already checked in on {date}"
                ))
            })?;
        }
        tx.commit().await?;

        tracing::info!(
            employee_id,
            date = %record.date,
            shift = %shift.name,
            status = %record.status(),
            "Checked in"
        );
        Ok(record)
    }

    pub async fn start_lunch(
        &self,
        actor: &Actor,
        employee_id: u64,
        at: NaiveDateTime,
    ) -> EngineResult<AttendanceRecord> {
        self.punch(actor, employee_id, at, Punch::StartLunch).await
    }

    pub async fn end_lunch(
        &self,
        actor: &Actor,
        employee_id: u64,
        at: NaiveDateTime,
    ) -> EngineResult<AttendanceRecord> {
        self.punch(actor, employee_id, at, Punch::EndLunch).await
    }

    /// Closes the day, derives hours and status, then reconciles approved
    /// overtime for the date.
    pub async fn check_out(
        &self,
        actor: &Actor,
        employee_id: u64,
        at: NaiveDateTime,
    ) -> EngineResult<AttendanceRecord> {
        self.punch(actor, employee_id, at, Punch::CheckOut).await
    }

    pub async fn punch(
        &self,
        actor: &Actor,
        employee_id: u64,
        at: NaiveDateTime,
        punch: Punch,
    ) -> EngineResult<AttendanceRecord> {
        actor.require_self_or_admin(employee_id)?;
        let shift = self.shifts.resolve(self.store.as_ref(), employee_id).await?;

        let mut tx = self.store.begin().await?;
        active_employee(tx.as_mut(), employee_id).await?;
        let mut record = locate_open(tx.as_mut(), &shift, employee_id, at).await?;
        if at >= shift.day_closes_at(record.date) {
            return Err(EngineError::sequence(format!(
                "attendance day {} has closed",
                record.date
            )));
        }

        match punch {
            Punch::StartLunch => record.start_lunch(at, &shift)?,
            Punch::EndLunch => record.end_lunch(at)?,
            Punch::CheckOut => record.check_out(at, &shift)?,
        }
        tx.update_attendance(&record).await?;
        if punch == Punch::CheckOut {
            reconcile::after_check_out(tx.as_mut(), &record).await?;
        }
        tx.commit().await?;

        tracing::info!(
            employee_id,
            date = %record.date,
            %punch,
            status = %record.status(),
            paid_hours = ?record.paid_hours,
            "Attendance updated"
        );
        Ok(record)
    }

    /// Finalizes as `Incomplete` every open record whose day closed by `now`.
    pub async fn close_stale_days(
        &self,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> EngineResult<Vec<AttendanceRecord>> {
        actor.require_admin()?;

        // Shift lookups go through the store, so resolve them before the
        // writing transaction is opened.
        let candidates = {
            let mut tx = self.store.begin().await?;
            tx.open_attendance_before(now.date()).await?
        };
        let mut shifts = Vec::with_capacity(candidates.len());
        for record in &candidates {
            let shift = self
                .shifts
                .resolve(self.store.as_ref(), record.employee_id)
                .await?;
            shifts.push((record.employee_id, shift));
        }

        let mut tx = self.store.begin().await?;
        let mut closed = Vec::new();
        for mut record in tx.open_attendance_before(now.date()).await? {
            let Some((_, shift)) = shifts.iter().find(|(id, _)| *id == record.employee_id) else {
                continue;
            };
            if now >= shift.day_closes_at(record.date) {
                record.finalize_incomplete();
                tx.update_attendance(&record).await?;
                closed.push(record);
            }
        }
        tx.commit().await?;

        tracing::info!(count = closed.len(), %now, "Closed stale attendance days");
        Ok(closed)
    }

    fn ensure_work_day(&self, shift: &ShiftPolicy, at: NaiveDateTime) -> EngineResult<()> {
        let weekday = shift.start_for(at).date().weekday();
        if self.settings.rest_days.contains(&weekday) {
            return Err(EngineError::OutsideSchedule(format!(
                "{weekday} is a rest day"
            )));
        }
        if !shift.accepts_check_in(at.time()) {
            return Err(EngineError::OutsideSchedule(format!(
                "check-in at {} is outside shift {} ({}-{})",
                at.format("%H:%M"),
                shift.name,
                shift.start_time.format("%H:%M"),
                shift.end_time.format("%H:%M")
            )));
        }
        Ok(())
    }
}

/// Record the punch applies to: today's, or for a shift that crosses
/// midnight, the one opened the previous evening.
async fn locate_open(
    tx: &mut dyn StoreTx,
    shift: &ShiftPolicy,
    employee_id: u64,
    at: NaiveDateTime,
) -> EngineResult<AttendanceRecord> {
    let date = at.date();
    if let Some(record) = tx.attendance(employee_id, date).await? {
        return Ok(record);
    }
    if shift.crosses_midnight() {
        if let Some(previous) = date.pred_opt() {
            if let Some(record) = tx.attendance(employee_id, previous).await? {
                return Ok(record);
            }
        }
    }
    Err(EngineError::sequence(format!(
        "employee {employee_id} has not checked in"
    )))
}

/// Rolls the employee's own forgotten days over before a new check-in.
async fn close_own_stale_days(
    tx: &mut dyn StoreTx,
    shift: &ShiftPolicy,
    employee_id: u64,
    at: NaiveDateTime,
) -> EngineResult<()> {
    for mut record in tx.open_attendance_of(employee_id, at.date()).await? {
        if at >= shift.day_closes_at(record.date) {
            record.finalize_incomplete();
            tx.update_attendance(&record).await?;
            tracing::info!(employee_id, date = %record.date, "Finalized as Incomplete");
        }
    }
    Ok(())
}
