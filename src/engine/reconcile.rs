//! Links attendance closeout with approved requests.
//!
//! Runs inside the triggering operation's transaction. A missing counterpart
//! is the normal case and is not an error.

use crate::error::EngineResult;
use crate::model::attendance::AttendanceRecord;
use crate::model::request::{RequestFilter, RequestKind, RequestPayload, RequestRecord, RequestStatus};
use crate::store::StoreTx;

/// Copies the day's overtime into every approved overtime request for it.
/// Returns the ids of the requests updated.
pub(crate) async fn after_check_out(
    tx: &mut dyn StoreTx,
    record: &AttendanceRecord,
) -> EngineResult<Vec<u64>> {
    let filter = RequestFilter::for_employee(record.employee_id)
        .kind(RequestKind::Overtime)
        .status(RequestStatus::Approved)
        .concerning(record.date);

    let mut updated = Vec::new();
    for request in tx.lock_requests(&filter).await? {
        tx.set_actual_overtime(request.id, record.overtime_hours)
            .await?;
        updated.push(request.id);
    }

    if !updated.is_empty() {
        tracing::info!(
            employee_id = record.employee_id,
            date = %record.date,
            overtime_hours = record.overtime_hours,
            requests = ?updated,
            "Reconciled approved overtime"
        );
    }
    Ok(updated)
}

/// Fills `actual_overtime` when the day was already checked out at approval.
pub(crate) async fn after_overtime_approval(
    tx: &mut dyn StoreTx,
    request: &mut RequestRecord,
) -> EngineResult<()> {
    let (id, employee_id) = (request.id, request.employee_id);
    let RequestPayload::Overtime {
        request_date,
        actual_overtime,
        ..
    } = &mut request.payload
    else {
        return Ok(());
    };

    if let Some(record) = tx.attendance(employee_id, *request_date).await? {
        if record.time_out.is_some() {
            *actual_overtime = Some(record.overtime_hours);
            tx.set_actual_overtime(id, record.overtime_hours).await?;
        }
    }
    Ok(())
}

/// Leave days carry no attendance mutation. Days in the span that already
/// have attendance are reported so a reviewer can follow up.
pub(crate) async fn after_leave_approval(
    tx: &mut dyn StoreTx,
    request: &RequestRecord,
) -> EngineResult<()> {
    let RequestPayload::Leave {
        start_date,
        end_date,
        ..
    } = &request.payload
    else {
        return Ok(());
    };

    let attended = tx
        .attendance_between(request.employee_id, *start_date, *end_date)
        .await?;
    if !attended.is_empty() {
        let dates: Vec<String> = attended.iter().map(|r| r.date.to_string()).collect();
        tracing::warn!(
            request_id = request.id,
            employee_id = request.employee_id,
            dates = ?dates,
            "Approved leave overlaps recorded attendance"
        );
    }
    Ok(())
}
