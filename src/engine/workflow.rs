//! Shared Pending -> Approved | Rejected machine for every request kind.
//!
//! The machine itself lives on [`RequestRecord`]; this module adds
//! authorization, persistence and the per-kind [`KindPolicy`] hooks.

use async_trait::async_trait;

use crate::engine::{Engine, active_employee, now, reconcile};
use crate::error::{EngineError, EngineResult};
use crate::model::actor::Actor;
use crate::model::employee::EmployeeAccount;
use crate::model::request::{
    Decision, RequestFilter, RequestKind, RequestPayload, RequestRecord, RequestStatus, Submission,
};
use crate::store::StoreTx;

/// What differs between request kinds: payload validation at submission and
/// the side effect of approval.
#[async_trait]
pub trait KindPolicy: Send + Sync {
    async fn validate(
        &self,
        tx: &mut dyn StoreTx,
        employee: &EmployeeAccount,
        payload: &RequestPayload,
    ) -> EngineResult<()>;

    async fn on_approve(
        &self,
        tx: &mut dyn StoreTx,
        employee: &EmployeeAccount,
        request: &mut RequestRecord,
    ) -> EngineResult<()>;
}

pub struct LeavePolicy;
pub struct OvertimePolicy;
pub struct LateConsiderationPolicy;

pub fn policy_for(kind: RequestKind) -> &'static dyn KindPolicy {
    match kind {
        RequestKind::Leave => &LeavePolicy,
        RequestKind::Overtime => &OvertimePolicy,
        RequestKind::LateConsideration => &LateConsiderationPolicy,
    }
}

#[async_trait]
impl KindPolicy for LeavePolicy {
    async fn validate(
        &self,
        _tx: &mut dyn StoreTx,
        employee: &EmployeeAccount,
        payload: &RequestPayload,
    ) -> EngineResult<()> {
        let RequestPayload::Leave {
            start_date,
            end_date,
            days_count,
            ..
        } = payload
        else {
            return Ok(());
        };

        if end_date < start_date || *days_count < 1 {
            return Err(EngineError::InvalidTimeRange(format!(
                "leave ends on {end_date} before it starts on {start_date}"
            )));
        }
        // Overlapping pending leave is allowed. Credits are checked again on approval.
        if *days_count > employee.leave_credits {
            return Err(EngineError::InsufficientCredits {
                available: employee.leave_credits,
                required: *days_count,
            });
        }
        Ok(())
    }

    async fn on_approve(
        &self,
        tx: &mut dyn StoreTx,
        employee: &EmployeeAccount,
        request: &mut RequestRecord,
    ) -> EngineResult<()> {
        let RequestPayload::Leave { days_count, .. } = request.payload else {
            return Ok(());
        };

        let remaining = employee.leave_credits - days_count;
        if remaining < 0 {
            return Err(EngineError::InsufficientCredits {
                available: employee.leave_credits,
                required: days_count,
            });
        }
        tx.set_leave_credits(employee.id, remaining).await?;
        tracing::info!(
            employee_id = employee.id,
            debited = days_count,
            remaining,
            "Leave credits debited"
        );

        reconcile::after_leave_approval(tx, request).await
    }
}

#[async_trait]
impl KindPolicy for OvertimePolicy {
    async fn validate(
        &self,
        tx: &mut dyn StoreTx,
        employee: &EmployeeAccount,
        payload: &RequestPayload,
    ) -> EngineResult<()> {
        let RequestPayload::Overtime {
            request_date,
            hours_requested,
            ..
        } = payload
        else {
            return Ok(());
        };

        if !(*hours_requested > 0.0 && *hours_requested <= 24.0) {
            return Err(EngineError::InvalidTimeRange(format!(
                "requested overtime must be between 0 and 24 hours, got {hours_requested}"
            )));
        }

        let pending = RequestFilter::for_employee(employee.id)
            .kind(RequestKind::Overtime)
            .status(RequestStatus::Pending)
            .concerning(*request_date);
        if !tx.find_requests(&pending).await?.is_empty() {
            return Err(EngineError::DuplicateRequest(format!(
                "an overtime request for {request_date} is already pending"
            )));
        }
        Ok(())
    }

    async fn on_approve(
        &self,
        tx: &mut dyn StoreTx,
        _employee: &EmployeeAccount,
        request: &mut RequestRecord,
    ) -> EngineResult<()> {
        reconcile::after_overtime_approval(tx, request).await
    }
}

#[async_trait]
impl KindPolicy for LateConsiderationPolicy {
    async fn validate(
        &self,
        tx: &mut dyn StoreTx,
        employee: &EmployeeAccount,
        payload: &RequestPayload,
    ) -> EngineResult<()> {
        let RequestPayload::LateConsideration {
            attendance_date, ..
        } = payload
        else {
            return Ok(());
        };

        let existing = RequestFilter::for_employee(employee.id)
            .kind(RequestKind::LateConsideration)
            .concerning(*attendance_date);
        if !tx.find_requests(&existing).await?.is_empty() {
            return Err(duplicate_late_consideration(*attendance_date));
        }

        let record = tx
            .attendance(employee.id, *attendance_date)
            .await?
            .ok_or_else(|| {
                EngineError::not_found(format!(
                    "attendance of employee {} on {attendance_date}",
                    employee.id
                ))
            })?;
        if !record.is_late() {
            return Err(EngineError::sequence(format!(
                "attendance on {attendance_date} is not marked Late"
            )));
        }
        Ok(())
    }

    /// Excusal is an overlay read by reporting. The attendance status is left
    /// as recorded.
    async fn on_approve(
        &self,
        _tx: &mut dyn StoreTx,
        _employee: &EmployeeAccount,
        _request: &mut RequestRecord,
    ) -> EngineResult<()> {
        Ok(())
    }
}

fn duplicate_late_consideration(date: chrono::NaiveDate) -> EngineError {
    EngineError::DuplicateRequest(format!(
        "a late consideration for {date} already exists"
    ))
}

impl Engine {
    /// Files a new `Pending` request for `employee_id`.
    pub async fn submit(
        &self,
        actor: &Actor,
        employee_id: u64,
        submission: Submission,
    ) -> EngineResult<RequestRecord> {
        actor.require_self_or_admin(employee_id)?;
        let kind = submission.kind();
        let payload = submission.into_payload();

        let mut tx = self.store.begin().await?;
        let employee = active_employee(tx.as_mut(), employee_id).await?;
        policy_for(kind)
            .validate(tx.as_mut(), &employee, &payload)
            .await?;

        let mut record = RequestRecord::pending(employee_id, payload, now());
        record.id = match tx.insert_request(&record).await? {
            Some(id) => id,
            None => {
                let date = match &record.payload {
                    RequestPayload::LateConsideration {
                        attendance_date, ..
                    } => *attendance_date,
                    _ => record.created_at.date(),
                };
                return Err(duplicate_late_consideration(date));
            }
        };
        tx.commit().await?;

        tracing::info!(request_id = record.id, employee_id, %kind, "Request submitted");
        Ok(record)
    }

    /// Moves a `Pending` request to `Approved` or `Rejected`, applying the
    /// kind's approval side effect in the same transaction.
    pub async fn review(
        &self,
        actor: &Actor,
        request_id: u64,
        decision: Decision,
        remarks: Option<String>,
    ) -> EngineResult<RequestRecord> {
        actor.require_reviewer()?;

        let mut tx = self.store.begin().await?;
        // employee row before request row, the order check-out takes them in
        let owner = tx
            .request_owner(request_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("request {request_id}")))?;
        let employee = tx
            .employee(owner)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("employee {owner}")))?;
        let mut request = tx
            .request(request_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("request {request_id}")))?;
        if request.is_reviewed() {
            return Err(EngineError::AlreadyReviewed(request_id));
        }

        request.apply_review(actor.user_id, now(), decision, remarks)?;
        if decision == Decision::Approve {
            policy_for(request.kind())
                .on_approve(tx.as_mut(), &employee, &mut request)
                .await?;
        }
        tx.record_review(&request).await?;
        tx.commit().await?;

        tracing::info!(
            request_id,
            kind = %request.kind(),
            status = %request.status,
            reviewer = actor.user_id,
            "Request reviewed"
        );
        Ok(request)
    }

    /// Flags a reviewed request as seen by its employee. Repeating it is a
    /// successful no-op.
    pub async fn mark_notified(&self, actor: &Actor, request_id: u64) -> EngineResult<RequestRecord> {
        let mut tx = self.store.begin().await?;
        let mut request = tx
            .request(request_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("request {request_id}")))?;
        actor.require_self_or_admin(request.employee_id)?;

        if request.mark_notified()? {
            tx.set_notified(request_id).await?;
            tx.commit().await?;
            tracing::debug!(request_id, "Request marked notified");
        }
        Ok(request)
    }

    /// Flags every reviewed, unnotified request of the employee. Returns how
    /// many changed.
    pub async fn mark_all_notified(&self, actor: &Actor, employee_id: u64) -> EngineResult<usize> {
        actor.require_self_or_admin(employee_id)?;

        let mut tx = self.store.begin().await?;
        tx.employee(employee_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("employee {employee_id}")))?;
        let filter = RequestFilter {
            unnotified_only: true,
            ..RequestFilter::for_employee(employee_id)
        };
        let mut count = 0;
        for mut request in tx.lock_requests(&filter).await? {
            if request.mark_notified()? {
                tx.set_notified(request.id).await?;
                count += 1;
            }
        }
        tx.commit().await?;

        tracing::debug!(employee_id, count, "Requests marked notified");
        Ok(count)
    }

    /// Reviewed requests the employee has not been told about yet.
    pub async fn unnotified(&self, actor: &Actor, employee_id: u64) -> EngineResult<Vec<RequestRecord>> {
        actor.require_self_or_reviewer(employee_id)?;
        let filter = RequestFilter {
            unnotified_only: true,
            ..RequestFilter::for_employee(employee_id)
        };
        let mut tx = self.store.begin().await?;
        Ok(tx.find_requests(&filter).await?)
    }

    pub async fn request(&self, actor: &Actor, request_id: u64) -> EngineResult<RequestRecord> {
        let mut tx = self.store.begin().await?;
        let request = tx
            .request(request_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("request {request_id}")))?;
        actor.require_self_or_reviewer(request.employee_id)?;
        Ok(request)
    }

    /// Requests by status, kind and employee. Employees only ever see their own.
    pub async fn requests(
        &self,
        actor: &Actor,
        mut filter: RequestFilter,
    ) -> EngineResult<Vec<RequestRecord>> {
        if !actor.is_reviewer() {
            let own = actor
                .employee_id
                .ok_or_else(|| EngineError::denied("no employee profile"))?;
            let employee_id = *filter.employee_id.get_or_insert(own);
            actor.require_self_or_reviewer(employee_id)?;
        }
        let mut tx = self.store.begin().await?;
        Ok(tx.find_requests(&filter).await?)
    }

    pub async fn pending_count(
        &self,
        actor: &Actor,
        kind: Option<RequestKind>,
    ) -> EngineResult<usize> {
        actor.require_reviewer()?;
        let filter = RequestFilter {
            kind,
            status: Some(RequestStatus::Pending),
            ..Default::default()
        };
        let mut tx = self.store.begin().await?;
        Ok(tx.find_requests(&filter).await?.len())
    }
}
