//! Attendance and request workflow engine.
//!
//! Every public operation takes the calling [`Actor`], checks its capability,
//! then runs as one store transaction: locking reads, validation, writes,
//! reconciliation and commit. Any error drops the transaction, so a rejected
//! operation never leaves partial state behind.
//!
//! [`Actor`]: crate::model::actor::Actor

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Weekday};

use crate::error::{EngineError, EngineResult};
use crate::model::employee::EmployeeAccount;
use crate::store::{Store, StoreTx};

pub mod ledger;
pub mod query;
mod reconcile;
pub mod shift;
pub mod workflow;


use shift::ShiftResolver;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Days on which check-in is refused.
    pub rest_days: Vec<Weekday>,
    pub shift_cache_ttl: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            rest_days: vec![Weekday::Sun],
            shift_cache_ttl: Duration::from_secs(300),
        }
    }
}

pub struct Engine {
    store: Arc<dyn Store>,
    shifts: ShiftResolver,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, settings: EngineSettings) -> Self {
        Self {
            store,
            shifts: ShiftResolver::new(settings.shift_cache_ttl),
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

/// Wall-clock time stamped on request creation and review.
pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Loads an employee that may take part in attendance and requests.
pub(crate) async fn active_employee(
    tx: &mut dyn StoreTx,
    employee_id: u64,
) -> EngineResult<EmployeeAccount> {
    let employee = tx
        .employee(employee_id)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("employee {employee_id}")))?;
    if !employee.is_active {
        return Err(EngineError::denied(format!(
            "employee {employee_id} is inactive"
        )));
    }
    Ok(employee)
}
