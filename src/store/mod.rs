//! Storage handle threaded through every engine operation.
//!
//! An operation opens one [`StoreTx`], performs its locking reads, validates,
//! writes and commits. Dropping a transaction without committing discards
//! every write made through it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::attendance::AttendanceRecord;
use crate::model::employee::EmployeeAccount;
use crate::model::request::{RequestFilter, RequestRecord};
use crate::model::shift::ShiftPolicy;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx + '_>>;

    /// Active shift explicitly assigned to the employee.
    async fn assigned_shift(&self, employee_id: u64) -> Result<Option<ShiftPolicy>>;

    /// Active shift flagged as default, else the first active shift.
    async fn default_shift(&self) -> Result<Option<ShiftPolicy>>;
}

/// One all-or-nothing unit of work.
///
/// Single-row reads (`employee`, `attendance`, `request`) and `lock_requests`
/// lock the rows they return until the transaction ends. Operations that
/// touch one employee's data lock the employee row first, then attendance,
/// then requests.
#[async_trait]
pub trait StoreTx: Send {
    async fn employee(&mut self, id: u64) -> Result<Option<EmployeeAccount>>;
    async fn active_employees(&mut self) -> Result<Vec<EmployeeAccount>>;
    async fn set_leave_credits(&mut self, employee_id: u64, credits: i64) -> Result<()>;

    async fn attendance(
        &mut self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>>;
    async fn attendance_on(&mut self, date: NaiveDate) -> Result<Vec<AttendanceRecord>>;
    async fn attendance_between(
        &mut self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>>;
    /// Records dated before `date` that were never checked out or finalized.
    async fn open_attendance_before(&mut self, date: NaiveDate) -> Result<Vec<AttendanceRecord>>;
    /// Same as `open_attendance_before`, for one employee only.
    async fn open_attendance_of(
        &mut self,
        employee_id: u64,
        before: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>>;
    /// Returns `None` when a record for (employee, date) already exists.
    async fn insert_attendance(&mut self, record: &AttendanceRecord) -> Result<Option<u64>>;
    async fn update_attendance(&mut self, record: &AttendanceRecord) -> Result<()>;

    /// Owner of a request, read without locking.
    async fn request_owner(&mut self, id: u64) -> Result<Option<u64>>;
    async fn request(&mut self, id: u64) -> Result<Option<RequestRecord>>;
    /// Plain read for listings.
    async fn find_requests(&mut self, filter: &RequestFilter) -> Result<Vec<RequestRecord>>;
    /// Like `find_requests`, locking every returned row.
    async fn lock_requests(&mut self, filter: &RequestFilter) -> Result<Vec<RequestRecord>>;
    /// Returns `None` when a uniqueness rule (one late consideration per
    /// employee and date) rejects the row.
    async fn insert_request(&mut self, record: &RequestRecord) -> Result<Option<u64>>;
    /// Writes the decision: status, reviewer, review time and remarks.
    async fn record_review(&mut self, record: &RequestRecord) -> Result<()>;
    async fn set_actual_overtime(&mut self, id: u64, hours: f64) -> Result<()>;
    async fn set_notified(&mut self, id: u64) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
