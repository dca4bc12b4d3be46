use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::lock::{Mutex, MutexGuard};

use crate::model::attendance::AttendanceRecord;
use crate::model::employee::EmployeeAccount;
use crate::model::request::{RequestFilter, RequestKind, RequestPayload, RequestRecord};
use crate::model::shift::ShiftPolicy;
use crate::store::{Store, StoreTx};

#[derive(Debug, Clone, Default)]
struct Tables {
    employees: BTreeMap<u64, EmployeeAccount>,
    shifts: BTreeMap<u64, ShiftPolicy>,
    attendance: BTreeMap<(u64, NaiveDate), AttendanceRecord>,
    requests: BTreeMap<u64, RequestRecord>,
    next_attendance_id: u64,
    next_request_id: u64,
}

/// In-process store for embedding and tests.
///
/// A transaction holds the store lock for its whole life and works on a copy
/// of the tables, published on commit. Operations are therefore fully
/// serialized.
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    pub async fn insert_shift(&self, shift: ShiftPolicy) {
        self.tables.lock().await.shifts.insert(shift.id, shift);
    }

    pub async fn insert_employee(&self, employee: EmployeeAccount) {
        self.tables
            .lock()
            .await
            .employees
            .insert(employee.id, employee);
    }

    pub async fn employee(&self, id: u64) -> Option<EmployeeAccount> {
        self.tables.lock().await.employees.get(&id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx + '_>> {
        let guard = self.tables.lock().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }

    async fn assigned_shift(&self, employee_id: u64) -> Result<Option<ShiftPolicy>> {
        let tables = self.tables.lock().await;
        let shift = tables
            .employees
            .get(&employee_id)
            .and_then(|e| e.shift_id)
            .and_then(|id| tables.shifts.get(&id))
            .filter(|s| s.is_active)
            .cloned();
        Ok(shift)
    }

    async fn default_shift(&self) -> Result<Option<ShiftPolicy>> {
        let tables = self.tables.lock().await;
        let mut active = tables.shifts.values().filter(|s| s.is_active);
        let shift = active
            .clone()
            .find(|s| s.is_default)
            .or_else(|| active.next())
            .cloned();
        Ok(shift)
    }
}

struct MemoryTx<'a> {
    guard: MutexGuard<'a, Tables>,
    work: Tables,
}

impl MemoryTx<'_> {
    fn request_mut(&mut self, id: u64) -> Result<&mut RequestRecord> {
        self.work
            .requests
            .get_mut(&id)
            .ok_or_else(|| anyhow!("request {id} vanished"))
    }
}

fn late_consideration_key(record: &RequestRecord) -> Option<(u64, NaiveDate)> {
    match &record.payload {
        RequestPayload::LateConsideration {
            attendance_date, ..
        } => Some((record.employee_id, *attendance_date)),
        _ => None,
    }
}

#[async_trait]
impl<'a> StoreTx for MemoryTx<'a> {
    async fn employee(&mut self, id: u64) -> Result<Option<EmployeeAccount>> {
        Ok(self.work.employees.get(&id).cloned())
    }

    async fn active_employees(&mut self) -> Result<Vec<EmployeeAccount>> {
        Ok(self
            .work
            .employees
            .values()
            .filter(|e| e.is_active)
            .cloned()
            .collect())
    }

    async fn set_leave_credits(&mut self, employee_id: u64, credits: i64) -> Result<()> {
        let employee = self
            .work
            .employees
            .get_mut(&employee_id)
            .ok_or_else(|| anyhow!("employee {employee_id} vanished"))?;
        employee.leave_credits = credits;
        Ok(())
    }

    async fn attendance(
        &mut self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        Ok(self.work.attendance.get(&(employee_id, date)).cloned())
    }

    async fn attendance_on(&mut self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .work
            .attendance
            .values()
            .filter(|r| r.date == date)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.time_in);
        Ok(records)
    }

    async fn attendance_between(
        &mut self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        Ok(self
            .work
            .attendance
            .range((employee_id, from)..=(employee_id, to))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn open_attendance_before(&mut self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        Ok(self
            .work
            .attendance
            .values()
            .filter(|r| r.date < date && !r.is_closed())
            .cloned()
            .collect())
    }

    async fn open_attendance_of(
        &mut self,
        employee_id: u64,
        before: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        Ok(self
            .work
            .attendance
            .range((employee_id, NaiveDate::MIN)..(employee_id, before))
            .map(|(_, r)| r)
            .filter(|r| !r.is_closed())
            .cloned()
            .collect())
    }

    async fn insert_attendance(&mut self, record: &AttendanceRecord) -> Result<Option<u64>> {
        let key = (record.employee_id, record.date);
        if self.work.attendance.contains_key(&key) {
            return Ok(None);
        }
        self.work.next_attendance_id += 1;
        let id = self.work.next_attendance_id;
        let mut stored = record.clone();
        stored.id = id;
        self.work.attendance.insert(key, stored);
        Ok(Some(id))
    }

    async fn update_attendance(&mut self, record: &AttendanceRecord) -> Result<()> {
        let slot = self
            .work
            .attendance
            .get_mut(&(record.employee_id, record.date))
            .ok_or_else(|| anyhow!("attendance {} vanished", record.id))?;
        *slot = record.clone();
        Ok(())
    }

    async fn request_owner(&mut self, id: u64) -> Result<Option<u64>> {
        Ok(self.work.requests.get(&id).map(|r| r.employee_id))
    }

    async fn request(&mut self, id: u64) -> Result<Option<RequestRecord>> {
        Ok(self.work.requests.get(&id).cloned())
    }

    async fn find_requests(&mut self, filter: &RequestFilter) -> Result<Vec<RequestRecord>> {
        Ok(self
            .work
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn lock_requests(&mut self, filter: &RequestFilter) -> Result<Vec<RequestRecord>> {
        // the whole store is already held by this transaction
        self.find_requests(filter).await
    }

    async fn insert_request(&mut self, record: &RequestRecord) -> Result<Option<u64>> {
        if let Some(key) = late_consideration_key(record) {
            let taken = self
                .work
                .requests
                .values()
                .filter(|r| r.kind() == RequestKind::LateConsideration)
                .any(|r| late_consideration_key(r) == Some(key));
            if taken {
                return Ok(None);
            }
        }
        self.work.next_request_id += 1;
        let id = self.work.next_request_id;
        let mut stored = record.clone();
        stored.id = id;
        self.work.requests.insert(id, stored);
        Ok(Some(id))
    }

    async fn record_review(&mut self, record: &RequestRecord) -> Result<()> {
        let slot = self.request_mut(record.id)?;
        slot.status = record.status;
        slot.review = record.review.clone();
        Ok(())
    }

    async fn set_actual_overtime(&mut self, id: u64, hours: f64) -> Result<()> {
        if let RequestPayload::Overtime {
            actual_overtime, ..
        } = &mut self.request_mut(id)?.payload
        {
            *actual_overtime = Some(hours);
        }
        Ok(())
    }

    async fn set_notified(&mut self, id: u64) -> Result<()> {
        self.request_mut(id)?.employee_notified = true;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
