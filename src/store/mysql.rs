use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::mysql::MySqlArguments;
use sqlx::query::QueryAs;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

use crate::model::attendance::AttendanceRecord;
use crate::model::employee::EmployeeAccount;
use crate::model::request::{RequestFilter, RequestPayload, RequestRecord, Review};
use crate::model::shift::ShiftPolicy;
use crate::store::{Store, StoreTx};

const SHIFT_COLUMNS: &str = "s.id, s.name, s.start_time, s.end_time, s.work_hours_target, \
     s.grace_period_mins, s.min_hours_before_lunch, s.is_default, s.is_active";

const EMPLOYEE_COLUMNS: &str =
    "id, employee_code, full_name, leave_credits, shift_id, is_active";

const ATTENDANCE_COLUMNS: &str = "id, employee_id, date, shift_id, time_in, lunch_start, \
     lunch_end, time_out, total_time, lunch_duration, paid_hours, overtime_hours, \
     timeliness, completeness";

const REQUEST_COLUMNS: &str = "id, employee_id, kind, status, reason, evidence_reference, \
     leave_type, start_date, end_date, days_count, request_date, hours_requested, \
     actual_overtime, attendance_date, reviewed_by, reviewed_at, remarks, \
     employee_notified, created_at";

/// Duplicate key. MySQL reports it as SQLSTATE 23000.
fn is_duplicate(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

/// MySQL-backed store. Row locks come from `SELECT ... FOR UPDATE` inside
/// the operation's transaction.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx + '_>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to open transaction")?;
        Ok(Box::new(MySqlTx { tx }))
    }

    async fn assigned_shift(&self, employee_id: u64) -> Result<Option<ShiftPolicy>> {
        let sql = format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts s \
             INNER JOIN employees e ON e.shift_id = s.id \
             WHERE e.id = ? AND s.is_active = 1"
        );
        let shift = sqlx::query_as::<_, ShiftPolicy>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch employee shift")?;
        Ok(shift)
    }

    async fn default_shift(&self) -> Result<Option<ShiftPolicy>> {
        let sql = format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts s \
             WHERE s.is_active = 1 \
             ORDER BY s.is_default DESC, s.id \
             LIMIT 1"
        );
        let shift = sqlx::query_as::<_, ShiftPolicy>(&sql)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch default shift")?;
        Ok(shift)
    }
}

struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    shift_id: Option<u64>,
    time_in: Option<NaiveDateTime>,
    lunch_start: Option<NaiveDateTime>,
    lunch_end: Option<NaiveDateTime>,
    time_out: Option<NaiveDateTime>,
    total_time: Option<f64>,
    lunch_duration: Option<f64>,
    paid_hours: Option<f64>,
    overtime_hours: f64,
    timeliness: Option<String>,
    completeness: Option<String>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = anyhow::Error;

    fn try_from(row: AttendanceRow) -> Result<Self> {
        let timeliness = row
            .timeliness
            .as_deref()
            .map(str::parse)
            .transpose()
            .with_context(|| format!("attendance {}: bad timeliness", row.id))?;
        let completeness = row
            .completeness
            .as_deref()
            .map(str::parse)
            .transpose()
            .with_context(|| format!("attendance {}: bad completeness", row.id))?;
        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            shift_id: row.shift_id,
            time_in: row.time_in,
            lunch_start: row.lunch_start,
            lunch_end: row.lunch_end,
            time_out: row.time_out,
            total_time: row.total_time,
            lunch_duration: row.lunch_duration,
            paid_hours: row.paid_hours,
            overtime_hours: row.overtime_hours,
            timeliness,
            completeness,
        })
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    employee_id: u64,
    kind: String,
    status: String,
    reason: String,
    evidence_reference: Option<String>,
    leave_type: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    days_count: Option<i64>,
    request_date: Option<NaiveDate>,
    hours_requested: Option<f64>,
    actual_overtime: Option<f64>,
    attendance_date: Option<NaiveDate>,
    reviewed_by: Option<u64>,
    reviewed_at: Option<NaiveDateTime>,
    remarks: Option<String>,
    employee_notified: bool,
    created_at: NaiveDateTime,
}

impl TryFrom<RequestRow> for RequestRecord {
    type Error = anyhow::Error;

    fn try_from(row: RequestRow) -> Result<Self> {
        let id = row.id;
        let missing = |column: &str| anyhow!("request {id}: {column} is NULL");

        let payload = match row.kind.as_str() {
            "Leave" => RequestPayload::Leave {
                leave_type: row
                    .leave_type
                    .as_deref()
                    .ok_or_else(|| missing("leave_type"))?
                    .parse()
                    .with_context(|| format!("request {id}: bad leave_type"))?,
                start_date: row.start_date.ok_or_else(|| missing("start_date"))?,
                end_date: row.end_date.ok_or_else(|| missing("end_date"))?,
                days_count: row.days_count.ok_or_else(|| missing("days_count"))?,
                reason: row.reason,
                evidence_reference: row.evidence_reference,
            },
            "Overtime" => RequestPayload::Overtime {
                request_date: row.request_date.ok_or_else(|| missing("request_date"))?,
                hours_requested: row
                    .hours_requested
                    .ok_or_else(|| missing("hours_requested"))?,
                reason: row.reason,
                actual_overtime: row.actual_overtime,
            },
            "LateConsideration" => RequestPayload::LateConsideration {
                attendance_date: row
                    .attendance_date
                    .ok_or_else(|| missing("attendance_date"))?,
                reason: row.reason,
                evidence_reference: row.evidence_reference,
            },
            other => return Err(anyhow!("request {id}: unknown kind {other}")),
        };

        let review = match (row.reviewed_by, row.reviewed_at) {
            (Some(reviewed_by), Some(reviewed_at)) => Some(Review {
                reviewed_by,
                reviewed_at,
                remarks: row.remarks,
            }),
            _ => None,
        };

        Ok(RequestRecord {
            id,
            employee_id: row.employee_id,
            status: row
                .status
                .parse()
                .with_context(|| format!("request {id}: bad status"))?,
            review,
            employee_notified: row.employee_notified,
            created_at: row.created_at,
            payload,
        })
    }
}

/// Flat column view of a request's kind-specific fields.
#[derive(Default)]
struct PayloadColumns<'a> {
    reason: &'a str,
    evidence_reference: Option<&'a str>,
    leave_type: Option<&'a str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    days_count: Option<i64>,
    request_date: Option<NaiveDate>,
    hours_requested: Option<f64>,
    actual_overtime: Option<f64>,
    attendance_date: Option<NaiveDate>,
}

impl<'a> From<&'a RequestPayload> for PayloadColumns<'a> {
    fn from(payload: &'a RequestPayload) -> Self {
        match payload {
            RequestPayload::Leave {
                leave_type,
                start_date,
                end_date,
                days_count,
                reason,
                evidence_reference,
            } => PayloadColumns {
                reason,
                evidence_reference: evidence_reference.as_deref(),
                leave_type: Some(leave_type.as_ref()),
                start_date: Some(*start_date),
                end_date: Some(*end_date),
                days_count: Some(*days_count),
                ..Default::default()
            },
            RequestPayload::Overtime {
                request_date,
                hours_requested,
                reason,
                actual_overtime,
            } => PayloadColumns {
                reason,
                request_date: Some(*request_date),
                hours_requested: Some(*hours_requested),
                actual_overtime: *actual_overtime,
                ..Default::default()
            },
            RequestPayload::LateConsideration {
                attendance_date,
                reason,
                evidence_reference,
            } => PayloadColumns {
                reason,
                evidence_reference: evidence_reference.as_deref(),
                attendance_date: Some(*attendance_date),
                ..Default::default()
            },
        }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Date(NaiveDate),
}

fn bind_filters<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    args: Vec<FilterValue<'q>>,
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for arg in args {
        query = match arg {
            FilterValue::U64(v) => query.bind(v),
            FilterValue::Str(s) => query.bind(s),
            FilterValue::Date(d) => query.bind(d),
        };
    }
    query
}

impl MySqlTx {
    async fn fetch_attendance(
        &mut self,
        where_sql: &str,
        args: Vec<FilterValue<'_>>,
    ) -> Result<Vec<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance {where_sql}");
        let rows = bind_filters(sqlx::query_as::<_, AttendanceRow>(&sql), args)
            .fetch_all(&mut *self.tx)
            .await
            .context("Failed to fetch attendance")?;
        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn select_requests(
        &mut self,
        filter: &RequestFilter,
        lock: bool,
    ) -> Result<Vec<RequestRecord>> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(kind) = &filter.kind {
            where_sql.push_str(" AND kind = ?");
            args.push(FilterValue::Str(kind.as_ref()));
        }
        if let Some(status) = &filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.as_ref()));
        }
        if let Some(date) = filter.concerning {
            where_sql.push_str(
                " AND ((start_date <= ? AND end_date >= ?) OR request_date = ? OR attendance_date = ?)",
            );
            args.extend([
                FilterValue::Date(date),
                FilterValue::Date(date),
                FilterValue::Date(date),
                FilterValue::Date(date),
            ]);
        }
        if filter.unnotified_only {
            where_sql.push_str(" AND status <> 'Pending' AND employee_notified = 0");
        }

        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM requests{where_sql} ORDER BY id{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        let rows = bind_filters(sqlx::query_as::<_, RequestRow>(&sql), args)
            .fetch_all(&mut *self.tx)
            .await
            .context("Failed to fetch requests")?;
        rows.into_iter().map(RequestRecord::try_from).collect()
    }
}

#[async_trait]
impl StoreTx for MySqlTx {
    async fn employee(&mut self, id: u64) -> Result<Option<EmployeeAccount>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ? FOR UPDATE");
        let employee = sqlx::query_as::<_, EmployeeAccount>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch employee")?;
        Ok(employee)
    }

    async fn active_employees(&mut self) -> Result<Vec<EmployeeAccount>> {
        let sql =
            format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE is_active = 1 ORDER BY id");
        let employees = sqlx::query_as::<_, EmployeeAccount>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .context("Failed to fetch employees")?;
        Ok(employees)
    }

    async fn set_leave_credits(&mut self, employee_id: u64, credits: i64) -> Result<()> {
        sqlx::query("UPDATE employees SET leave_credits = ? WHERE id = ?")
            .bind(credits)
            .bind(employee_id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to update leave credits")?;
        Ok(())
    }

    async fn attendance(
        &mut self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let mut records = self
            .fetch_attendance(
                "WHERE employee_id = ? AND date = ? FOR UPDATE",
                vec![FilterValue::U64(employee_id), FilterValue::Date(date)],
            )
            .await?;
        Ok(records.pop())
    }

    async fn attendance_on(&mut self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        self.fetch_attendance(
            "WHERE date = ? ORDER BY time_in",
            vec![FilterValue::Date(date)],
        )
        .await
    }

    async fn attendance_between(
        &mut self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        self.fetch_attendance(
            "WHERE employee_id = ? AND date BETWEEN ? AND ? ORDER BY date",
            vec![
                FilterValue::U64(employee_id),
                FilterValue::Date(from),
                FilterValue::Date(to),
            ],
        )
        .await
    }

    async fn open_attendance_before(&mut self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        self.fetch_attendance(
            "WHERE date < ? AND time_out IS NULL AND completeness IS NULL FOR UPDATE",
            vec![FilterValue::Date(date)],
        )
        .await
    }

    async fn open_attendance_of(
        &mut self,
        employee_id: u64,
        before: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        // served by the (employee_id, date) unique key
        self.fetch_attendance(
            "WHERE employee_id = ? AND date < ? AND time_out IS NULL AND completeness IS NULL \
             FOR UPDATE",
            vec![FilterValue::U64(employee_id), FilterValue::Date(before)],
        )
        .await
    }

    async fn insert_attendance(&mut self, record: &AttendanceRecord) -> Result<Option<u64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, date, shift_id, time_in, timeliness, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.shift_id)
        .bind(record.time_in)
        .bind(record.timeliness.map(|t| t.to_string()))
        .bind(record.status().to_string())
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_id())),
            Err(e) if is_duplicate(&e) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert attendance")),
        }
    }

    async fn update_attendance(&mut self, record: &AttendanceRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE attendance
            SET shift_id = ?, time_in = ?, lunch_start = ?, lunch_end = ?, time_out = ?,
                total_time = ?, lunch_duration = ?, paid_hours = ?, overtime_hours = ?,
                timeliness = ?, completeness = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(record.shift_id)
        .bind(record.time_in)
        .bind(record.lunch_start)
        .bind(record.lunch_end)
        .bind(record.time_out)
        .bind(record.total_time)
        .bind(record.lunch_duration)
        .bind(record.paid_hours)
        .bind(record.overtime_hours)
        .bind(record.timeliness.map(|t| t.to_string()))
        .bind(record.completeness.map(|c| c.to_string()))
        .bind(record.status().to_string())
        .bind(record.id)
        .execute(&mut *self.tx)
        .await
        .context("Failed to update attendance")?;
        Ok(())
    }

    async fn request_owner(&mut self, id: u64) -> Result<Option<u64>> {
        let owner: Option<(u64,)> = sqlx::query_as("SELECT employee_id FROM requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch request owner")?;
        Ok(owner.map(|(employee_id,)| employee_id))
    }

    async fn request(&mut self, id: u64) -> Result<Option<RequestRecord>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ? FOR UPDATE");
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch request")?;
        row.map(RequestRecord::try_from).transpose()
    }

    async fn find_requests(&mut self, filter: &RequestFilter) -> Result<Vec<RequestRecord>> {
        self.select_requests(filter, false).await
    }

    async fn lock_requests(&mut self, filter: &RequestFilter) -> Result<Vec<RequestRecord>> {
        self.select_requests(filter, true).await
    }

    async fn insert_request(&mut self, record: &RequestRecord) -> Result<Option<u64>> {
        let cols = PayloadColumns::from(&record.payload);
        let result = sqlx::query(
            r#"
            INSERT INTO requests
                (employee_id, kind, status, reason, evidence_reference, leave_type,
                 start_date, end_date, days_count, request_date, hours_requested,
                 actual_overtime, attendance_date, employee_notified, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.kind().as_ref())
        .bind(record.status.as_ref())
        .bind(cols.reason)
        .bind(cols.evidence_reference)
        .bind(cols.leave_type)
        .bind(cols.start_date)
        .bind(cols.end_date)
        .bind(cols.days_count)
        .bind(cols.request_date)
        .bind(cols.hours_requested)
        .bind(cols.actual_overtime)
        .bind(cols.attendance_date)
        .bind(record.employee_notified)
        .bind(record.created_at)
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_id())),
            Err(e) if is_duplicate(&e) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert request")),
        }
    }

    async fn record_review(&mut self, record: &RequestRecord) -> Result<()> {
        let review = record.review.as_ref();
        sqlx::query(
            r#"
            UPDATE requests
            SET status = ?, reviewed_by = ?, reviewed_at = ?, remarks = ?
            WHERE id = ?
            "#,
        )
        .bind(record.status.as_ref())
        .bind(review.map(|r| r.reviewed_by))
        .bind(review.map(|r| r.reviewed_at))
        .bind(review.and_then(|r| r.remarks.as_deref()))
        .bind(record.id)
        .execute(&mut *self.tx)
        .await
        .context("Failed to record review")?;
        Ok(())
    }

    async fn set_actual_overtime(&mut self, id: u64, hours: f64) -> Result<()> {
        sqlx::query("UPDATE requests SET actual_overtime = ? WHERE id = ?")
            .bind(hours)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to reconcile overtime")?;
        Ok(())
    }

    async fn set_notified(&mut self, id: u64) -> Result<()> {
        sqlx::query("UPDATE requests SET employee_notified = 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to mark request notified")?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit transaction")?;
        Ok(())
    }
}
