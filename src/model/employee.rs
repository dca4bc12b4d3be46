use serde::{Deserialize, Serialize};

/// The slice of an employee the engine reads: identity, shift assignment and
/// leave-credit balance. Profile CRUD lives outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeAccount {
    pub id: u64,
    pub employee_code: String,
    pub full_name: String,
    /// Whole days of leave left. Only debited by leave approval.
    pub leave_credits: i64,
    pub shift_id: Option<u64>,
    pub is_active: bool,
}

impl EmployeeAccount {
    pub fn new(id: u64, employee_code: &str, full_name: &str, leave_credits: i64) -> Self {
        Self {
            id,
            employee_code: employee_code.to_string(),
            full_name: full_name.to_string(),
            leave_credits,
            shift_id: None,
            is_active: true,
        }
    }

    pub fn with_shift(mut self, shift_id: u64) -> Self {
        self.shift_id = Some(shift_id);
        self
    }
}
