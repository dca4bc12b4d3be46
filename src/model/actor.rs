use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::role::Role;

/// Already-authenticated caller of an engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: u64,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: u64, employee_id: Option<u64>, role: Role) -> Self {
        Self {
            user_id,
            employee_id,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_reviewer(&self) -> bool {
        self.role.is_reviewer()
    }

    fn owns(&self, employee_id: u64) -> bool {
        self.employee_id == Some(employee_id)
    }

    pub fn require_admin(&self) -> EngineResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(EngineError::denied("Admin only"))
        }
    }

    pub fn require_reviewer(&self) -> EngineResult<()> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(EngineError::denied("HR/Admin only"))
        }
    }

    /// Attendance actions, submissions and notification acks.
    pub fn require_self_or_admin(&self, employee_id: u64) -> EngineResult<()> {
        if self.is_admin() || self.owns(employee_id) {
            Ok(())
        } else {
            Err(EngineError::denied(format!(
                "user {} may not act for employee {employee_id}",
                self.user_id
            )))
        }
    }

    /// Read access to one employee's data.
    pub fn require_self_or_reviewer(&self, employee_id: u64) -> EngineResult<()> {
        if self.is_reviewer() || self.owns(employee_id) {
            Ok(())
        } else {
            Err(EngineError::denied(format!(
                "user {} may not view employee {employee_id}",
                self.user_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_and_admin_may_act() {
        let admin = Actor::new(1, None, Role::Admin);
        let hr = Actor::new(2, Some(20), Role::Hr);
        let emp = Actor::new(3, Some(30), Role::Employee);

        assert!(admin.require_self_or_admin(30).is_ok());
        assert!(emp.require_self_or_admin(30).is_ok());
        assert!(emp.require_self_or_admin(31).is_err());
        assert!(hr.require_self_or_admin(30).is_err());

        assert!(hr.require_self_or_reviewer(30).is_ok());
        assert!(emp.require_reviewer().is_err());
        assert!(matches!(
            emp.require_admin(),
            Err(EngineError::PermissionDenied(_))
        ));
    }
}
