use std::time::Duration;

use moka::future::Cache;

use crate::error::{EngineError, EngineResult};
use crate::model::shift::ShiftPolicy;
use crate::store::Store;

/// Resolves the shift governing an employee, caching the answer per employee.
///
/// Resolution order: the employee's assigned active shift, then the default
/// shift, then the first active shift.
pub struct ShiftResolver {
    cache: Cache<u64, ShiftPolicy>,
}

impl ShiftResolver {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(50_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Must not be called while a transaction on `store` is open.
    pub async fn resolve(&self, store: &dyn Store, employee_id: u64) -> EngineResult<ShiftPolicy> {
        if let Some(shift) = self.cache.get(&employee_id).await {
            return Ok(shift);
        }

        let shift = match store.assigned_shift(employee_id).await? {
            Some(shift) => shift,
            None => store
                .default_shift()
                .await?
                .ok_or_else(|| EngineError::not_found("no active shift is configured"))?,
        };

        tracing::debug!(employee_id, shift = %shift.name, "Resolved shift");
        self.cache.insert(employee_id, shift.clone()).await;
        Ok(shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::EmployeeAccount;
    use crate::store::MemoryStore;
    use chrono::NaiveTime;

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[actix_web::test]
    async fn assignment_wins_over_default_and_is_cached() {
        let store = MemoryStore::new();
        store
            .insert_shift(ShiftPolicy::new(1, "Regular", t(8), t(17)).as_default())
            .await;
        store
            .insert_shift(ShiftPolicy::new(2, "Night", t(22), t(7)))
            .await;
        store
            .insert_employee(EmployeeAccount::new(5, "EMP005", "Rosa Diaz", 10).with_shift(2))
            .await;
        store
            .insert_employee(EmployeeAccount::new(6, "EMP006", "Ben Ong", 10))
            .await;

        let resolver = ShiftResolver::new(Duration::from_secs(60));
        assert_eq!(resolver.resolve(&store, 5).await.unwrap().name, "Night");
        assert_eq!(resolver.resolve(&store, 6).await.unwrap().name, "Regular");

        // served from cache even after the assignment changes underneath
        store
            .insert_employee(EmployeeAccount::new(5, "EMP005", "Rosa Diaz", 10))
            .await;
        assert_eq!(resolver.resolve(&store, 5).await.unwrap().name, "Night");
    }

    #[actix_web::test]
    async fn no_shift_at_all_is_not_found() {
        let store = MemoryStore::new();
        let resolver = ShiftResolver::new(Duration::from_secs(60));
        assert!(matches!(
            resolver.resolve(&store, 1).await,
            Err(EngineError::NotFound(_))
        ));
    }
}
