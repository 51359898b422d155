use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use streamgate_core::{ClientMeta, MonthlyUsageRecord, PeriodKey, TenantCode, UsageKey};
use streamgate_store::{InsertOutcome, StoreError, UsageLedger};

/// In-memory [`UsageLedger`] keyed by [`UsageKey`].
///
/// Uniqueness is enforced through the map's entry API, so two concurrent
/// inserts for the same key resolve to one `Inserted` and one
/// `AlreadyExists`.
#[derive(Debug, Default)]
pub struct MemoryUsageLedger {
    rows: DashMap<UsageKey, MonthlyUsageRecord>,
}

impl MemoryUsageLedger {
    /// Create a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows held, active or not.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn active_in(&self, tenant: &TenantCode, period: &PeriodKey) -> Vec<MonthlyUsageRecord> {
        self.rows
            .iter()
            .filter(|r| r.is_active && &r.tenant == tenant && &r.period == period)
            .map(|r| r.value().clone())
            .collect()
    }
}

#[async_trait]
impl UsageLedger for MemoryUsageLedger {
    async fn find(&self, key: &UsageKey) -> Result<Option<MonthlyUsageRecord>, StoreError> {
        Ok(self.rows.get(key).map(|r| r.value().clone()))
    }

    async fn insert(&self, record: &MonthlyUsageRecord) -> Result<InsertOutcome, StoreError> {
        match self.rows.entry(record.key()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(vacant) => {
                vacant.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn touch(
        &self,
        key: &UsageKey,
        seen_at: DateTime<Utc>,
        client_meta: &ClientMeta,
    ) -> Result<Option<MonthlyUsageRecord>, StoreError> {
        Ok(self.rows.get_mut(key).map(|mut row| {
            row.touch(seen_at, client_meta);
            row.value().clone()
        }))
    }

    async fn count_active(
        &self,
        tenant: &TenantCode,
        period: &PeriodKey,
    ) -> Result<u64, StoreError> {
        let count = self
            .rows
            .iter()
            .filter(|r| r.is_active && &r.tenant == tenant && &r.period == period)
            .count();
        Ok(count as u64)
    }

    async fn list_active(
        &self,
        tenant: &TenantCode,
        period: &PeriodKey,
    ) -> Result<Vec<MonthlyUsageRecord>, StoreError> {
        let mut rows = self.active_in(tenant, period);
        rows.sort_by(|a, b| {
            b.last_seen_at
                .cmp(&a.last_seen_at)
                .then_with(|| a.end_user.as_str().cmp(b.end_user.as_str()))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use streamgate_core::EndUserId;
    use streamgate_store::testing::run_ledger_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let ledger = MemoryUsageLedger::new();
        run_ledger_conformance_tests(&ledger)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_create_one_row() {
        let ledger = Arc::new(MemoryUsageLedger::new());
        let key = UsageKey::new(
            TenantCode::new("042"),
            EndUserId::new("alice"),
            "2024-07".parse().unwrap(),
        );
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = Arc::clone(&ledger);
            let record = MonthlyUsageRecord::first_seen(key.clone(), now, ClientMeta::default());
            handles.push(tokio::spawn(async move { ledger.insert(&record).await }));
        }

        let mut inserted = 0;
        for h in handles {
            if h.await.unwrap().unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(ledger.len(), 1);
    }
}
