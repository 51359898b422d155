use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use streamgate_core::{ClientMeta, MonthlyUsageRecord, PeriodKey, TenantCode, UsageKey};
use streamgate_store::{CacheStore, InsertOutcome, StoreError, UsageLedger};

/// A [`CacheStore`] whose every call fails, for exercising degraded paths.
#[derive(Debug, Clone, Default)]
pub struct UnavailableCacheStore;

#[async_trait]
impl CacheStore for UnavailableCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Connection("cache unavailable".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Connection("cache unavailable".into()))
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Connection("cache unavailable".into()))
    }
}

/// A [`UsageLedger`] whose every call fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableUsageLedger;

#[async_trait]
impl UsageLedger for UnavailableUsageLedger {
    async fn find(&self, _key: &UsageKey) -> Result<Option<MonthlyUsageRecord>, StoreError> {
        Err(StoreError::Connection("ledger unavailable".into()))
    }

    async fn insert(&self, _record: &MonthlyUsageRecord) -> Result<InsertOutcome, StoreError> {
        Err(StoreError::Connection("ledger unavailable".into()))
    }

    async fn touch(
        &self,
        _key: &UsageKey,
        _seen_at: DateTime<Utc>,
        _client_meta: &ClientMeta,
    ) -> Result<Option<MonthlyUsageRecord>, StoreError> {
        Err(StoreError::Connection("ledger unavailable".into()))
    }

    async fn count_active(
        &self,
        _tenant: &TenantCode,
        _period: &PeriodKey,
    ) -> Result<u64, StoreError> {
        Err(StoreError::Connection("ledger unavailable".into()))
    }

    async fn list_active(
        &self,
        _tenant: &TenantCode,
        _period: &PeriodKey,
    ) -> Result<Vec<MonthlyUsageRecord>, StoreError> {
        Err(StoreError::Connection("ledger unavailable".into()))
    }
}
