use async_trait::async_trait;
use chrono::{DateTime, Utc};

use streamgate_core::{ClientMeta, MonthlyUsageRecord, PeriodKey, TenantCode, UsageKey};

use crate::error::StoreError;

/// Result of attempting to create a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was created.
    Inserted,
    /// A row with the same (tenant, end-user, period) already exists; nothing
    /// was written.
    AlreadyExists,
}

/// Persistent store of [`MonthlyUsageRecord`]s.
///
/// Implementations must enforce uniqueness of
/// (`tenant`, `end_user`, `period`): a concurrent `insert` for an existing
/// key reports [`InsertOutcome::AlreadyExists`] rather than creating a
/// second row.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Look up the row for a key.
    async fn find(&self, key: &UsageKey) -> Result<Option<MonthlyUsageRecord>, StoreError>;

    /// Create a row if none exists for its key.
    async fn insert(&self, record: &MonthlyUsageRecord) -> Result<InsertOutcome, StoreError>;

    /// Refresh `last_seen_at` (never moving it backwards) and client meta.
    /// Returns the updated row, or `None` if the key has no row.
    async fn touch(
        &self,
        key: &UsageKey,
        seen_at: DateTime<Utc>,
        client_meta: &ClientMeta,
    ) -> Result<Option<MonthlyUsageRecord>, StoreError>;

    /// Count active rows for a tenant in a period.
    async fn count_active(&self, tenant: &TenantCode, period: &PeriodKey)
    -> Result<u64, StoreError>;

    /// Active rows for a tenant in a period, most recently seen first.
    async fn list_active(
        &self,
        tenant: &TenantCode,
        period: &PeriodKey,
    ) -> Result<Vec<MonthlyUsageRecord>, StoreError>;
}
