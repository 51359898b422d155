use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use streamgate_core::{
    ClientMeta, EndUserId, MonthlyUsageRecord, PeriodKey, TenantCode, UsageKey,
};
use streamgate_store::{InsertOutcome, StoreError, UsageLedger};

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;

const COLUMNS: &str = "tenant_code, end_user_id, period_key, first_seen_at, last_seen_at, \
                       user_agent, ip_address, is_active";

type UsageRow = (
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    String,
    String,
    bool,
);

fn decode_row(row: UsageRow) -> Result<MonthlyUsageRecord, StoreError> {
    let (tenant, end_user, period, first_seen_at, last_seen_at, user_agent, ip_address, is_active) =
        row;
    let period: PeriodKey = period
        .parse()
        .map_err(|e| StoreError::Serialization(format!("bad period_key {period:?}: {e}")))?;
    Ok(MonthlyUsageRecord {
        tenant: TenantCode::new(tenant),
        end_user: EndUserId::new(end_user),
        period,
        first_seen_at,
        last_seen_at,
        client_meta: ClientMeta::new(user_agent, ip_address),
        is_active,
    })
}

/// PostgreSQL-backed implementation of [`UsageLedger`].
///
/// Row uniqueness is the table's `UNIQUE (tenant_code, end_user_id,
/// period_key)` constraint; `insert` uses `ON CONFLICT DO NOTHING` and
/// reports a conflict as [`InsertOutcome::AlreadyExists`].
pub struct PostgresUsageLedger {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresUsageLedger {
    /// Connect, create the pool, and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if pool creation fails, or
    /// [`StoreError::Backend`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        let pool = pool::connect(&config).await?;
        Self::from_pool(pool, config).await
    }

    /// Build a ledger over an existing pool. Runs migrations on creation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if migrations fail.
    pub async fn from_pool(pool: PgPool, config: PostgresConfig) -> Result<Self, StoreError> {
        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    /// The underlying pool, for sharing with the tenant directory.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UsageLedger for PostgresUsageLedger {
    async fn find(&self, key: &UsageKey) -> Result<Option<MonthlyUsageRecord>, StoreError> {
        let table = self.config.usage_table();
        let query = format!(
            "SELECT {COLUMNS} FROM {table} \
             WHERE tenant_code = $1 AND end_user_id = $2 AND period_key = $3"
        );

        let row: Option<UsageRow> = sqlx::query_as(&query)
            .bind(key.tenant.as_str())
            .bind(key.end_user.as_str())
            .bind(key.period.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(decode_row).transpose()
    }

    async fn insert(&self, record: &MonthlyUsageRecord) -> Result<InsertOutcome, StoreError> {
        let table = self.config.usage_table();
        let query = format!(
            "INSERT INTO {table} ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (tenant_code, end_user_id, period_key) DO NOTHING"
        );

        let result = sqlx::query(&query)
            .bind(record.tenant.as_str())
            .bind(record.end_user.as_str())
            .bind(record.period.to_string())
            .bind(record.first_seen_at)
            .bind(record.last_seen_at)
            .bind(&record.client_meta.user_agent)
            .bind(&record.client_meta.ip_address)
            .bind(record.is_active)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() > 0 {
            Ok(InsertOutcome::Inserted)
        } else {
            debug!(key = %record.key(), "usage row already exists");
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    async fn touch(
        &self,
        key: &UsageKey,
        seen_at: DateTime<Utc>,
        client_meta: &ClientMeta,
    ) -> Result<Option<MonthlyUsageRecord>, StoreError> {
        let table = self.config.usage_table();
        let query = format!(
            "UPDATE {table} SET \
                 last_seen_at = GREATEST(last_seen_at, $4), \
                 user_agent = CASE WHEN $5 = '' THEN user_agent ELSE $5 END, \
                 ip_address = CASE WHEN $6 = '' THEN ip_address ELSE $6 END \
             WHERE tenant_code = $1 AND end_user_id = $2 AND period_key = $3 \
             RETURNING {COLUMNS}"
        );

        let row: Option<UsageRow> = sqlx::query_as(&query)
            .bind(key.tenant.as_str())
            .bind(key.end_user.as_str())
            .bind(key.period.to_string())
            .bind(seen_at)
            .bind(&client_meta.user_agent)
            .bind(&client_meta.ip_address)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(decode_row).transpose()
    }

    async fn count_active(
        &self,
        tenant: &TenantCode,
        period: &PeriodKey,
    ) -> Result<u64, StoreError> {
        let table = self.config.usage_table();
        let query = format!(
            "SELECT COUNT(*) FROM {table} \
             WHERE tenant_code = $1 AND period_key = $2 AND is_active"
        );

        let (count,): (i64,) = sqlx::query_as(&query)
            .bind(tenant.as_str())
            .bind(period.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        u64::try_from(count).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn list_active(
        &self,
        tenant: &TenantCode,
        period: &PeriodKey,
    ) -> Result<Vec<MonthlyUsageRecord>, StoreError> {
        let table = self.config.usage_table();
        let query = format!(
            "SELECT {COLUMNS} FROM {table} \
             WHERE tenant_code = $1 AND period_key = $2 AND is_active \
             ORDER BY last_seen_at DESC, end_user_id ASC"
        );

        let rows: Vec<UsageRow> = sqlx::query_as(&query)
            .bind(tenant.as_str())
            .bind(period.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.into_iter().map(decode_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(period: &str) -> UsageRow {
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
        (
            "042".into(),
            "alice".into(),
            period.into(),
            t,
            t,
            "VLC".into(),
            "10.0.0.1".into(),
            true,
        )
    }

    #[test]
    fn decodes_row() {
        let rec = decode_row(row("2024-07")).unwrap();
        assert_eq!(rec.tenant.as_str(), "042");
        assert_eq!(rec.period.to_string(), "2024-07");
        assert_eq!(rec.client_meta, ClientMeta::new("VLC", "10.0.0.1"));
    }

    #[test]
    fn bad_period_is_a_serialization_error() {
        let err = decode_row(row("July")).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    fn test_config() -> PostgresConfig {
        PostgresConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/streamgate_test".to_string()),
            table_prefix: format!("test_{}_", std::process::id()),
            ..PostgresConfig::default()
        }
    }

    #[tokio::test]
    async fn ledger_conformance() {
        let ledger = PostgresUsageLedger::new(test_config())
            .await
            .expect("pool creation should succeed");
        streamgate_store::testing::run_ledger_conformance_tests(&ledger)
            .await
            .expect("conformance tests should pass");
    }
}
