use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use streamgate_core::{BillingMode, Plan, SessionCeiling, Tenant, TenantCode};
use streamgate_store::{StoreError, TenantDirectory};

use crate::config::PostgresConfig;
use crate::migrations;

type TenantRow = (String, String, bool, Option<String>, Option<i32>, Option<String>);

fn decode_row(row: TenantRow) -> Result<Tenant, StoreError> {
    let (code, endpoint, active, plan_name, session_limit, billing) = row;
    let plan = match plan_name {
        None => Plan::default(),
        Some(name) => {
            let limit = u32::try_from(session_limit.unwrap_or(0))
                .map_err(|e| StoreError::Serialization(format!("bad session_limit: {e}")))?;
            let billing: BillingMode = billing
                .as_deref()
                .unwrap_or("fixed")
                .parse()
                .map_err(|e| StoreError::Serialization(format!("{e}")))?;
            Plan {
                name,
                ceiling: SessionCeiling::from_limit(limit),
                billing,
            }
        }
    };
    Ok(Tenant {
        code: TenantCode::new(code),
        endpoint,
        active,
        plan,
    })
}

/// PostgreSQL-backed [`TenantDirectory`] reading the tenants and plans tables.
///
/// A tenant with no plan resolves to [`Plan::default`].
pub struct PostgresTenantDirectory {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresTenantDirectory {
    /// Build a directory over an existing pool. Runs migrations on creation.
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

    /// Insert or update a tenant together with its plan.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on any database failure.
    pub async fn upsert_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        let plans = self.config.plans_table();
        let tenants = self.config.tenants_table();

        let upsert_plan = format!(
            "INSERT INTO {plans} (name, session_limit, billing) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO UPDATE \
             SET session_limit = EXCLUDED.session_limit, billing = EXCLUDED.billing"
        );
        let upsert_tenant = format!(
            "INSERT INTO {tenants} (code, endpoint, active, plan_name) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (code) DO UPDATE \
             SET endpoint = EXCLUDED.endpoint, active = EXCLUDED.active, \
                 plan_name = EXCLUDED.plan_name"
        );

        let limit = i32::try_from(u32::from(tenant.plan.ceiling))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(&upsert_plan)
            .bind(&tenant.plan.name)
            .bind(limit)
            .bind(tenant.plan.billing.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(&upsert_tenant)
            .bind(tenant.code.as_str())
            .bind(&tenant.endpoint)
            .bind(tenant.active)
            .bind(&tenant.plan.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl TenantDirectory for PostgresTenantDirectory {
    async fn find_tenant(&self, code: &TenantCode) -> Result<Option<Tenant>, StoreError> {
        let plans = self.config.plans_table();
        let tenants = self.config.tenants_table();
        let query = format!(
            "SELECT t.code, t.endpoint, t.active, p.name, p.session_limit, p.billing \
             FROM {tenants} t LEFT JOIN {plans} p ON p.name = t.plan_name \
             WHERE t.code = $1"
        );

        let row: Option<TenantRow> = sqlx::query_as(&query)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(decode_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_plan_falls_back_to_default() {
        let tenant = decode_row(("042".into(), "http://up".into(), true, None, None, None)).unwrap();
        assert_eq!(tenant.plan, Plan::default());
    }

    #[test]
    fn decodes_plan_columns() {
        let tenant = decode_row((
            "abc".into(),
            "http://up".into(),
            false,
            Some("pro".into()),
            Some(2),
            Some("per_session".into()),
        ))
        .unwrap();
        assert_eq!(tenant.code.as_str(), "ABC");
        assert!(!tenant.active);
        assert_eq!(tenant.plan.ceiling.limit(), Some(2));
        assert_eq!(tenant.plan.billing, BillingMode::PerSession);
    }

    #[test]
    fn zero_limit_is_unlimited() {
        let tenant = decode_row((
            "042".into(),
            "http://up".into(),
            true,
            Some("free".into()),
            Some(0),
            None,
        ))
        .unwrap();
        assert_eq!(tenant.plan.ceiling, SessionCeiling::Unlimited);
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;
    use crate::pool;

    #[tokio::test]
    async fn upsert_then_find() {
        let config = PostgresConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/streamgate_test".to_string()),
            table_prefix: format!("test_dir_{}_", std::process::id()),
            ..PostgresConfig::default()
        };
        let pool = pool::connect(&config).await.expect("pool");
        let dir = PostgresTenantDirectory::from_pool(pool, config)
            .await
            .expect("migrations");

        let tenant = Tenant::new(
            "042",
            "http://up.example.com",
            Plan::new("small", SessionCeiling::from_limit(2)),
        );
        dir.upsert_tenant(&tenant).await.unwrap();

        let found = dir.find_tenant(&TenantCode::new("042")).await.unwrap();
        assert_eq!(found, Some(tenant));
        assert!(
            dir.find_tenant(&TenantCode::new("999"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
