use std::sync::Arc;

use streamgate_core::Tenant;
use streamgate_store::{TenantDirectory, UsageLedger};
use streamgate_store_memory::{MemoryTenantDirectory, MemoryUsageLedger};
#[cfg(feature = "postgres")]
use streamgate_store_postgres::{PostgresConfig, PostgresTenantDirectory, PostgresUsageLedger};
use tracing::info;

use crate::config::{LedgerConfig, TenantConfig};
use crate::error::ServerError;

/// The persistent half of the gateway: usage ledger plus the tenant
/// directory that lives next to it.
pub struct LedgerBackend {
    pub ledger: Arc<dyn UsageLedger>,
    pub tenants: Arc<dyn TenantDirectory>,
}

/// Create the usage ledger and tenant directory.
///
/// For the postgres backend this also runs the schema migrations and
/// upserts the statically configured tenants.
#[allow(clippy::unused_async)]
pub async fn create_ledger(
    config: &LedgerConfig,
    tenants: &[TenantConfig],
) -> Result<LedgerBackend, ServerError> {
    match config.backend.as_str() {
        "memory" => {
            let directory: MemoryTenantDirectory = tenants.iter().map(Tenant::from).collect();
            info!(tenants = directory.len(), "memory tenant directory loaded");
            Ok(LedgerBackend {
                ledger: Arc::new(MemoryUsageLedger::new()),
                tenants: Arc::new(directory),
            })
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = config.url.as_deref().ok_or_else(|| {
                ServerError::Config("postgres ledger backend requires [ledger] url".into())
            })?;

            let pg_config = PostgresConfig {
                url: url.to_owned(),
                pool_size: config.pool_size,
                schema: config.schema.clone(),
                table_prefix: config.table_prefix.clone(),
                ssl_mode: config.ssl_mode.clone(),
                ssl_root_cert: config.ssl_root_cert.clone(),
            };

            let pool = streamgate_store_postgres::connect(&pg_config)
                .await
                .map_err(|e| ServerError::Config(format!("ledger postgres: {e}")))?;
            let ledger = PostgresUsageLedger::from_pool(pool.clone(), pg_config.clone())
                .await
                .map_err(|e| ServerError::Config(format!("ledger postgres: {e}")))?;
            let directory = PostgresTenantDirectory::from_pool(pool, pg_config)
                .await
                .map_err(|e| ServerError::Config(format!("tenant directory postgres: {e}")))?;

            for tenant in tenants {
                directory
                    .upsert_tenant(&Tenant::from(tenant))
                    .await
                    .map_err(|e| {
                        ServerError::Config(format!("tenant {} upsert: {e}", tenant.code))
                    })?;
            }
            info!(tenants = tenants.len(), "configured tenants upserted");

            Ok(LedgerBackend {
                ledger: Arc::new(ledger),
                tenants: Arc::new(directory),
            })
        }
        other => Err(ServerError::Config(format!(
            "unknown ledger backend: {other} (is the feature enabled?)"
        ))),
    }
}
