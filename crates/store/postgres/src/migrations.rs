use sqlx::PgPool;

use crate::config::PostgresConfig;

/// Run database migrations, creating required tables if they do not exist.
///
/// Creates the plans, tenants and monthly usage tables in the configured
/// schema with the configured table prefix. Safe to run repeatedly.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let plans_table = config.plans_table();
    let tenants_table = config.tenants_table();
    let usage_table = config.usage_table();

    // session_limit 0 = unlimited.
    let create_plans = format!(
        "CREATE TABLE IF NOT EXISTS {plans_table} (
            name TEXT PRIMARY KEY,
            session_limit INTEGER NOT NULL DEFAULT 0 CHECK (session_limit >= 0),
            billing TEXT NOT NULL DEFAULT 'fixed'
        )"
    );

    let create_tenants = format!(
        "CREATE TABLE IF NOT EXISTS {tenants_table} (
            code TEXT PRIMARY KEY,
            endpoint TEXT NOT NULL,
            active BOOLEAN NOT NULL DEFAULT TRUE,
            plan_name TEXT REFERENCES {plans_table} (name)
        )"
    );

    let create_usage = format!(
        "CREATE TABLE IF NOT EXISTS {usage_table} (
            tenant_code TEXT NOT NULL,
            end_user_id TEXT NOT NULL,
            period_key TEXT NOT NULL,
            first_seen_at TIMESTAMPTZ NOT NULL,
            last_seen_at TIMESTAMPTZ NOT NULL,
            user_agent TEXT NOT NULL DEFAULT '',
            ip_address TEXT NOT NULL DEFAULT '',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            UNIQUE (tenant_code, end_user_id, period_key)
        )"
    );

    let create_usage_idx = format!(
        "CREATE INDEX IF NOT EXISTS {}monthly_usage_period_idx \
         ON {usage_table} (tenant_code, period_key, is_active)",
        config.table_prefix
    );

    sqlx::query(&create_plans).execute(pool).await?;
    sqlx::query(&create_tenants).execute(pool).await?;
    sqlx::query(&create_usage).execute(pool).await?;
    sqlx::query(&create_usage_idx).execute(pool).await?;

    Ok(())
}
