use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

use streamgate_store::StoreError;

use crate::config::PostgresConfig;

fn build_connect_options(config: &PostgresConfig) -> Result<PgConnectOptions, StoreError> {
    let mut options: PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| StoreError::Connection(e.to_string()))?;

    if let Some(ref mode) = config.ssl_mode {
        let ssl_mode = match mode.as_str() {
            "disable" => PgSslMode::Disable,
            "prefer" => PgSslMode::Prefer,
            "require" => PgSslMode::Require,
            "verify-ca" => PgSslMode::VerifyCa,
            "verify-full" => PgSslMode::VerifyFull,
            other => {
                return Err(StoreError::Connection(format!("unknown ssl_mode: {other}")));
            }
        };
        options = options.ssl_mode(ssl_mode);
    }

    if let Some(ref path) = config.ssl_root_cert {
        options = options.ssl_root_cert(path);
    }

    Ok(options)
}

/// Open a connection pool for the configured database.
///
/// The ledger and the tenant directory can share the returned pool.
///
/// # Errors
///
/// Returns [`StoreError::Connection`] if the URL is invalid or the pool
/// cannot connect.
pub async fn connect(config: &PostgresConfig) -> Result<PgPool, StoreError> {
    let options = build_connect_options(config)?;
    PgPoolOptions::new()
        .max_connections(config.pool_size)
        .connect_with(options)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
}
