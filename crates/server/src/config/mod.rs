mod cache;
mod ledger;
mod server;
mod telemetry;
mod tenants;


pub use cache::*;
pub use ledger::*;
pub use server::*;
pub use telemetry::*;
pub use tenants::*;

use serde::Deserialize;
use streamgate_upstream::UpstreamConfig;

/// Top-level configuration for the streamgate server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct StreamgateConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Catalog cache backend and freshness windows.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Usage ledger backend.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Upstream content provider client.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Log output configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Static tenant definitions.
    ///
    /// With the memory ledger these form the whole tenant directory; with
    /// the postgres ledger they are upserted into the tenants table on
    /// startup.
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}
