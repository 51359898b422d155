use std::time::Duration;

use serde::Deserialize;
use streamgate_gateway::CacheTtlConfig;

/// Configuration for the catalog cache backend.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Which backend to use: `"memory"` or `"redis"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Connection URL for the backend (e.g. `redis://localhost:6379`).
    pub url: Option<String>,

    /// Key prefix for backends that support it.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Connection pool size for networked backends.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Upper bound on every cache call, in milliseconds. A slower store is
    /// treated as a miss.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Freshness windows per data class.
    #[serde(default)]
    pub ttl: TtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            prefix: default_prefix(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
            ttl: TtlConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}

fn default_prefix() -> String {
    "streamgate".to_owned()
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    250
}

/// Freshness windows, in seconds.
///
/// ```toml
/// [cache.ttl]
/// live_seconds = 30
/// vod_seconds = 300
/// guide_seconds = 120
/// profile_seconds = 30
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// Live channel lineups and category listings.
    pub live_seconds: u64,
    /// Movie and series catalogs and details.
    pub vod_seconds: u64,
    /// Programme guide data.
    pub guide_seconds: u64,
    /// End-user profiles.
    pub profile_seconds: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            live_seconds: 30,
            vod_seconds: 300,
            guide_seconds: 120,
            profile_seconds: 30,
        }
    }
}

impl From<&TtlConfig> for CacheTtlConfig {
    fn from(config: &TtlConfig) -> Self {
        Self {
            live: Duration::from_secs(config.live_seconds),
            vod: Duration::from_secs(config.vod_seconds),
            guide: Duration::from_secs(config.guide_seconds),
            profile: Duration::from_secs(config.profile_seconds),
        }
    }
}
