use std::sync::Arc;
use std::time::Duration;

use streamgate_core::{Clock, SystemClock};
use streamgate_store::{CacheStore, TenantDirectory, UsageLedger};
use streamgate_store_memory::MemoryCacheStore;
use streamgate_upstream::UpstreamProvider;

use crate::catalog::CatalogCache;
use crate::error::GatewayError;
use crate::gateway::ContentGateway;
use crate::metrics::GatewayMetrics;
use crate::quota::QuotaGate;
use crate::tenants::TenantResolver;
use crate::ttl::CacheTtlConfig;
use crate::verifier::CredentialVerifier;

/// Fluent builder for constructing a [`ContentGateway`] instance.
///
/// A [`TenantDirectory`], a [`UsageLedger`] and an [`UpstreamProvider`] must
/// be supplied. The cache defaults to an in-process [`MemoryCacheStore`] and
/// the clock to [`SystemClock`].
pub struct ContentGatewayBuilder {
    tenants: Option<Arc<dyn TenantDirectory>>,
    cache: Option<Arc<dyn CacheStore>>,
    ledger: Option<Arc<dyn UsageLedger>>,
    upstream: Option<Arc<dyn UpstreamProvider>>,
    clock: Option<Arc<dyn Clock>>,
    ttl: CacheTtlConfig,
    cache_timeout: Duration,
    ledger_timeout: Duration,
    upstream_timeout: Duration,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl ContentGatewayBuilder {
    pub fn new() -> Self {
        Self {
            tenants: None,
            cache: None,
            ledger: None,
            upstream: None,
            clock: None,
            ttl: CacheTtlConfig::default(),
            cache_timeout: Duration::from_millis(250),
            ledger_timeout: Duration::from_secs(2),
            upstream_timeout: Duration::from_secs(10),
            metrics: None,
        }
    }

    /// Set the tenant directory.
    #[must_use]
    pub fn tenants(mut self, directory: Arc<dyn TenantDirectory>) -> Self {
        self.tenants = Some(directory);
        self
    }

    /// Set the fast cache store.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the usage ledger.
    #[must_use]
    pub fn ledger(mut self, ledger: Arc<dyn UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Set the upstream content provider.
    #[must_use]
    pub fn upstream(mut self, upstream: Arc<dyn UpstreamProvider>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the freshness window of each cache class.
    #[must_use]
    pub fn ttl(mut self, ttl: CacheTtlConfig) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bound on each cache read or write.
    #[must_use]
    pub fn cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Bound on each ledger and directory call.
    #[must_use]
    pub fn ledger_timeout(mut self, timeout: Duration) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    /// Bound on each upstream call.
    #[must_use]
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Share an existing metrics registry.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Consume the builder and produce a [`ContentGateway`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if a required component is
    /// missing.
    pub fn build(self) -> Result<ContentGateway, GatewayError> {
        let directory = self
            .tenants
            .ok_or_else(|| GatewayError::Configuration("tenant directory is required".into()))?;
        let ledger = self
            .ledger
            .ok_or_else(|| GatewayError::Configuration("usage ledger is required".into()))?;
        let upstream = self
            .upstream
            .ok_or_else(|| GatewayError::Configuration("upstream provider is required".into()))?;

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCacheStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let metrics = self.metrics.unwrap_or_default();

        let tenants = Arc::new(TenantResolver::new(directory, self.ledger_timeout));
        let catalog = Arc::new(CatalogCache::new(
            Arc::clone(&tenants),
            cache,
            upstream,
            self.ttl,
            self.cache_timeout,
            self.upstream_timeout,
            Arc::clone(&metrics),
        ));
        let verifier = CredentialVerifier::new(Arc::clone(&catalog), Arc::clone(&metrics));
        let quota = QuotaGate::new(
            tenants,
            ledger,
            clock,
            self.ledger_timeout,
            Arc::clone(&metrics),
        );

        Ok(ContentGateway {
            catalog,
            verifier,
            quota,
            metrics,
        })
    }
}

impl Default for ContentGatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use streamgate_store_memory::{MemoryTenantDirectory, MemoryUsageLedger};
    use streamgate_upstream::MockUpstream;

    use super::*;

    #[test]
    fn missing_components_are_configuration_errors() {
        let err = ContentGatewayBuilder::new().build().err().unwrap();
        assert_eq!(err.kind(), "configuration");

        let err = ContentGatewayBuilder::new()
            .tenants(Arc::new(MemoryTenantDirectory::new()))
            .ledger(Arc::new(MemoryUsageLedger::new()))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("upstream"));
    }

    #[test]
    fn defaults_fill_cache_and_clock() {
        let gw = ContentGatewayBuilder::new()
            .tenants(Arc::new(MemoryTenantDirectory::new()))
            .ledger(Arc::new(MemoryUsageLedger::new()))
            .upstream(Arc::new(MockUpstream::new()))
            .build();
        assert!(gw.is_ok());
    }
}
