//! Read-through catalog cache in front of the upstream content provider.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use streamgate_core::{MediaClass, Tenant, TenantCode};
use streamgate_store::CacheStore;
use streamgate_upstream::{Credentials, UpstreamError, UpstreamProvider, UpstreamRequest};

use crate::cache_key::cache_key;
use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;
use crate::tenants::TenantResolver;
use crate::ttl::CacheTtlConfig;

/// Who is asking: the tenant code plus the end-user's credentials.
///
/// Credentials travel with every request and are never written to the
/// cache.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub tenant: TenantCode,
    pub credentials: Credentials,
}

impl AccessContext {
    pub fn new(
        tenant: impl Into<TenantCode>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            credentials: Credentials::new(username.into(), password),
        }
    }
}

/// Remove `user_info.password` from a profile payload.
fn redact_profile(mut profile: Value) -> Value {
    if let Some(info) = profile.get_mut("user_info").and_then(Value::as_object_mut) {
        info.remove("password");
    }
    profile
}

/// Read-through cache of upstream catalog queries, namespaced per tenant.
///
/// Cache failures never fail a request: a read error or timeout is a miss
/// and a write error is logged and dropped. Upstream failures are returned
/// to the caller and never cached.
pub struct CatalogCache {
    tenants: Arc<TenantResolver>,
    cache: Arc<dyn CacheStore>,
    upstream: Arc<dyn UpstreamProvider>,
    ttl: CacheTtlConfig,
    cache_timeout: Duration,
    upstream_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl CatalogCache {
    pub(crate) fn new(
        tenants: Arc<TenantResolver>,
        cache: Arc<dyn CacheStore>,
        upstream: Arc<dyn UpstreamProvider>,
        ttl: CacheTtlConfig,
        cache_timeout: Duration,
        upstream_timeout: Duration,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            tenants,
            cache,
            upstream,
            ttl,
            cache_timeout,
            upstream_timeout,
            metrics,
        }
    }

    /// End-user account and subscription metadata. Cached per end-user with
    /// the password removed.
    pub async fn get_profile(&self, ctx: &AccessContext) -> Result<Value, GatewayError> {
        self.fetch(ctx, &UpstreamRequest::Profile).await
    }

    /// Category taxonomy for one media class.
    pub async fn list_categories(
        &self,
        ctx: &AccessContext,
        media: MediaClass,
    ) -> Result<Value, GatewayError> {
        self.fetch(ctx, &UpstreamRequest::Categories(media)).await
    }

    /// Catalog items, optionally filtered by category.
    pub async fn list_items(
        &self,
        ctx: &AccessContext,
        media: MediaClass,
        category: Option<&str>,
    ) -> Result<Value, GatewayError> {
        self.fetch(ctx, &UpstreamRequest::items(media, category)).await
    }

    /// Full metadata for one movie or series.
    pub async fn get_item_detail(
        &self,
        ctx: &AccessContext,
        media: MediaClass,
        item_id: &str,
    ) -> Result<Value, GatewayError> {
        let request = UpstreamRequest::item_detail(media, item_id)?;
        self.fetch(ctx, &request).await
    }

    /// Programme guide entries for a live channel.
    pub async fn get_guide_data(
        &self,
        ctx: &AccessContext,
        channel_id: &str,
    ) -> Result<Value, GatewayError> {
        let request = UpstreamRequest::guide(channel_id)?;
        self.fetch(ctx, &request).await
    }

    /// Playback URL for a stream. Always computed fresh, never cached.
    pub async fn build_playback_url(
        &self,
        ctx: &AccessContext,
        stream_id: &str,
        media: MediaClass,
    ) -> Result<String, GatewayError> {
        let tenant = self.tenants.resolve(&ctx.tenant).await?;
        Ok(self
            .upstream
            .playback_url(tenant.base_url(), &ctx.credentials, media, stream_id)?)
    }

    #[instrument(
        name = "catalog.fetch",
        skip_all,
        fields(tenant = %ctx.tenant, operation = request.operation())
    )]
    async fn fetch(
        &self,
        ctx: &AccessContext,
        request: &UpstreamRequest,
    ) -> Result<Value, GatewayError> {
        let tenant = self.tenants.resolve(&ctx.tenant).await?;
        let key = self.key_for(&tenant.code, &ctx.credentials, request);

        if let Some(hit) = self.read(&key).await {
            self.metrics.increment_cache_hits();
            debug!("cache hit");
            return Ok(hit);
        }
        self.metrics.increment_cache_misses();
        debug!("cache miss");

        let value = match self.fetch_upstream(&tenant, &ctx.credentials, request).await {
            Ok(value) => value,
            Err(e) if e.is_auth_failure() => {
                self.metrics.increment_credential_rejections();
                warn!(error = %e, "upstream refused credentials");
                return Err(GatewayError::InvalidCredentials(ctx.credentials.username.clone()));
            }
            Err(e) => {
                self.metrics.increment_upstream_errors();
                warn!(error = %e, "upstream fetch failed");
                return Err(e.into());
            }
        };
        let value = if matches!(request, UpstreamRequest::Profile) {
            redact_profile(value)
        } else {
            value
        };

        self.write(&key, &value, self.ttl.ttl_for(request)).await;
        Ok(value)
    }

    /// Call upstream bounded by the configured timeout, bypassing the cache.
    pub(crate) async fn fetch_upstream(
        &self,
        tenant: &Tenant,
        credentials: &Credentials,
        request: &UpstreamRequest,
    ) -> Result<Value, UpstreamError> {
        tokio::time::timeout(
            self.upstream_timeout,
            self.upstream.fetch(tenant.base_url(), credentials, request),
        )
        .await
        .map_err(|_| UpstreamError::Timeout)?
    }

    /// Write a freshly verified profile into its cache slot and return the
    /// redacted payload.
    pub(crate) async fn store_profile(
        &self,
        tenant: &Tenant,
        credentials: &Credentials,
        profile: Value,
    ) -> Value {
        let request = UpstreamRequest::Profile;
        let key = self.key_for(&tenant.code, credentials, &request);
        let profile = redact_profile(profile);
        self.write(&key, &profile, self.ttl.ttl_for(&request)).await;
        profile
    }

    pub(crate) fn tenants(&self) -> &TenantResolver {
        &self.tenants
    }

    /// Listings are shared by all end-users of a tenant; only the profile
    /// slot is keyed by username.
    fn key_for(
        &self,
        tenant: &TenantCode,
        credentials: &Credentials,
        request: &UpstreamRequest,
    ) -> String {
        let mut params = request.params();
        if matches!(request, UpstreamRequest::Profile) {
            params.push(("username", credentials.username.to_string()));
        }
        cache_key(tenant, request.operation(), &params)
    }

    async fn read(&self, key: &str) -> Option<Value> {
        let raw = match tokio::time::timeout(self.cache_timeout, self.cache.get(key)).await {
            Ok(Ok(raw)) => raw?,
            Ok(Err(e)) => {
                self.metrics.increment_cache_degraded_reads();
                warn!(error = %e, "cache read failed, treating as miss");
                return None;
            }
            Err(_) => {
                self.metrics.increment_cache_degraded_reads();
                warn!(timeout = ?self.cache_timeout, "cache read timed out, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                self.metrics.increment_cache_degraded_reads();
                warn!(error = %e, "cached entry is not valid JSON, treating as miss");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &Value, ttl: Duration) {
        let raw = value.to_string();
        let result = tokio::time::timeout(self.cache_timeout, self.cache.set(key, &raw, ttl)).await;
        let err = match result {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.cache_timeout),
        };
        self.metrics.increment_cache_failed_writes();
        warn!(error = %err, "cache write failed, returning fresh data");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use streamgate_core::Plan;
    use streamgate_store::StoreError;
    use streamgate_store_memory::{MemoryCacheStore, MemoryTenantDirectory, UnavailableCacheStore};
    use streamgate_upstream::{FailingUpstream, MockUpstream, RejectingUpstream};

    use super::*;

    fn directory() -> Arc<MemoryTenantDirectory> {
        let mut inactive = Tenant::new("099", "http://gone.example.com", Plan::default());
        inactive.active = false;
        Arc::new(
            MemoryTenantDirectory::new()
                .with_tenant(Tenant::new("042", "http://up.example.com/", Plan::default()))
                .with_tenant(Tenant::new("043", "http://other.example.com", Plan::default()))
                .with_tenant(inactive),
        )
    }

    fn catalog(cache: Arc<dyn CacheStore>, upstream: Arc<dyn UpstreamProvider>) -> CatalogCache {
        CatalogCache::new(
            Arc::new(TenantResolver::new(directory(), Duration::from_secs(1))),
            cache,
            upstream,
            CacheTtlConfig::default(),
            Duration::from_millis(250),
            Duration::from_secs(10),
            Arc::new(GatewayMetrics::default()),
        )
    }

    fn ctx(user: &str) -> AccessContext {
        AccessContext::new("042", user, "pw")
    }

    /// Cache that never answers, to exercise the read timeout.
    struct StallingCache;

    #[async_trait]
    impl CacheStore for StallingCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            std::future::pending().await
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    /// Upstream that counts playback URL builds.
    struct CountingUrls {
        inner: MockUpstream,
        urls: AtomicUsize,
    }

    #[async_trait]
    impl UpstreamProvider for CountingUrls {
        async fn fetch(
            &self,
            base_url: &str,
            credentials: &Credentials,
            request: &UpstreamRequest,
        ) -> Result<Value, UpstreamError> {
            self.inner.fetch(base_url, credentials, request).await
        }

        fn playback_url(
            &self,
            base_url: &str,
            credentials: &Credentials,
            media: MediaClass,
            stream_id: &str,
        ) -> Result<String, UpstreamError> {
            let n = self.urls.fetch_add(1, Ordering::Relaxed);
            let url = self
                .inner
                .playback_url(base_url, credentials, media, stream_id)?;
            Ok(format!("{url}?token={n}"))
        }
    }

    /// Upstream whose payload changes on every call.
    #[derive(Default)]
    struct Versioned {
        calls: AtomicUsize,
    }

    impl Versioned {
        fn call_count(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl UpstreamProvider for Versioned {
        async fn fetch(
            &self,
            _base_url: &str,
            _credentials: &Credentials,
            _request: &UpstreamRequest,
        ) -> Result<Value, UpstreamError> {
            let version = self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(json!({ "version": version }))
        }

        fn playback_url(
            &self,
            base_url: &str,
            _credentials: &Credentials,
            _media: MediaClass,
            stream_id: &str,
        ) -> Result<String, UpstreamError> {
            Ok(format!("{base_url}/{stream_id}"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cache_hit_suppresses_upstream_call() {
        let upstream = Arc::new(MockUpstream::new().with_response("movies", json!([{"id": 1}])));
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), upstream.clone());

        let first = catalog
            .list_items(&ctx("alice"), MediaClass::Movies, Some("12"))
            .await
            .unwrap();
        let second = catalog
            .list_items(&ctx("alice"), MediaClass::Movies, Some(" 12 "))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(upstream.call_count(), 1);
        let snap = catalog.metrics.snapshot();
        assert_eq!((snap.cache_hits, snap.cache_misses), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn listings_are_shared_across_end_users() {
        let upstream = Arc::new(MockUpstream::new());
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), upstream.clone());

        catalog
            .list_categories(&ctx("alice"), MediaClass::Series)
            .await
            .unwrap();
        catalog
            .list_categories(&ctx("bob"), MediaClass::Series)
            .await
            .unwrap();
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tenants_do_not_share_entries() {
        let upstream = Arc::new(MockUpstream::new());
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), upstream.clone());

        catalog
            .list_categories(&ctx("alice"), MediaClass::Live)
            .await
            .unwrap();
        catalog
            .list_categories(&AccessContext::new("043", "alice", "pw"), MediaClass::Live)
            .await
            .unwrap();
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn miss_after_ttl_expiry_refetches_once() {
        let upstream = Arc::new(Versioned::default());
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), upstream.clone());
        let alice = ctx("alice");
        let call = || catalog.list_items(&alice, MediaClass::Movies, Some("12"));

        assert_eq!(call().await.unwrap(), json!({ "version": 0 }));
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(call().await.unwrap(), json!({ "version": 0 }));
        assert_eq!(upstream.call_count(), 1, "still fresh inside the VOD window");

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(call().await.unwrap(), json!({ "version": 1 }));
        assert_eq!(upstream.call_count(), 2, "one refetch after expiry");

        assert_eq!(call().await.unwrap(), json!({ "version": 1 }));
        assert_eq!(upstream.call_count(), 2, "refetched value is cached again");
    }

    #[tokio::test(start_paused = true)]
    async fn live_data_uses_the_short_window() {
        let upstream = Arc::new(MockUpstream::new());
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), upstream.clone());

        catalog
            .list_items(&ctx("alice"), MediaClass::Live, None)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        catalog
            .list_items(&ctx("alice"), MediaClass::Live, None)
            .await
            .unwrap();
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn cache_outage_degrades_to_upstream() {
        let upstream = Arc::new(MockUpstream::new().with_response("movies", json!([{"id": 7}])));
        let catalog = catalog(Arc::new(UnavailableCacheStore), upstream.clone());

        for _ in 0..3 {
            let items = catalog
                .list_items(&ctx("alice"), MediaClass::Movies, Some("12"))
                .await
                .unwrap();
            assert_eq!(items, json!([{"id": 7}]));
        }
        assert_eq!(upstream.call_count(), 3);
        let snap = catalog.metrics.snapshot();
        assert_eq!(snap.cache_degraded_reads, 3);
        assert_eq!(snap.cache_failed_writes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_cache_is_bounded() {
        let upstream = Arc::new(MockUpstream::new());
        let catalog = catalog(Arc::new(StallingCache), upstream.clone());

        let result = catalog
            .list_categories(&ctx("alice"), MediaClass::Movies)
            .await;
        assert!(result.is_ok());
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn upstream_failure_is_surfaced_and_not_cached() {
        let cache = Arc::new(MemoryCacheStore::new());
        let failing = Arc::new(FailingUpstream::new(UpstreamError::Status {
            status: 503,
            message: "maintenance".into(),
        }));
        let catalog_failing = catalog(cache.clone(), failing.clone());

        let err = catalog_failing
            .list_categories(&ctx("alice"), MediaClass::Movies)
            .await
            .unwrap_err();
        match &err {
            GatewayError::Upstream(UpstreamError::Status { message, .. }) => {
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
        assert!(cache.is_empty(), "failures must not be cached");

        let healthy = Arc::new(MockUpstream::new());
        let catalog_healthy = catalog(cache, healthy.clone());
        catalog_healthy
            .list_categories(&ctx("alice"), MediaClass::Movies)
            .await
            .unwrap();
        assert_eq!(healthy.call_count(), 1);
    }

    #[tokio::test]
    async fn refused_credentials_are_not_an_upstream_failure() {
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), Arc::new(RejectingUpstream));

        let err = catalog
            .list_categories(&ctx("alice"), MediaClass::Movies)
            .await
            .unwrap_err();
        assert!(
            matches!(err, GatewayError::InvalidCredentials(ref user) if user.as_str() == "alice")
        );
        assert!(!err.is_retryable());
        let snapshot = catalog.metrics.snapshot();
        assert_eq!(snapshot.credential_rejections, 1);
        assert_eq!(snapshot.upstream_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_times_out() {
        let upstream = Arc::new(MockUpstream::new().with_delay(Duration::from_secs(60)));
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), upstream);

        let err = catalog
            .list_categories(&ctx("alice"), MediaClass::Live)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(UpstreamError::Timeout)));
    }

    #[tokio::test]
    async fn unknown_and_inactive_tenants_are_not_found() {
        let upstream = Arc::new(MockUpstream::new());
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), upstream.clone());

        for code in ["777", "099"] {
            let err = catalog
                .get_profile(&AccessContext::new(code, "alice", "pw"))
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::TenantNotFound(_)));
        }
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn profile_is_cached_per_user_without_password() {
        let cache = Arc::new(MemoryCacheStore::new());
        let upstream = Arc::new(MockUpstream::new());
        let catalog = catalog(cache.clone(), upstream.clone());

        let alice = catalog.get_profile(&ctx("alice")).await.unwrap();
        let bob = catalog.get_profile(&ctx("bob")).await.unwrap();
        assert_eq!(alice["user_info"]["username"], "alice");
        assert_eq!(bob["user_info"]["username"], "bob");
        assert!(alice["user_info"].get("password").is_none());
        assert_eq!(upstream.call_count(), 2);

        catalog.get_profile(&ctx("alice")).await.unwrap();
        assert_eq!(upstream.call_count(), 2);

        let key = catalog.key_for(
            &TenantCode::new("042"),
            &ctx("alice").credentials,
            &UpstreamRequest::Profile,
        );
        let raw = cache.get(&key).await.unwrap().unwrap();
        assert!(!raw.contains("\"pw\""));
    }

    #[tokio::test]
    async fn live_item_detail_is_invalid() {
        let upstream = Arc::new(MockUpstream::new());
        let catalog = catalog(Arc::new(MemoryCacheStore::new()), upstream.clone());

        let err = catalog
            .get_item_detail(&ctx("alice"), MediaClass::Live, "5")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
        assert_eq!(upstream.call_count(), 0);

        catalog
            .get_item_detail(&ctx("alice"), MediaClass::Movies, "5")
            .await
            .unwrap();
        catalog.get_guide_data(&ctx("alice"), "5").await.unwrap();
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn playback_url_is_never_cached() {
        let upstream = Arc::new(CountingUrls {
            inner: MockUpstream::new(),
            urls: AtomicUsize::new(0),
        });
        let cache = Arc::new(MemoryCacheStore::new());
        let catalog = catalog(cache.clone(), upstream.clone());

        let a = catalog
            .build_playback_url(&ctx("alice"), "42", MediaClass::Movies)
            .await
            .unwrap();
        let b = catalog
            .build_playback_url(&ctx("alice"), "42", MediaClass::Movies)
            .await
            .unwrap();
        assert!(a.starts_with("http://up.example.com/movies/alice/42"));
        assert_ne!(a, b);
        assert_eq!(upstream.urls.load(Ordering::Relaxed), 2);
        assert!(cache.is_empty());
    }
}
