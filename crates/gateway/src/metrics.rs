use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking cache, quota and credential outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Catalog reads served from the cache.
    pub cache_hits: AtomicU64,
    /// Catalog reads that went upstream.
    pub cache_misses: AtomicU64,
    /// Cache reads that failed or timed out and were treated as misses.
    pub cache_degraded_reads: AtomicU64,
    /// Cache writes that failed and were dropped.
    pub cache_failed_writes: AtomicU64,
    /// Upstream catalog fetches that failed.
    pub upstream_errors: AtomicU64,
    /// First registrations of an end-user in a period.
    pub sessions_admitted: AtomicU64,
    /// Repeat registrations of an already counted end-user.
    pub sessions_refreshed: AtomicU64,
    /// Registrations refused because the ceiling was reached.
    pub quota_rejections: AtomicU64,
    /// Registrations refused because credentials were not accepted.
    pub credential_rejections: AtomicU64,
}

impl GatewayMetrics {
    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_degraded_reads(&self) {
        self.cache_degraded_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_failed_writes(&self) {
        self.cache_failed_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_upstream_errors(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sessions_admitted(&self) {
        self.sessions_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sessions_refreshed(&self) {
        self.sessions_refreshed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_quota_rejections(&self) {
        self.quota_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_credential_rejections(&self) {
        self.credential_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_degraded_reads: self.cache_degraded_reads.load(Ordering::Relaxed),
            cache_failed_writes: self.cache_failed_writes.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            sessions_admitted: self.sessions_admitted.load(Ordering::Relaxed),
            sessions_refreshed: self.sessions_refreshed.load(Ordering::Relaxed),
            quota_rejections: self.quota_rejections.load(Ordering::Relaxed),
            credential_rejections: self.credential_rejections.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`GatewayMetrics`] at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_degraded_reads: u64,
    pub cache_failed_writes: u64,
    pub upstream_errors: u64,
    pub sessions_admitted: u64,
    pub sessions_refreshed: u64,
    pub quota_rejections: u64,
    pub credential_rejections: u64,
}
