use std::time::Duration;

use streamgate_upstream::UpstreamRequest;

/// Freshness class of a cached catalog operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    /// Live channel lineups and categories.
    Live,
    /// Movie and series catalogs and details.
    Vod,
    /// Programme guide entries.
    Guide,
    /// End-user account and subscription info.
    Profile,
}

impl TtlClass {
    /// The class an upstream request is cached under.
    pub fn of(request: &UpstreamRequest) -> Self {
        match request {
            UpstreamRequest::Profile => Self::Profile,
            UpstreamRequest::Guide { .. } => Self::Guide,
            UpstreamRequest::Categories(media) | UpstreamRequest::Items { media, .. }
                if media.is_volatile() =>
            {
                Self::Live
            }
            UpstreamRequest::Categories(_)
            | UpstreamRequest::Items { .. }
            | UpstreamRequest::MovieDetail { .. }
            | UpstreamRequest::SeriesDetail { .. } => Self::Vod,
        }
    }
}

/// Time-to-live for each [`TtlClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtlConfig {
    pub live: Duration,
    pub vod: Duration,
    pub guide: Duration,
    pub profile: Duration,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            live: Duration::from_secs(30),
            vod: Duration::from_secs(300),
            guide: Duration::from_secs(120),
            profile: Duration::from_secs(30),
        }
    }
}

impl CacheTtlConfig {
    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Live => self.live,
            TtlClass::Vod => self.vod,
            TtlClass::Guide => self.guide,
            TtlClass::Profile => self.profile,
        }
    }

    /// TTL for a specific request.
    pub fn ttl_for(&self, request: &UpstreamRequest) -> Duration {
        self.ttl(TtlClass::of(request))
    }
}
