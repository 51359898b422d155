use std::time::Duration;

use thiserror::Error;

use streamgate_core::{EndUserId, PeriodKey, TenantCode};
use streamgate_store::StoreError;
use streamgate_upstream::UpstreamError;

/// Errors surfaced by catalog, quota and credential operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The tenant code is unknown or the tenant is inactive.
    #[error("tenant {0} is not configured or is inactive")]
    TenantNotFound(TenantCode),

    /// The upstream provider did not accept the end-user's credentials, or
    /// could not be reached to check them.
    #[error("invalid credentials for end-user {0}")]
    InvalidCredentials(EndUserId),

    /// The tenant's plan ceiling is already reached for the period.
    #[error(
        "session limit reached for tenant {tenant} in {period}: {used} of {ceiling} sessions in use"
    )]
    QuotaExceeded {
        tenant: TenantCode,
        period: PeriodKey,
        ceiling: u32,
        used: u64,
    },

    /// A catalog fetch failed upstream.
    #[error("upstream error: {0}")]
    Upstream(UpstreamError),

    /// The usage ledger failed.
    #[error("usage ledger error: {0}")]
    Ledger(StoreError),

    /// A usage ledger call did not complete in time.
    #[error("usage ledger timed out after {0:?}")]
    LedgerTimeout(Duration),

    /// The tenant directory failed.
    #[error("tenant directory error: {0}")]
    Directory(StoreError),

    /// The request parameters are unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The gateway was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Stable machine-readable label for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TenantNotFound(_) => "tenant_not_found",
            Self::InvalidCredentials(_) => "invalid_credentials",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::Upstream(_) => "upstream_error",
            Self::Ledger(_) => "ledger_unavailable",
            Self::LedgerTimeout(_) => "ledger_timeout",
            Self::Directory(_) => "directory_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Whether the caller may retry the same request later without changing
    /// it.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream(e) => e.is_retryable(),
            Self::Ledger(_) | Self::LedgerTimeout(_) | Self::Directory(_) => true,
            Self::TenantNotFound(_)
            | Self::InvalidCredentials(_)
            | Self::QuotaExceeded { .. }
            | Self::InvalidRequest(_)
            | Self::Configuration(_) => false,
        }
    }
}

impl From<UpstreamError> for GatewayError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            other => Self::Upstream(other),
        }
    }
}
