use async_trait::async_trait;
use serde_json::Value;

use streamgate_core::MediaClass;

use crate::credentials::Credentials;
use crate::error::UpstreamError;
use crate::request::UpstreamRequest;

/// Contract of the third-party content provider behind each tenant.
///
/// Every call carries the tenant's base URL and the end-user's credentials;
/// implementations hold no per-tenant state.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Execute a catalog or profile query and return the raw JSON payload.
    ///
    /// A [`UpstreamRequest::Profile`] whose credentials the provider refuses
    /// fails with [`UpstreamError::Rejected`].
    async fn fetch(
        &self,
        base_url: &str,
        credentials: &Credentials,
        request: &UpstreamRequest,
    ) -> Result<Value, UpstreamError>;

    /// Build a playback URL for a stream. Computed locally, never cached.
    fn playback_url(
        &self,
        base_url: &str,
        credentials: &Credentials,
        media: MediaClass,
        stream_id: &str,
    ) -> Result<String, UpstreamError>;
}
