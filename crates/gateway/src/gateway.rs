use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use streamgate_core::{ClientMeta, EndUserId, TenantCode};
use streamgate_upstream::Credentials;

use crate::catalog::CatalogCache;
use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;
use crate::quota::{Admission, QuotaGate};
use crate::verifier::CredentialVerifier;

/// Result of a successful [`ContentGateway::register_access`].
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub admission: Admission,
    /// The end-user's profile as returned by the credential check, without
    /// the password.
    pub profile: Value,
}

/// Entry point tying the catalog cache, credential verifier and quota gate
/// together over shared stores.
///
/// Build one with [`ContentGatewayBuilder`](crate::ContentGatewayBuilder)
/// at startup and share it behind an `Arc`.
pub struct ContentGateway {
    pub(crate) catalog: Arc<CatalogCache>,
    pub(crate) verifier: CredentialVerifier,
    pub(crate) quota: QuotaGate,
    pub(crate) metrics: Arc<GatewayMetrics>,
}

impl ContentGateway {
    /// Verify credentials, then admit the session against the tenant's
    /// monthly ceiling.
    ///
    /// Invalid credentials short-circuit before the ledger is touched.
    pub async fn register_access(
        &self,
        tenant: &TenantCode,
        end_user: &EndUserId,
        password: &str,
        client_meta: &ClientMeta,
    ) -> Result<AccessGrant, GatewayError> {
        let credentials = Credentials::new(end_user.clone(), password);
        let profile = self.verifier.verify(tenant, &credentials).await?;
        debug!(tenant = %tenant, user = %end_user, "credentials verified, checking quota");
        let admission = self
            .quota
            .register_access(tenant, end_user, client_meta)
            .await?;
        Ok(AccessGrant { admission, profile })
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }
}
