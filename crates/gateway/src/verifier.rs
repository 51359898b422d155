use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use streamgate_core::TenantCode;
use streamgate_upstream::{Credentials, UpstreamRequest};

use crate::catalog::CatalogCache;
use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;

/// Confirms end-user credentials against the tenant's upstream endpoint.
///
/// Always asks upstream: a cached profile cannot prove a password. A
/// successful check warms the end-user's profile cache slot.
pub struct CredentialVerifier {
    catalog: Arc<CatalogCache>,
    metrics: Arc<GatewayMetrics>,
}

impl CredentialVerifier {
    pub(crate) fn new(catalog: Arc<CatalogCache>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { catalog, metrics }
    }

    /// Verify `credentials` for `tenant` and return the (redacted) profile.
    ///
    /// Any upstream refusal, error or timeout is reported as
    /// [`GatewayError::InvalidCredentials`]. Tenant resolution failures pass
    /// through unchanged.
    #[instrument(
        name = "credentials.verify",
        skip_all,
        fields(tenant = %tenant, user = %credentials.username)
    )]
    pub async fn verify(
        &self,
        tenant: &TenantCode,
        credentials: &Credentials,
    ) -> Result<Value, GatewayError> {
        let tenant = self.catalog.tenants().resolve(tenant).await?;

        match self
            .catalog
            .fetch_upstream(&tenant, credentials, &UpstreamRequest::Profile)
            .await
        {
            Ok(profile) => {
                debug!("credentials accepted");
                Ok(self
                    .catalog
                    .store_profile(&tenant, credentials, profile)
                    .await)
            }
            Err(e) => {
                self.metrics.increment_credential_rejections();
                warn!(error = %e, "credentials not accepted");
                Err(GatewayError::InvalidCredentials(credentials.username.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use streamgate_core::{Plan, Tenant};
    use streamgate_store_memory::{MemoryCacheStore, MemoryTenantDirectory};
    use streamgate_upstream::{MockUpstream, RejectingUpstream, UpstreamProvider};

    use super::*;
    use crate::catalog::AccessContext;
    use crate::tenants::TenantResolver;
    use crate::ttl::CacheTtlConfig;

    fn setup(upstream: Arc<dyn UpstreamProvider>) -> (CredentialVerifier, Arc<CatalogCache>) {
        let directory = Arc::new(MemoryTenantDirectory::new().with_tenant(Tenant::new(
            "042",
            "http://up.example.com",
            Plan::default(),
        )));
        let metrics = Arc::new(GatewayMetrics::default());
        let catalog = Arc::new(CatalogCache::new(
            Arc::new(TenantResolver::new(directory, Duration::from_secs(1))),
            Arc::new(MemoryCacheStore::new()),
            upstream,
            CacheTtlConfig::default(),
            Duration::from_millis(250),
            Duration::from_secs(10),
            Arc::clone(&metrics),
        ));
        (
            CredentialVerifier::new(Arc::clone(&catalog), metrics),
            catalog,
        )
    }

    #[tokio::test]
    async fn accepted_credentials_warm_profile() {
        let upstream = Arc::new(MockUpstream::new());
        let (verifier, catalog) = setup(upstream.clone());

        let profile = verifier
            .verify(&TenantCode::new("042"), &Credentials::new("alice", "pw"))
            .await
            .unwrap();
        assert_eq!(profile["user_info"]["username"], "alice");
        assert!(profile["user_info"].get("password").is_none());

        let cached = catalog
            .get_profile(&AccessContext::new("042", "alice", "pw"))
            .await
            .unwrap();
        assert_eq!(cached, profile);
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn verification_bypasses_cache() {
        let upstream = Arc::new(MockUpstream::new());
        let (verifier, _) = setup(upstream.clone());
        let tenant = TenantCode::new("042");
        let creds = Credentials::new("alice", "pw");

        verifier.verify(&tenant, &creds).await.unwrap();
        verifier.verify(&tenant, &creds).await.unwrap();
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn rejection_becomes_invalid_credentials() {
        let (verifier, _) = setup(Arc::new(RejectingUpstream));
        let err = verifier
            .verify(&TenantCode::new("042"), &Credentials::new("alice", "bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredentials(_)));
        assert_eq!(verifier.metrics.snapshot().credential_rejections, 1);
    }

    #[tokio::test]
    async fn unknown_tenant_passes_through() {
        let (verifier, _) = setup(Arc::new(MockUpstream::new()));
        let err = verifier
            .verify(&TenantCode::new("777"), &Credentials::new("alice", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::TenantNotFound(_)));
    }
}
