use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use streamgate_core::{Tenant, TenantCode};
use streamgate_store::{StoreError, TenantDirectory};

use crate::error::GatewayError;

/// Resolves tenant codes to active tenants through the directory.
pub(crate) struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    timeout: Duration,
}

impl TenantResolver {
    pub(crate) fn new(directory: Arc<dyn TenantDirectory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    /// Look up an active tenant. Unknown and inactive tenants are both
    /// [`GatewayError::TenantNotFound`].
    pub(crate) async fn resolve(&self, code: &TenantCode) -> Result<Tenant, GatewayError> {
        let found = tokio::time::timeout(self.timeout, self.directory.find_tenant(code))
            .await
            .map_err(|_| GatewayError::Directory(StoreError::Timeout(self.timeout)))?
            .map_err(GatewayError::Directory)?;

        match found {
            Some(tenant) if tenant.active => Ok(tenant),
            Some(_) => {
                debug!(tenant = %code, "tenant is inactive");
                Err(GatewayError::TenantNotFound(code.clone()))
            }
            None => Err(GatewayError::TenantNotFound(code.clone())),
        }
    }
}
