use async_trait::async_trait;

use streamgate_core::{Tenant, TenantCode};

use crate::error::StoreError;

/// Read-only lookup of tenants and their plans.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Find a tenant by code, active or not. Returns `None` if unknown.
    async fn find_tenant(&self, code: &TenantCode) -> Result<Option<Tenant>, StoreError>;
}
