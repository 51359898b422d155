use async_trait::async_trait;
use dashmap::DashMap;

use streamgate_core::{Tenant, TenantCode};
use streamgate_store::{StoreError, TenantDirectory};

/// In-memory [`TenantDirectory`], typically seeded from configuration.
#[derive(Debug, Default)]
pub struct MemoryTenantDirectory {
    tenants: DashMap<TenantCode, Tenant>,
}

impl MemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_tenant(self, tenant: Tenant) -> Self {
        self.insert(tenant);
        self
    }

    /// Add or replace a tenant.
    pub fn insert(&self, tenant: Tenant) {
        self.tenants.insert(tenant.code.clone(), tenant);
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

impl FromIterator<Tenant> for MemoryTenantDirectory {
    fn from_iter<I: IntoIterator<Item = Tenant>>(iter: I) -> Self {
        let dir = Self::new();
        for tenant in iter {
            dir.insert(tenant);
        }
        dir
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenantDirectory {
    async fn find_tenant(&self, code: &TenantCode) -> Result<Option<Tenant>, StoreError> {
        Ok(self.tenants.get(code).map(|t| t.value().clone()))
    }
}
