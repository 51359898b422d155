use serde::Deserialize;
use streamgate_core::{Plan, Tenant, TenantCode};

/// A statically configured tenant.
///
/// ```toml
/// [[tenants]]
/// code = "042"
/// endpoint = "http://provider.example.com:8080"
///
/// [tenants.plan]
/// name = "starter"
/// session_limit = 50     # 0 = unlimited
/// billing = "fixed"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    /// Short tenant code; normalised to upper case.
    pub code: TenantCode,
    /// Base URL of the tenant's upstream content provider.
    pub endpoint: String,
    /// Inactive tenants are rejected as unknown.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Plan supplying the monthly session ceiling. Defaults to the
    /// unlimited default plan.
    #[serde(default)]
    pub plan: Plan,
}

impl From<&TenantConfig> for Tenant {
    fn from(config: &TenantConfig) -> Self {
        Self {
            code: config.code.clone(),
            endpoint: config.endpoint.clone(),
            active: config.active,
            plan: config.plan.clone(),
        }
    }
}

fn default_active() -> bool {
    true
}
