use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::TenantCode;

/// Maximum number of distinct active sessions a plan admits per period.
///
/// Stored as an integer where `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum SessionCeiling {
    /// At most this many distinct end-users per period.
    Limited(NonZeroU32),
    /// No ceiling.
    Unlimited,
}

impl SessionCeiling {
    /// Build a ceiling from its stored integer form (`0` = unlimited).
    #[must_use]
    pub fn from_limit(limit: u32) -> Self {
        NonZeroU32::new(limit).map_or(Self::Unlimited, Self::Limited)
    }

    /// The finite limit, or `None` when unlimited.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Limited(n) => Some(n.get()),
            Self::Unlimited => None,
        }
    }

    /// Whether `used` sessions already fill the ceiling.
    #[must_use]
    pub fn is_reached(&self, used: u64) -> bool {
        self.limit().is_some_and(|limit| used >= u64::from(limit))
    }

    /// Slots left for new end-users, or `None` when unlimited.
    #[must_use]
    pub fn remaining(&self, used: u64) -> Option<u64> {
        self.limit()
            .map(|limit| u64::from(limit).saturating_sub(used))
    }
}

impl From<u32> for SessionCeiling {
    fn from(limit: u32) -> Self {
        Self::from_limit(limit)
    }
}

impl From<SessionCeiling> for u32 {
    fn from(c: SessionCeiling) -> Self {
        c.limit().unwrap_or(0)
    }
}

impl fmt::Display for SessionCeiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// How a tenant is billed for its plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    /// Flat fee regardless of usage.
    #[default]
    Fixed,
    /// Charged per distinct active session.
    PerSession,
}

impl BillingMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::PerSession => "per_session",
        }
    }
}

impl FromStr for BillingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "per_session" => Ok(Self::PerSession),
            other => Err(CoreError::UnknownBillingMode(other.to_owned())),
        }
    }
}

/// A billing plan attached to one or more tenants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Display name.
    pub name: String,
    /// Monthly ceiling on distinct active sessions.
    #[serde(rename = "session_limit")]
    pub ceiling: SessionCeiling,
    /// Billing mode.
    #[serde(default)]
    pub billing: BillingMode,
}

impl Plan {
    /// A named plan with the given ceiling and fixed billing.
    #[must_use]
    pub fn new(name: impl Into<String>, ceiling: SessionCeiling) -> Self {
        Self {
            name: name.into(),
            ceiling,
            billing: BillingMode::Fixed,
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::new("default", SessionCeiling::Unlimited)
    }
}

/// A tenant account whose end-users stream through a dedicated upstream
/// endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique short code.
    pub code: TenantCode,
    /// Base URL of the tenant's upstream content provider.
    pub endpoint: String,
    /// Inactive tenants are treated as unknown.
    pub active: bool,
    /// The plan supplying the session ceiling.
    #[serde(default)]
    pub plan: Plan,
}

impl Tenant {
    /// An active tenant on the given plan.
    #[must_use]
    pub fn new(code: impl Into<TenantCode>, endpoint: impl Into<String>, plan: Plan) -> Self {
        Self {
            code: code.into(),
            endpoint: endpoint.into(),
            active: true,
            plan,
        }
    }

    /// Upstream base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}
