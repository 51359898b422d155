use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::period::PeriodKey;
use crate::tenant::SessionCeiling;
use crate::types::{EndUserId, TenantCode};

/// Last-known client details for an end-user. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
}

impl ClientMeta {
    #[must_use]
    pub fn new(user_agent: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ip_address: ip_address.into(),
        }
    }

    /// Overlay `incoming` on `self`; empty incoming fields keep the stored value.
    #[must_use]
    pub fn merged_with(&self, incoming: &ClientMeta) -> ClientMeta {
        let pick = |new: &str, old: &str| {
            if new.is_empty() {
                old.to_owned()
            } else {
                new.to_owned()
            }
        };
        ClientMeta {
            user_agent: pick(&incoming.user_agent, &self.user_agent),
            ip_address: pick(&incoming.ip_address, &self.ip_address),
        }
    }
}

/// Identity of a ledger row: at most one row exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub tenant: TenantCode,
    pub end_user: EndUserId,
    pub period: PeriodKey,
}

impl UsageKey {
    #[must_use]
    pub fn new(tenant: TenantCode, end_user: EndUserId, period: PeriodKey) -> Self {
        Self {
            tenant,
            end_user,
            period,
        }
    }

    /// Canonical `tenant:end_user:period` rendering.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}:{}", self.tenant, self.end_user, self.period)
    }
}

impl std::fmt::Display for UsageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Quota ledger entry: one distinct end-user counted for a tenant in a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyUsageRecord {
    pub tenant: TenantCode,
    pub end_user: EndUserId,
    pub period: PeriodKey,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    #[serde(default)]
    pub client_meta: ClientMeta,
    /// Only active rows count against the ceiling.
    pub is_active: bool,
}

impl MonthlyUsageRecord {
    /// A freshly counted row, first and last seen at `now`.
    #[must_use]
    pub fn first_seen(key: UsageKey, now: DateTime<Utc>, client_meta: ClientMeta) -> Self {
        Self {
            tenant: key.tenant,
            end_user: key.end_user,
            period: key.period,
            first_seen_at: now,
            last_seen_at: now,
            client_meta,
            is_active: true,
        }
    }

    #[must_use]
    pub fn key(&self) -> UsageKey {
        UsageKey::new(self.tenant.clone(), self.end_user.clone(), self.period)
    }

    /// Apply a repeat visit. `last_seen_at` never moves backwards.
    pub fn touch(&mut self, seen_at: DateTime<Utc>, client_meta: &ClientMeta) {
        if seen_at > self.last_seen_at {
            self.last_seen_at = seen_at;
        }
        self.client_meta = self.client_meta.merged_with(client_meta);
    }
}

/// Usage against a tenant's ceiling for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub tenant: TenantCode,
    pub period: PeriodKey,
    /// Active distinct end-users counted so far.
    pub used: u64,
    /// The plan ceiling; `0` means unlimited.
    pub ceiling: SessionCeiling,
    /// Slots left, absent when unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
}

impl UsageSummary {
    #[must_use]
    pub fn new(tenant: TenantCode, period: PeriodKey, used: u64, ceiling: SessionCeiling) -> Self {
        Self {
            tenant,
            period,
            used,
            ceiling,
            remaining: ceiling.remaining(used),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn key() -> UsageKey {
        UsageKey::new(
            TenantCode::new("042"),
            EndUserId::new("alice"),
            "2024-07".parse().unwrap(),
        )
    }

    #[test]
    fn canonical_key() {
        assert_eq!(key().canonical(), "042:alice:2024-07");
    }

    #[test]
    fn meta_merge_keeps_known_values() {
        let stored = ClientMeta::new("VLC/3.0", "10.0.0.1");
        let merged = stored.merged_with(&ClientMeta::new("", "10.0.0.2"));
        assert_eq!(merged, ClientMeta::new("VLC/3.0", "10.0.0.2"));
    }

    #[test]
    fn touch_is_monotonic() {
        let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
        let mut rec = MonthlyUsageRecord::first_seen(key(), t0, ClientMeta::default());
        assert_eq!(rec.first_seen_at, rec.last_seen_at);

        let later = t0 + Duration::hours(2);
        rec.touch(later, &ClientMeta::new("Kodi", ""));
        assert_eq!(rec.last_seen_at, later);
        assert_eq!(rec.client_meta.user_agent, "Kodi");

        rec.touch(t0, &ClientMeta::default());
        assert_eq!(rec.last_seen_at, later, "older timestamp must not win");
        assert_eq!(rec.first_seen_at, t0);
    }

    #[test]
    fn summary_remaining() {
        let s = UsageSummary::new(
            TenantCode::new("042"),
            "2024-07".parse().unwrap(),
            2,
            SessionCeiling::from_limit(5),
        );
        assert_eq!(s.remaining, Some(3));
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["ceiling"], 5);
        assert_eq!(json["period"], "2024-07");
    }
}
