//! Monthly per-tenant admission control for end-user sessions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use streamgate_core::{
    ClientMeta, Clock, EndUserId, MonthlyUsageRecord, PeriodKey, TenantCode, UsageKey,
    UsageSummary,
};
use streamgate_store::{InsertOutcome, StoreError, UsageLedger};

use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;
use crate::tenants::TenantResolver;

/// How a registration was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionOutcome {
    /// First registration of this end-user in the period; a slot was used.
    New,
    /// The end-user was already counted; timestamps were refreshed.
    Refreshed,
}

/// A successful registration and the ledger row it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub outcome: AdmissionOutcome,
    pub record: MonthlyUsageRecord,
}

/// Admits or rejects session registrations against each tenant's monthly
/// ceiling.
///
/// The ceiling is only checked when an end-user is first seen in a period.
/// The count-then-insert sequence is not serialized across distinct
/// end-users, so concurrent first registrations near the ceiling may
/// briefly exceed it. Same-user races are resolved by the ledger's
/// uniqueness constraint.
pub struct QuotaGate {
    tenants: Arc<TenantResolver>,
    ledger: Arc<dyn UsageLedger>,
    clock: Arc<dyn Clock>,
    ledger_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl QuotaGate {
    pub(crate) fn new(
        tenants: Arc<TenantResolver>,
        ledger: Arc<dyn UsageLedger>,
        clock: Arc<dyn Clock>,
        ledger_timeout: Duration,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            tenants,
            ledger,
            clock,
            ledger_timeout,
            metrics,
        }
    }

    /// The period that "now" falls in (UTC).
    pub fn current_period(&self) -> PeriodKey {
        PeriodKey::from_datetime(&self.clock.now())
    }

    /// Record a session registration for `end_user`.
    ///
    /// Credentials must already have been verified. Ledger failures and
    /// timeouts are returned, never absorbed.
    #[instrument(
        name = "quota.register_access",
        skip_all,
        fields(tenant = %tenant, user = %end_user)
    )]
    pub async fn register_access(
        &self,
        tenant: &TenantCode,
        end_user: &EndUserId,
        client_meta: &ClientMeta,
    ) -> Result<Admission, GatewayError> {
        let tenant = self.tenants.resolve(tenant).await?;
        let now = self.clock.now();
        let period = PeriodKey::from_datetime(&now);
        let key = UsageKey::new(tenant.code.clone(), end_user.clone(), period);

        if self.bounded(self.ledger.find(&key)).await?.is_some() {
            if let Some(record) = self.refresh(&key, client_meta).await? {
                return Ok(record);
            }
        }

        let used = self
            .bounded(self.ledger.count_active(&tenant.code, &period))
            .await?;
        if let Some(ceiling) = tenant.plan.ceiling.limit()
            && tenant.plan.ceiling.is_reached(used)
        {
            self.metrics.increment_quota_rejections();
            warn!(%period, used, ceiling, "session limit reached");
            return Err(GatewayError::QuotaExceeded {
                tenant: tenant.code,
                period,
                ceiling,
                used,
            });
        }

        let record = MonthlyUsageRecord::first_seen(key.clone(), now, client_meta.clone());
        match self.bounded(self.ledger.insert(&record)).await? {
            InsertOutcome::Inserted => {
                self.metrics.increment_sessions_admitted();
                info!(%period, used = used + 1, "session admitted");
                Ok(Admission {
                    outcome: AdmissionOutcome::New,
                    record,
                })
            }
            InsertOutcome::AlreadyExists => self.refresh(&key, client_meta).await?.ok_or_else(|| {
                GatewayError::Ledger(StoreError::Backend(format!(
                    "usage row {key} reported as existing but not found"
                )))
            }),
        }
    }

    /// Active ledger rows for a period (default: current), most recently
    /// seen first.
    pub async fn list_usage(
        &self,
        tenant: &TenantCode,
        period: Option<PeriodKey>,
    ) -> Result<Vec<MonthlyUsageRecord>, GatewayError> {
        let tenant = self.tenants.resolve(tenant).await?;
        let period = period.unwrap_or_else(|| self.current_period());
        self.bounded(self.ledger.list_active(&tenant.code, &period))
            .await
    }

    /// Usage against the tenant's ceiling for a period (default: current).
    pub async fn usage_summary(
        &self,
        tenant: &TenantCode,
        period: Option<PeriodKey>,
    ) -> Result<UsageSummary, GatewayError> {
        let tenant = self.tenants.resolve(tenant).await?;
        let period = period.unwrap_or_else(|| self.current_period());
        let used = self
            .bounded(self.ledger.count_active(&tenant.code, &period))
            .await?;
        Ok(UsageSummary::new(tenant.code, period, used, tenant.plan.ceiling))
    }

    async fn refresh(
        &self,
        key: &UsageKey,
        client_meta: &ClientMeta,
    ) -> Result<Option<Admission>, GatewayError> {
        let touched = self
            .bounded(self.ledger.touch(key, self.clock.now(), client_meta))
            .await?;
        Ok(touched.map(|record| {
            self.metrics.increment_sessions_refreshed();
            info!(period = %key.period, "session refreshed");
            Admission {
                outcome: AdmissionOutcome::Refreshed,
                record,
            }
        }))
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.ledger_timeout, call)
            .await
            .map_err(|_| GatewayError::LedgerTimeout(self.ledger_timeout))?
            .map_err(GatewayError::Ledger)
    }
}
