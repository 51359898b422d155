//! Usage reporting endpoint.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use streamgate_core::{MonthlyUsageRecord, PeriodKey, TenantCode, UsageSummary};

use super::AppState;
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// `YYYY-MM`; defaults to the current period.
    pub period: Option<String>,
}

/// Usage summary for one tenant and period, with the counted sessions.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    #[serde(flatten)]
    pub summary: UsageSummary,
    pub sessions: Vec<MonthlyUsageRecord>,
}

/// `GET /v1/tenants/{code}/usage?period=YYYY-MM`
pub async fn usage(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>, ServerError> {
    let period = query
        .period
        .as_deref()
        .map(str::parse::<PeriodKey>)
        .transpose()
        .map_err(|e| ServerError::BadRequest(format!("invalid period: {e}")))?;

    let tenant = TenantCode::new(&code);
    let quota = state.gateway.quota();
    let summary = quota.usage_summary(&tenant, period).await?;
    let sessions = quota.list_usage(&tenant, Some(summary.period)).await?;

    Ok(Json(UsageResponse { summary, sessions }))
}
