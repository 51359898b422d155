//! Session registration endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use streamgate_core::{ClientMeta, EndUserId, PeriodKey, TenantCode};
use streamgate_gateway::AdmissionOutcome;

use super::AppState;
use crate::error::ServerError;

/// Request body for `POST /v1/access`.
#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Response body for an admitted session.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub accepted: bool,
    pub outcome: AdmissionOutcome,
    pub period: PeriodKey,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Profile returned by the credential check, without the password.
    pub profile: Value,
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client metadata from request headers: the `User-Agent`, and the first
/// `X-Forwarded-For` hop falling back to `X-Real-IP`.
pub fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let user_agent = header_value(headers, USER_AGENT.as_str()).unwrap_or_default();
    let ip_address = header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or_default();
    ClientMeta::new(user_agent, ip_address)
}

/// `POST /v1/access` -- verify credentials and admit the session against
/// the tenant's monthly ceiling.
pub async fn register_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AccessRequest>,
) -> Result<Json<AccessResponse>, ServerError> {
    if body.tenant.trim().is_empty() {
        return Err(ServerError::BadRequest("tenant is required".into()));
    }
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ServerError::BadRequest(
            "username and password are required".into(),
        ));
    }

    let grant = state
        .gateway
        .register_access(
            &TenantCode::new(&body.tenant),
            &EndUserId::new(&body.username),
            &body.password,
            &client_meta(&headers),
        )
        .await?;

    let record = grant.admission.record;
    Ok(Json(AccessResponse {
        accepted: true,
        outcome: grant.admission.outcome,
        period: record.period,
        first_seen_at: record.first_seen_at,
        last_seen_at: record.last_seen_at,
        profile: grant.profile,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn forwarded_for_first_hop_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("VLC/3.0"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));

        let meta = client_meta(&headers);
        assert_eq!(meta.user_agent, "VLC/3.0");
        assert_eq!(meta.ip_address, "203.0.113.7");
    }

    #[test]
    fn real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        let meta = client_meta(&headers);
        assert_eq!(meta.user_agent, "");
        assert_eq!(meta.ip_address, "198.51.100.4");
    }

    #[test]
    fn no_headers_is_empty_meta() {
        assert_eq!(client_meta(&HeaderMap::new()), ClientMeta::default());
    }
}
