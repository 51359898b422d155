use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use streamgate_gateway::GatewayError;

/// Errors that can occur when running the streamgate server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A gateway-level error surfaced through the API.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The request could not be parsed or is missing fields.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ServerError {
    /// Stable machine-readable label, carried in every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Io(_) => "io",
            Self::Gateway(e) => e.kind(),
            Self::BadRequest(_) => "bad_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Gateway(e) => match e {
                GatewayError::TenantNotFound(_) => StatusCode::NOT_FOUND,
                GatewayError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
                GatewayError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
                GatewayError::Ledger(_)
                | GatewayError::LedgerTimeout(_)
                | GatewayError::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
                GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                GatewayError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string(), "kind": self.kind() });

        if let Self::Gateway(e) = &self {
            match e {
                GatewayError::QuotaExceeded {
                    ceiling,
                    used,
                    period,
                    ..
                } => {
                    body["ceiling"] = json!(ceiling);
                    body["used"] = json!(used);
                    body["period"] = json!(period);
                }
                GatewayError::Upstream(_)
                | GatewayError::Ledger(_)
                | GatewayError::LedgerTimeout(_)
                | GatewayError::Directory(_) => {
                    body["retryable"] = json!(e.is_retryable());
                }
                _ => {}
            }
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::to_bytes;
    use serde_json::Value;
    use streamgate_core::{EndUserId, PeriodKey, TenantCode};
    use streamgate_store::StoreError;
    use streamgate_upstream::UpstreamError;

    use super::*;

    async fn render(err: ServerError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn quota_exceeded_carries_usage() {
        let (status, body) = render(ServerError::Gateway(GatewayError::QuotaExceeded {
            tenant: TenantCode::new("042"),
            period: PeriodKey::new(2024, 7).unwrap(),
            ceiling: 2,
            used: 2,
        }))
        .await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["kind"], "quota_exceeded");
        assert_eq!(body["ceiling"], 2);
        assert_eq!(body["used"], 2);
        assert_eq!(body["period"], "2024-07");
    }

    #[tokio::test]
    async fn status_mapping() {
        let cases = [
            (
                ServerError::Gateway(GatewayError::TenantNotFound(TenantCode::new("x"))),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::Gateway(GatewayError::InvalidCredentials(EndUserId::new("a"))),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServerError::Gateway(GatewayError::Upstream(UpstreamError::Timeout)),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ServerError::Gateway(GatewayError::Ledger(StoreError::Timeout(
                    Duration::from_secs(2),
                ))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServerError::Gateway(GatewayError::InvalidRequest("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::BadRequest("missing tenant".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            let kind = err.kind();
            let (status, body) = render(err).await;
            assert_eq!(status, expected, "{kind}");
            assert_eq!(body["kind"], kind);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn upstream_retry_hint_follows_the_failure() {
        let (_, body) = render(ServerError::Gateway(GatewayError::Upstream(
            UpstreamError::Http("connection refused".into()),
        )))
        .await;
        assert_eq!(body["retryable"], true);
        assert_eq!(body["kind"], "upstream_error");

        let (status, body) = render(ServerError::Gateway(GatewayError::Upstream(
            UpstreamError::Status {
                status: 404,
                message: "no such category".into(),
            },
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["retryable"], false);
    }
}
