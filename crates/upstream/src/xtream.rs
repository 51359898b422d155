use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use tracing::debug;

use streamgate_core::MediaClass;

use crate::config::UpstreamConfig;
use crate::credentials::Credentials;
use crate::error::UpstreamError;
use crate::provider::UpstreamProvider;
use crate::request::UpstreamRequest;

/// Characters left as-is in a URL path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// An [`UpstreamProvider`] speaking the Xtream-codes `player_api.php` API.
pub struct XtreamHttpProvider {
    client: reqwest::Client,
    stream_extension: String,
}

impl XtreamHttpProvider {
    /// Create a new provider from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| UpstreamError::Http(e.to_string()))?;

        Ok(Self {
            client,
            stream_extension: config.stream_extension.clone(),
        })
    }

    fn action(request: &UpstreamRequest) -> Option<&'static str> {
        Some(match request {
            UpstreamRequest::Profile => return None,
            UpstreamRequest::Categories(MediaClass::Live) => "get_live_categories",
            UpstreamRequest::Categories(MediaClass::Movies) => "get_vod_categories",
            UpstreamRequest::Categories(MediaClass::Series) => "get_series_categories",
            UpstreamRequest::Items {
                media: MediaClass::Live,
                ..
            } => "get_live_streams",
            UpstreamRequest::Items {
                media: MediaClass::Movies,
                ..
            } => "get_vod_streams",
            UpstreamRequest::Items {
                media: MediaClass::Series,
                ..
            } => "get_series",
            UpstreamRequest::MovieDetail { .. } => "get_vod_info",
            UpstreamRequest::SeriesDetail { .. } => "get_series_info",
            UpstreamRequest::Guide { .. } => "get_simple_data_table",
        })
    }
}

/// Check `user_info.auth` of a profile payload. Panels report `1` or `"1"`.
fn check_auth(profile: &Value) -> Result<(), UpstreamError> {
    let auth = profile.get("user_info").and_then(|u| u.get("auth"));
    let ok = match auth {
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => s == "1",
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(UpstreamError::Rejected(
            "provider did not authenticate the end-user".into(),
        ))
    }
}

fn stream_kind(media: MediaClass) -> &'static str {
    match media {
        MediaClass::Live => "live",
        MediaClass::Movies => "movie",
        MediaClass::Series => "series",
    }
}

#[async_trait]
impl UpstreamProvider for XtreamHttpProvider {
    async fn fetch(
        &self,
        base_url: &str,
        credentials: &Credentials,
        request: &UpstreamRequest,
    ) -> Result<Value, UpstreamError> {
        let operation = request.operation();
        debug!(operation, user = %credentials.username, "requesting upstream");

        let mut query: Vec<(&str, &str)> = vec![
            ("username", credentials.username.as_str()),
            ("password", credentials.password()),
        ];
        if let Some(action) = Self::action(request) {
            query.push(("action", action));
        }
        let params = request.params();
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        let url = format!("{}/player_api.php", base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::Http(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read body".to_owned());
            if matches!(request, UpstreamRequest::Profile)
                && matches!(status.as_u16(), 401 | 403)
            {
                return Err(UpstreamError::Rejected(format!("status {status}")));
            }
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::Parse(e.without_url().to_string())
            }
        })?;

        if matches!(request, UpstreamRequest::Profile) {
            check_auth(&payload)?;
        }
        Ok(payload)
    }

    fn playback_url(
        &self,
        base_url: &str,
        credentials: &Credentials,
        media: MediaClass,
        stream_id: &str,
    ) -> Result<String, UpstreamError> {
        let stream_id = stream_id.trim();
        if stream_id.is_empty() {
            return Err(UpstreamError::InvalidRequest("stream id is empty".into()));
        }
        Ok(format!(
            "{}/{}/{}/{}/{}.{}",
            base_url.trim_end_matches('/'),
            stream_kind(media),
            utf8_percent_encode(credentials.username.as_str(), SEGMENT),
            utf8_percent_encode(credentials.password(), SEGMENT),
            utf8_percent_encode(stream_id, SEGMENT),
            self.stream_extension,
        ))
    }
}
