use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use streamgate_core::MediaClass;

use crate::credentials::Credentials;
use crate::error::UpstreamError;
use crate::provider::UpstreamProvider;
use crate::request::UpstreamRequest;

/// A stub provider that answers every request with a canned payload.
///
/// Tracks the number of `fetch` calls so tests can verify caching
/// behaviour. The profile answer echoes the username and, like real
/// panels, includes the password.
pub struct MockUpstream {
    responses: HashMap<&'static str, Value>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUpstream {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer `operation` (see [`UpstreamRequest::operation`]) with `payload`.
    #[must_use]
    pub fn with_response(mut self, operation: &'static str, payload: Value) -> Self {
        self.responses.insert(operation, payload);
        self
    }

    /// Sleep before answering, to exercise timeouts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times [`fetch`](UpstreamProvider::fetch) was called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl UpstreamProvider for MockUpstream {
    async fn fetch(
        &self,
        _base_url: &str,
        credentials: &Credentials,
        request: &UpstreamRequest,
    ) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(payload) = self.responses.get(request.operation()) {
            return Ok(payload.clone());
        }
        Ok(match request {
            UpstreamRequest::Profile => json!({
                "user_info": {
                    "auth": 1,
                    "username": credentials.username.as_str(),
                    "password": credentials.password(),
                    "status": "Active",
                },
            }),
            other => json!([{ "operation": other.operation(), "params": other.params() }]),
        })
    }

    fn playback_url(
        &self,
        base_url: &str,
        credentials: &Credentials,
        media: MediaClass,
        stream_id: &str,
    ) -> Result<String, UpstreamError> {
        Ok(format!(
            "{base_url}/{media}/{}/{stream_id}",
            credentials.username
        ))
    }
}

/// A provider whose every call fails with the configured error.
pub struct FailingUpstream {
    error: UpstreamError,
    calls: AtomicUsize,
}

impl Default for FailingUpstream {
    fn default() -> Self {
        Self::new(UpstreamError::Http("connection refused".to_owned()))
    }
}

impl FailingUpstream {
    pub fn new(error: UpstreamError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl UpstreamProvider for FailingUpstream {
    async fn fetch(
        &self,
        _base_url: &str,
        _credentials: &Credentials,
        _request: &UpstreamRequest,
    ) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(self.error.clone())
    }

    fn playback_url(
        &self,
        _base_url: &str,
        _credentials: &Credentials,
        _media: MediaClass,
        _stream_id: &str,
    ) -> Result<String, UpstreamError> {
        Err(self.error.clone())
    }
}

/// A provider that refuses every credential.
pub struct RejectingUpstream;

#[async_trait]
impl UpstreamProvider for RejectingUpstream {
    async fn fetch(
        &self,
        _base_url: &str,
        _credentials: &Credentials,
        request: &UpstreamRequest,
    ) -> Result<Value, UpstreamError> {
        match request {
            UpstreamRequest::Profile => Err(UpstreamError::Rejected("wrong password".to_owned())),
            _ => Err(UpstreamError::Status {
                status: 401,
                message: "unauthorized".to_owned(),
            }),
        }
    }

    fn playback_url(
        &self,
        _base_url: &str,
        _credentials: &Credentials,
        _media: MediaClass,
        _stream_id: &str,
    ) -> Result<String, UpstreamError> {
        Err(UpstreamError::Rejected("wrong password".to_owned()))
    }
}
