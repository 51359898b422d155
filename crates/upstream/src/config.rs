use serde::Deserialize;

/// Configuration for the HTTP upstream provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// `User-Agent` header sent upstream.
    pub user_agent: String,
    /// File extension used in playback URLs.
    pub stream_extension: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: format!("streamgate/{}", env!("CARGO_PKG_VERSION")),
            stream_extension: "m3u8".to_owned(),
        }
    }
}
