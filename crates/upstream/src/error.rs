use thiserror::Error;

/// Errors returned by an upstream content provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// The request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with a non-success status.
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request did not complete in time.
    #[error("upstream request timed out")]
    Timeout,

    /// The response body was not the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The provider refused the end-user's credentials.
    #[error("credentials rejected: {0}")]
    Rejected(String),

    /// The request cannot be expressed against this provider.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl UpstreamError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Parse(_) | Self::Rejected(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Whether the provider refused the end-user's credentials, either in
    /// the payload or with a 401/403 status.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Rejected(_) => true,
            Self::Status { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}
