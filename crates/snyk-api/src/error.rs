//! Snyk API error types

/// Errors talking to the Snyk REST API.
#[derive(Debug, thiserror::Error)]
pub enum SnykApiError {
    /// The HTTP client could not be constructed
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Transport-level failure (DNS, connect, reset)
    #[error("{method} {url} failed: {source}")]
    Http {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response status is not in the allowed set
    #[error("{method} {url} responded with status code {status}")]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
    },

    /// No response within the per-request timeout
    #[error("{method} {url} timed out")]
    Timeout { method: String, url: String },

    /// The response body did not match the expected JSON shape
    #[error("failed to decode response of {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SnykApiError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            Self::ClientBuild(_) | Self::Decode { .. } => false,
        }
    }
}
