//! Error types for the monitoring engine.

use reqwest::StatusCode;

/// Result alias used across the monitoring engine.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("session `{session_id}` not found")]
    NotFound { session_id: String },

    #[error("unsupported manifest type for `{url}`")]
    UnsupportedManifestType { url: String },

    #[error("master playlist `{url}` lists no variants")]
    NoVariants { url: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("failed to decode manifest `{url}`: {reason}")]
    Decode { url: String, reason: String },

    #[error("variant nesting under `{url}` exceeds depth {depth}")]
    VariantDepthExceeded { url: String, depth: usize },

    #[error("HTTP client error: {reason}")]
    Client { reason: String },

    #[error("session store is shut down")]
    ShutDown,
}

impl MonitorError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(session_id: impl Into<String>) -> Self {
        Self::NotFound {
            session_id: session_id.into(),
        }
    }

    pub fn unsupported_manifest(url: impl Into<String>) -> Self {
        Self::UnsupportedManifestType { url: url.into() }
    }

    pub fn decode(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }

    /// Transport-level failures: the remote could not be reached or answered
    /// with a non-success status.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }
}
