//! Error handling for lazyreq

use std::sync::Arc;

use thiserror::Error;

/// Boxed error produced by a [`Transport`](crate::transport::Transport) or a response hook
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for lazyreq operations
///
/// Errors are `Clone` so that a request can hand the same sticky error to
/// every caller that asks for a result after it was recorded.
#[derive(Error, Debug, Clone)]
pub enum LazyreqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("[lazyreq] {method} {url} already sent, cannot set request params")]
    AlreadySent { method: String, url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("[lazyreq] {method} {url} new request failed: {message}")]
    Build {
        method: String,
        url: String,
        message: String,
    },

    #[error("[lazyreq] {method} {url} send request failed: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("[lazyreq] {method} {url} {phase} failed: deadline exceeded")]
    Timeout {
        method: String,
        url: String,
        phase: &'static str,
    },

    #[error("[lazyreq] {method} {url} was abandoned while in flight")]
    Abandoned { method: String, url: String },

    #[error("[lazyreq] {method} {url} read response failed: {source}")]
    Read {
        method: String,
        url: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("[lazyreq] {method} {url} unmarshal {payload} to {target} failed: {source}")]
    Decode {
        method: String,
        url: String,
        payload: String,
        target: &'static str,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("JSON encoding error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("Cookie store error: {0}")]
    CookieStore(String),
}

impl LazyreqError {
    /// True for errors that stay local to a single decode call.
    pub fn is_decode(&self) -> bool {
        matches!(self, LazyreqError::Decode { .. })
    }

    /// True when a deadline or timeout ended the request.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LazyreqError::Timeout { .. })
    }
}

impl From<std::io::Error> for LazyreqError {
    fn from(err: std::io::Error) -> Self {
        LazyreqError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for LazyreqError {
    fn from(err: serde_json::Error) -> Self {
        LazyreqError::Json(Arc::new(err))
    }
}

/// Result type alias for lazyreq operations
pub type Result<T> = std::result::Result<T, LazyreqError>;
