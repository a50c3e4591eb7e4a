//! Generation backend trait — the raw text-generation capability.
//!
//! A backend turns `(prompt, stop sequences)` into a stream of text chunks.
//! It knows nothing about sanitization or retries; those live in
//! [`crate::client::GenerationClient`], which wraps any backend.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

/// Stream of partial completions in arrival order.
pub type ChunkStream = BoxStream<'static, Result<String, BackendError>>;

/// Failure of a single backend call.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BackendError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by backend")]
    RateLimited,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("backend returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response stream: {0}")]
    Stream(String),

    #[error("model '{0}' is not available")]
    ModelUnavailable(String),

    #[error("backend misconfigured: {0}")]
    Config(String),
}

impl BackendError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Timeout | BackendError::RateLimited | BackendError::Connect(_) => true,
            BackendError::Http { status, .. } => *status >= 500 || *status == 408,
            BackendError::Stream(_) | BackendError::ModelUnavailable(_) | BackendError::Config(_) => false,
        }
    }

    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 {
            BackendError::RateLimited
        } else {
            BackendError::Http { status, body }
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            BackendError::from_status(status.as_u16(), e.to_string())
        } else if e.is_decode() || e.is_body() {
            BackendError::Stream(e.to_string())
        } else {
            BackendError::Connect(e.to_string())
        }
    }
}

/// A raw text-generation backend (Ollama, OpenAI completions, …).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Start a generation. Chunks are yielded in arrival order; the stream
    /// ends when the backend reports completion.
    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<ChunkStream, BackendError>;

    /// One-time startup preparation (e.g. making sure the model is pulled).
    async fn prepare(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Model identifier in use.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Timeout.is_transient());
        assert!(BackendError::RateLimited.is_transient());
        assert!(BackendError::Connect("refused".into()).is_transient());
        assert!(BackendError::Http { status: 503, body: String::new() }.is_transient());
        assert!(!BackendError::Http { status: 400, body: String::new() }.is_transient());
        assert!(!BackendError::Stream("bad json".into()).is_transient());
        assert!(!BackendError::ModelUnavailable("m".into()).is_transient());
    }

    #[test]
    fn test_from_status_rate_limit() {
        assert_eq!(BackendError::from_status(429, "slow down".into()), BackendError::RateLimited);
        assert_eq!(
            BackendError::from_status(404, "nope".into()),
            BackendError::Http { status: 404, body: "nope".into() }
        );
    }
}
