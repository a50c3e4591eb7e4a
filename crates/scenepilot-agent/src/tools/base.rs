//! Tool trait — the interface every agent tool implements.
//!
//! Tools take the raw `Action Input` text the model produced (already
//! sanitized) and return the observation text, or a [`ToolError`] which the
//! loop renders back to the model as an observation.

use async_trait::async_trait;
use thiserror::Error;

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

/// Failure of a single tool invocation. Never fatal to a run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ToolError {
    /// The argument text couldn't be parsed or validated; nothing was sent.
    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    /// The request was sent but failed (transport error or non-2xx status).
    #[error("request failed ({}): {body}", status_label(.status))]
    ExecutionFailed { status: Option<u16>, body: String },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => "no response".to_string(),
    }
}

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The loop lists tools to the model via `name()` / `description()` and
/// dispatches `Action:` decisions via `call()`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses in `Action:` lines (e.g. `"requests_get"`).
    fn name(&self) -> &str;

    /// Model-facing description, including the expected input format.
    fn description(&self) -> &str;

    /// Run the tool on the raw `Action Input` text.
    async fn call(&self, input: &str) -> Result<String, ToolError>;

    /// `name: description` line used in the prompt's tool list.
    fn prompt_line(&self) -> String {
        format!("{}: {}", self.name(), self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ToolError::InvalidInput("missing url".into()).to_string(),
            "invalid tool input: missing url"
        );
        assert_eq!(
            ToolError::ExecutionFailed { status: Some(404), body: "not found".into() }.to_string(),
            "request failed (HTTP 404): not found"
        );
        assert_eq!(
            ToolError::ExecutionFailed { status: None, body: "connection refused".into() }.to_string(),
            "request failed (no response): connection refused"
        );
        assert_eq!(ToolError::UnknownTool("x".into()).to_string(), "unknown tool 'x'");
    }

    #[tokio::test]
    async fn test_prompt_line_default() {
        struct DummyTool;

        #[async_trait]
        impl Tool for DummyTool {
            fn name(&self) -> &str { "dummy" }
            fn description(&self) -> &str { "A test tool" }
            async fn call(&self, input: &str) -> Result<String, ToolError> {
                Ok(input.to_uppercase())
            }
        }

        assert_eq!(DummyTool.prompt_line(), "dummy: A test tool");
        assert_eq!(DummyTool.call("ok").await.unwrap(), "OK");
    }
}
