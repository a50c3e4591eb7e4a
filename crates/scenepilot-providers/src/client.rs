//! Generation client — sanitizing, aggregating, retrying wrapper around a
//! [`GenerationBackend`].
//!
//! The agent loop only ever talks to this client. It sees one complete,
//! sanitized string per call, or a [`GenerationError`].

use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, warn};

use scenepilot_core::observer::{Observers, RunContext};
use scenepilot_core::sanitize;

use crate::retry::{RetryPolicy, RetryState};
use crate::traits::{BackendError, GenerationBackend};

/// Fatal generation failure. Either one ends the agent run.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: BackendError,
    },

    #[error("generation failed: {0}")]
    Backend(BackendError),
}

pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("backend", &self.backend.display_name())
            .field("model", &self.backend.model())
            .field("retry", &self.retry)
            .finish()
    }
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Generate one completion for `prompt`, halting at any of `stop`.
    ///
    /// The prompt is sanitized before it is sent; the concatenated chunks
    /// are sanitized before they are returned. A failure in the middle of
    /// the stream throws away what arrived so far and counts as a failed
    /// attempt.
    pub async fn complete(
        &self,
        prompt: &str,
        stop: &[String],
        ctx: &RunContext,
        observers: &Observers,
    ) -> Result<String, GenerationError> {
        let prompt = sanitize(prompt);
        let mut state = RetryState::default();

        loop {
            state.attempt_count += 1;

            let err = match self.attempt(&prompt, stop).await {
                Ok(text) => {
                    debug!(
                        run_id = %ctx.run_id,
                        attempts = state.attempt_count,
                        chars = text.len(),
                        "generation complete"
                    );
                    return Ok(sanitize(&text));
                }
                Err(e) => e,
            };

            if !err.is_transient() {
                warn!(run_id = %ctx.run_id, error = %err, "generation failed");
                return Err(GenerationError::Backend(err));
            }

            state.last_error = Some(err.to_string());

            if state.attempt_count >= self.retry.max_attempts {
                warn!(
                    run_id = %ctx.run_id,
                    attempts = state.attempt_count,
                    error = %err,
                    "generation retries exhausted"
                );
                return Err(GenerationError::RetriesExhausted {
                    attempts: state.attempt_count,
                    last_error: err,
                });
            }

            let delay = self.retry.delay_for(state.attempt_count);
            warn!(
                run_id = %ctx.run_id,
                attempt = state.attempt_count,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient generation failure, retrying"
            );
            observers.retry(ctx, state.attempt_count, state.last_error.as_deref().unwrap_or_default());
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, prompt: &str, stop: &[String]) -> Result<String, BackendError> {
        let mut chunks = self.backend.generate(prompt, stop).await?;
        let mut text = String::new();
        while let Some(chunk) = chunks.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
