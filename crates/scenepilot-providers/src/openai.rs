//! OpenAI-style text completions backend (`POST /completions`, SSE stream).
//!
//! Works with OpenAI itself and with self-hosted servers exposing the same
//! API (vLLM, llama.cpp server, …). Chat completions are not used: the agent
//! drives a plain-text prompt with stop sequences.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{future, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use scenepilot_core::config::BackendConfig;

use crate::registry::{resolve_api_base, BackendSpec};
use crate::stream::lines;
use crate::traits::{BackendError, ChunkStream, GenerationBackend};

/// The completions API accepts at most four stop sequences.
const MAX_STOP_SEQUENCES: usize = 4;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

pub struct OpenAiBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    spec: &'static BackendSpec,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("backend", &self.spec.display_name)
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new(
        config: &BackendConfig,
        spec: &'static BackendSpec,
        api_key: Option<String>,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_base: resolve_api_base(config, spec),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            spec,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/completions", self.api_base)
    }
}

/// Decode one SSE line. `None` skips comments, keep-alives and empty deltas.
fn decode_event(line: Result<String, BackendError>) -> Option<Result<String, BackendError>> {
    let line = match line {
        Ok(line) => line,
        Err(e) => return Some(Err(e)),
    };
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<CompletionChunk>(data) {
        Ok(CompletionChunk { error: Some(err), .. }) => Some(Err(BackendError::Stream(err.message))),
        Ok(chunk) => {
            let text: String = chunk.choices.into_iter().map(|c| c.text).collect();
            (!text.is_empty()).then_some(Ok(text))
        }
        Err(e) => Some(Err(BackendError::Stream(format!("invalid event: {}", e)))),
    }
}

fn is_done_marker(line: &Result<String, BackendError>) -> bool {
    matches!(line, Ok(l) if l.strip_prefix("data:").map(str::trim) == Some("[DONE]"))
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<ChunkStream, BackendError> {
        debug!(
            backend = self.spec.display_name,
            model = %self.model,
            prompt_chars = prompt.len(),
            "Calling generation backend"
        );

        let stop = &stop[..stop.len().min(MAX_STOP_SEQUENCES)];
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
            stop: (!stop.is_empty()).then_some(stop),
        };

        let mut builder = self.client.post(self.completions_url()).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                backend = self.spec.display_name,
                status = %status,
                body = %body,
                "API error"
            );
            return Err(BackendError::from_status(status.as_u16(), body));
        }

        let chunks = lines(response.bytes_stream())
            .take_while(|line| future::ready(!is_done_marker(line)))
            .filter_map(|line| future::ready(decode_event(line)));
        Ok(chunks.boxed())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
