//! Ollama backend — `POST /api/generate` with an NDJSON response stream.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use scenepilot_core::config::BackendConfig;

use crate::registry::{resolve_api_base, BackendSpec};
use crate::stream::lines;
use crate::traits::{BackendError, ChunkStream, GenerationBackend};

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    temperature: f64,
    num_predict: u32,
    stop: &'a [String],
}

/// One NDJSON line of a generate stream. The final line carries
/// `"done": true` and an empty `response`.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

// ─────────────────────────────────────────────
// OllamaBackend
// ─────────────────────────────────────────────

pub struct OllamaBackend {
    client: reqwest::Client,
    api_base: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    ensure_model: bool,
    spec: &'static BackendSpec,
}

impl std::fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig, spec: &'static BackendSpec) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_base: resolve_api_base(config, spec),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            ensure_model: config.ensure_model,
            spec,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.api_base, endpoint)
    }

    async fn model_present(&self) -> Result<bool, BackendError> {
        let response = self
            .client
            .post(self.url("show"))
            .json(&serde_json::json!({ "model": self.model }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::from_status(status.as_u16(), body))
    }

    async fn pull_model(&self) -> Result<(), BackendError> {
        info!(model = %self.model, "Pulling model, this may take a while");
        let response = self
            .client
            .post(self.url("pull"))
            .json(&serde_json::json!({ "model": self.model, "stream": false }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(model = %self.model, "Model pulled");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        warn!(model = %self.model, status = %status, body = %body, "Model pull failed");
        Err(BackendError::ModelUnavailable(self.model.clone()))
    }
}

fn decode_chunk(line: Result<String, BackendError>) -> Option<Result<String, BackendError>> {
    let line = match line {
        Ok(line) => line,
        Err(e) => return Some(Err(e)),
    };
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<GenerateChunk>(&line) {
        Ok(GenerateChunk { error: Some(err), .. }) => Some(Err(BackendError::Stream(err))),
        Ok(chunk) if chunk.response.is_empty() => None,
        Ok(chunk) => Some(Ok(chunk.response)),
        Err(e) => Some(Err(BackendError::Stream(format!("invalid chunk: {}", e)))),
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(&self, prompt: &str, stop: &[String]) -> Result<ChunkStream, BackendError> {
        debug!(
            backend = self.spec.display_name,
            model = %self.model,
            prompt_chars = prompt.len(),
            "Calling generation backend"
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
                stop,
            },
        };

        let response = self.client.post(self.url("generate")).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(BackendError::ModelUnavailable(self.model.clone()));
            }
            return Err(BackendError::from_status(status.as_u16(), body));
        }

        let chunks = lines(response.bytes_stream())
            .filter_map(|line| futures_util::future::ready(decode_chunk(line)));
        Ok(chunks.boxed())
    }

    /// Make sure the model is available locally, pulling it when missing.
    async fn prepare(&self) -> Result<(), BackendError> {
        if !self.ensure_model {
            return Ok(());
        }
        if self.model_present().await? {
            debug!(model = %self.model, "Model already available");
            return Ok(());
        }
        self.pull_model().await
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
