//! Backend registry — static specs for the supported generation backends.
//!
//! Each `BackendSpec` describes how to reach one backend: which wire
//! protocol it speaks, where it lives by default, and which env var holds
//! its API key. `create_backend` turns a `BackendConfig` into a ready
//! [`GenerationBackend`].

use std::sync::Arc;

use tracing::debug;

use scenepilot_core::config::BackendConfig;

use crate::ollama::OllamaBackend;
use crate::openai::OpenAiBackend;
use crate::traits::GenerationBackend;

// ─────────────────────────────────────────────
// BackendSpec — static metadata for one backend
// ─────────────────────────────────────────────

/// Wire protocol spoken by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireProtocol {
    /// Ollama `/api/generate`, NDJSON stream.
    Ollama,
    /// OpenAI-style `/completions`, SSE stream.
    OpenAiCompletions,
}

/// Static specification describing one generation backend.
#[derive(Clone, Debug)]
pub struct BackendSpec {
    /// Internal name, matched against `backend.kind` (e.g. `"ollama"`).
    pub name: &'static str,
    /// Human-readable name for logs.
    pub display_name: &'static str,
    pub protocol: WireProtocol,
    /// Environment variable consulted when the config has no API key.
    pub env_key: Option<&'static str>,
    /// Base URL used when the config doesn't set `apiBase`.
    pub default_api_base: &'static str,
    /// Self-hosted backend (no API key required).
    pub is_local: bool,
}

/// All supported backends.
pub static BACKENDS: &[BackendSpec] = &[
    BackendSpec {
        name: "ollama",
        display_name: "Ollama",
        protocol: WireProtocol::Ollama,
        env_key: None,
        default_api_base: "http://localhost:11434",
        is_local: true,
    },
    BackendSpec {
        name: "openai",
        display_name: "OpenAI",
        protocol: WireProtocol::OpenAiCompletions,
        env_key: Some("OPENAI_API_KEY"),
        default_api_base: "https://api.openai.com/v1",
        is_local: false,
    },
    // vLLM and other self-hosted servers exposing the OpenAI completions API
    BackendSpec {
        name: "vllm",
        display_name: "vLLM",
        protocol: WireProtocol::OpenAiCompletions,
        env_key: None,
        default_api_base: "http://localhost:8000/v1",
        is_local: true,
    },
];

/// Find a backend spec by its internal name (case-insensitive).
pub fn find_by_name(name: &str) -> Option<&'static BackendSpec> {
    let lower = name.to_lowercase();
    BACKENDS.iter().find(|s| s.name == lower)
}

/// API base for a backend: config value, else the spec default.
pub fn resolve_api_base(config: &BackendConfig, spec: &BackendSpec) -> String {
    config
        .api_base
        .as_deref()
        .filter(|b| !b.is_empty())
        .unwrap_or(spec.default_api_base)
        .trim_end_matches('/')
        .to_string()
}

/// API key for a backend: config value, else the spec's env var.
pub fn resolve_api_key(config: &BackendConfig, spec: &BackendSpec) -> Option<String> {
    if !config.api_key.is_empty() {
        return Some(config.api_key.clone());
    }
    spec.env_key
        .and_then(|key| std::env::var(key).ok())
        .filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────

/// Build the backend named by `config.kind`.
///
/// Fails for an unknown kind, for a hosted backend without an API key, or
/// when the HTTP client cannot be built.
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn GenerationBackend>, String> {
    let spec = find_by_name(&config.kind).ok_or_else(|| {
        let known: Vec<&str> = BACKENDS.iter().map(|s| s.name).collect();
        format!(
            "Unknown backend '{}'. Supported backends: {}",
            config.kind,
            known.join(", ")
        )
    })?;

    let api_key = resolve_api_key(config, spec);
    if api_key.is_none() && !spec.is_local {
        return Err(format!(
            "Backend '{}' needs an API key. Set backend.apiKey in the config or {}.",
            spec.name,
            spec.env_key.unwrap_or("SCENEPILOT_BACKEND__API_KEY")
        ));
    }

    debug!(
        backend = spec.display_name,
        model = %config.model,
        api_base = %resolve_api_base(config, spec),
        "Creating generation backend"
    );

    let backend: Arc<dyn GenerationBackend> = match spec.protocol {
        WireProtocol::Ollama => {
            Arc::new(OllamaBackend::new(config, spec).map_err(|e| e.to_string())?)
        }
        WireProtocol::OpenAiCompletions => {
            Arc::new(OpenAiBackend::new(config, spec, api_key).map_err(|e| e.to_string())?)
        }
    };
    Ok(backend)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
