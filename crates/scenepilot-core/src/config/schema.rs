//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentSettings`, `BackendConfig`, `RetryConfig`,
//! `ApiSpecConfig`, `ServerConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! Every section is `#[serde(default)]`, so a partial file is fine.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.scenepilot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentSettings,
    pub backend: BackendConfig,
    pub retry: RetryConfig,
    pub api_spec: ApiSpecConfig,
    pub server: ServerConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Bounds of a single agent run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Maximum tool steps before the run fails with `step_limit`.
    pub max_steps: usize,
    /// Malformed outputs in a row before the run fails with `unparsable`.
    pub max_malformed: usize,
    /// Tool observations longer than this (in characters) are truncated.
    pub max_response_length: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 10,
            max_malformed: 3,
            max_response_length: 5000,
        }
    }
}

// ─────────────────────────────────────────────
// Generation backend
// ─────────────────────────────────────────────

/// Text-generation backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    /// Backend kind: `"ollama"` or `"openai"`.
    pub kind: String,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Custom API base URL (overrides the backend default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// API key (only needed by hosted backends).
    pub api_key: String,
    /// Sampling temperature; 0.0 keeps runs reproducible.
    pub temperature: f64,
    /// Maximum tokens per generation.
    pub max_tokens: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Check (and pull) the model at startup when the backend supports it.
    pub ensure_model: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: "ollama".to_string(),
            model: "llama3.1:8b".to_string(),
            api_base: None,
            api_key: String::new(),
            temperature: 0.0,
            max_tokens: 1024,
            timeout_secs: 120,
            ensure_model: true,
        }
    }
}

/// Backoff schedule for transient generation failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            multiplier: 2.0,
            max_backoff_ms: 8000,
        }
    }
}

// ─────────────────────────────────────────────
// API description
// ─────────────────────────────────────────────

/// Where the scene service's API description comes from.
///
/// `path` wins over `url` when both are set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSpecConfig {
    /// URL of the service's `openapi.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Local file with a full or already-reduced description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Overrides the server URL declared in the description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    /// Timeout for each tool HTTP call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiSpecConfig {
    fn default() -> Self {
        Self {
            url: Some("http://localhost:8000/openapi.json".to_string()),
            path: None,
            server_url: Some("http://localhost:8000".to_string()),
            request_timeout_secs: 30,
        }
    }
}

// ─────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────

/// Inbound HTTP surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Route accepting `{query}` and returning `{result}`.
    pub route: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            route: "/api_interaction".to_string(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.agent.max_malformed, 3);
        assert_eq!(config.agent.max_response_length, 5000);
        assert_eq!(config.backend.kind, "ollama");
        assert_eq!(config.backend.temperature, 0.0);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.server.port, 8001);
    }

    #[test]
    fn test_camel_case_keys() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert!(json["agent"].get("maxSteps").is_some());
        assert!(json["apiSpec"].get("serverUrl").is_some());
        assert!(json["retry"].get("initialBackoffMs").is_some());
        assert!(json["backend"].get("apiBase").is_none());
    }

    #[test]
    fn test_partial_json() {
        let config: Config = serde_json::from_str(
            r#"{ "backend": { "kind": "openai", "model": "gpt-3.5-turbo-instruct" } }"#,
        )
        .unwrap();
        assert_eq!(config.backend.kind, "openai");
        assert_eq!(config.backend.timeout_secs, 120);
        assert_eq!(config.agent.max_steps, 10);
    }

    #[test]
    fn test_bind_addr() {
        assert_eq!(ServerConfig::default().bind_addr(), "127.0.0.1:8001");
    }
}
