//! Startup wiring — config → API description → tools + backend → agent.
//!
//! Startup sequence:
//! 1. Load the API description (local file wins over URL)
//! 2. Build the tool registry over an HTTP executor
//! 3. Create the generation backend and prepare it (model check/pull)
//! 4. Wrap it in a retrying client and assemble the `AgentLoop`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use scenepilot_agent::{AgentConfig, AgentLoop, HttpExecutor, ToolRegistry};
use scenepilot_core::apispec::ReducedSpec;
use scenepilot_core::config::{ApiSpecConfig, Config};
use scenepilot_providers::{create_backend, GenerationClient, RetryPolicy};

use crate::helpers;

/// Everything a command needs to carry out instructions.
pub struct App {
    pub config: Config,
    pub agent: Arc<AgentLoop>,
}

/// Build the agent from the loaded configuration.
pub async fn build_app(config: Config) -> Result<App> {
    let tools = Arc::new(build_registry(&config).await?);

    let backend = create_backend(&config.backend).map_err(anyhow::Error::msg)?;
    backend
        .prepare()
        .await
        .with_context(|| format!("failed to prepare backend '{}'", config.backend.kind))?;

    let client = Arc::new(GenerationClient::new(backend, RetryPolicy::from(&config.retry)));
    let retry = client.retry_policy();
    info!(
        backend = client.backend().display_name(),
        model = client.backend().model(),
        attempts = retry.max_attempts,
        initial_backoff_ms = retry.initial_backoff.as_millis() as u64,
        "backend ready"
    );
    let agent = AgentLoop::new(client, tools, AgentConfig::from(&config.agent));

    Ok(App {
        config,
        agent: Arc::new(agent),
    })
}

/// Load the API description and derive the request tools from it.
pub async fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let spec = load_spec(&config.api_spec).await?;
    let timeout = Duration::from_secs(config.api_spec.request_timeout_secs);
    let executor = HttpExecutor::new(timeout).context("failed to build HTTP client for tools")?;

    let registry = ToolRegistry::from_spec(&spec, Arc::new(executor), config.agent.max_response_length);
    if registry.is_empty() {
        bail!("the API description at {} has no endpoints", spec_source(&config.api_spec));
    }
    Ok(registry)
}

/// Read a full or already-reduced description from `path` or `url`.
pub async fn load_spec(config: &ApiSpecConfig) -> Result<ReducedSpec> {
    let document: serde_json::Value = if let Some(path) = &config.path {
        let path = helpers::expand_tilde(path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read API description {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("API description {} is not valid JSON", path.display()))?
    } else if let Some(url) = &config.url {
        info!(url = %url, "fetching API description");
        reqwest::get(url)
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("failed to fetch API description from {url}"))?
            .json()
            .await
            .with_context(|| format!("API description at {url} is not valid JSON"))?
    } else {
        bail!("no API description configured: set apiSpec.path or apiSpec.url");
    };

    ReducedSpec::from_document(document, config.server_url.as_deref())
        .with_context(|| format!("failed to reduce API description from {}", spec_source(config)))
}

/// Human-readable origin of the description.
pub fn spec_source(config: &ApiSpecConfig) -> String {
    config
        .path
        .clone()
        .or_else(|| config.url.clone())
        .unwrap_or_else(|| "(none)".to_string())
}
