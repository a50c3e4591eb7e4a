//! Config loader — reads `~/.scenepilot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.scenepilot/config.json` (or an explicit path)
//! 3. Environment variables `SCENEPILOT_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given path (or the default path) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `SCENEPILOT_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `SCENEPILOT_AGENT__MAX_STEPS`, `SCENEPILOT_AGENT__MAX_MALFORMED`,
///   `SCENEPILOT_AGENT__MAX_RESPONSE_LENGTH`
/// - `SCENEPILOT_BACKEND__KIND`, `__MODEL`, `__API_BASE`, `__API_KEY`,
///   `__TEMPERATURE`, `__TIMEOUT_SECS`
/// - `SCENEPILOT_RETRY__MAX_ATTEMPTS`
/// - `SCENEPILOT_API_SPEC__URL`, `__PATH`, `__SERVER_URL`
/// - `SCENEPILOT_SERVER__HOST`, `SCENEPILOT_SERVER__PORT`
fn apply_env_overrides(mut config: Config) -> Config {
    // Agent
    parse_env("SCENEPILOT_AGENT__MAX_STEPS", &mut config.agent.max_steps);
    parse_env("SCENEPILOT_AGENT__MAX_MALFORMED", &mut config.agent.max_malformed);
    parse_env(
        "SCENEPILOT_AGENT__MAX_RESPONSE_LENGTH",
        &mut config.agent.max_response_length,
    );

    // Backend
    if let Ok(val) = std::env::var("SCENEPILOT_BACKEND__KIND") {
        config.backend.kind = val;
    }
    if let Ok(val) = std::env::var("SCENEPILOT_BACKEND__MODEL") {
        config.backend.model = val;
    }
    if let Ok(val) = std::env::var("SCENEPILOT_BACKEND__API_BASE") {
        config.backend.api_base = Some(val);
    }
    if let Ok(val) = std::env::var("SCENEPILOT_BACKEND__API_KEY") {
        config.backend.api_key = val;
    }
    parse_env("SCENEPILOT_BACKEND__TEMPERATURE", &mut config.backend.temperature);
    parse_env("SCENEPILOT_BACKEND__TIMEOUT_SECS", &mut config.backend.timeout_secs);

    // Retry
    parse_env("SCENEPILOT_RETRY__MAX_ATTEMPTS", &mut config.retry.max_attempts);

    // API description
    if let Ok(val) = std::env::var("SCENEPILOT_API_SPEC__URL") {
        config.api_spec.url = Some(val);
    }
    if let Ok(val) = std::env::var("SCENEPILOT_API_SPEC__PATH") {
        config.api_spec.path = Some(val);
    }
    if let Ok(val) = std::env::var("SCENEPILOT_API_SPEC__SERVER_URL") {
        config.api_spec.server_url = Some(val);
    }

    // Server
    if let Ok(val) = std::env::var("SCENEPILOT_SERVER__HOST") {
        config.server.host = val;
    }
    parse_env("SCENEPILOT_SERVER__PORT", &mut config.server.port);

    config
}

/// Overwrite `target` with the parsed env var, ignoring unparseable values.
fn parse_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(val) = std::env::var(key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(key = key, value = %val, "ignoring unparseable env override"),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
