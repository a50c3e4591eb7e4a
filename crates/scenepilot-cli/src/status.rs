//! `scenepilot status` — show configuration and backend status.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use scenepilot_core::config::{get_config_path, load_config};
use scenepilot_providers::registry::{find_by_name, resolve_api_base, resolve_api_key, BACKENDS};

use crate::app::spec_source;

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let config_path = config_path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

    println!();
    println!("{}", "🎬 Scenepilot Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );

    // Backend
    let backend = &config.backend;
    let api_base = find_by_name(&backend.kind)
        .map(|spec| resolve_api_base(backend, spec))
        .unwrap_or_else(|| "(unknown backend)".red().to_string());
    println!("  {:<18} {} ({})", "Backend:".bold(), backend.kind, api_base);
    println!("  {:<18} {}", "Model:".bold(), backend.model);
    println!(
        "  {:<18} {} | max_tokens: {} | timeout: {}s",
        "Parameters:".bold(),
        format!("temp: {}", backend.temperature).dimmed(),
        backend.max_tokens.to_string().dimmed(),
        backend.timeout_secs.to_string().dimmed(),
    );

    // Agent bounds + retry
    println!(
        "  {:<18} max_steps: {} | max_malformed: {} | max_response_length: {}",
        "Agent:".bold(),
        config.agent.max_steps,
        config.agent.max_malformed,
        config.agent.max_response_length,
    );
    println!(
        "  {:<18} {} attempts, {}ms ×{} (cap {}ms)",
        "Retry:".bold(),
        config.retry.max_attempts,
        config.retry.initial_backoff_ms,
        config.retry.multiplier,
        config.retry.max_backoff_ms,
    );

    // Scene API
    println!();
    println!("  {:<18} {}", "API description:".bold(), spec_source(&config.api_spec));
    if let Some(url) = &config.api_spec.server_url {
        println!("  {:<18} {}", "Server override:".bold(), url);
    }
    println!(
        "  {:<18} http://{}{}",
        "Serving at:".bold(),
        config.server.bind_addr(),
        config.server.route
    );

    // Backends
    println!();
    println!("  {}", "Backends:".bold());
    for spec in BACKENDS {
        let status = if spec.is_local {
            format!("{}", "· local".dimmed())
        } else if resolve_api_key(backend, spec).is_some() {
            format!("{} (key set)", "✓".green())
        } else {
            format!("{}", "· no key".dimmed())
        };
        let active = if spec.name == backend.kind { " ←".cyan().to_string() } else { String::new() };
        println!("    {:<20} {}{}", spec.display_name, status, active);
    }

    println!();
    Ok(())
}
