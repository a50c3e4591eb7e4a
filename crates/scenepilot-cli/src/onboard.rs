//! `scenepilot onboard` — write a default config and create the data dirs.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use scenepilot_core::config::{get_config_path, load_config, save_config};
use scenepilot_core::utils::get_history_path;

/// Run the onboard command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    println!();
    println!("{}", "🎬 Scenepilot — Setup".cyan().bold());
    println!();

    let config_path = config_path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    write_default_config(&config_path)?;

    if let Some(history_dir) = get_history_path().parent() {
        std::fs::create_dir_all(history_dir)?;
        println!("  {} history dir at {}", "✓".green(), history_dir.display());
    }

    println!();
    println!(
        "{}",
        "  Setup complete! Point apiSpec at your scene service, then run `scenepilot serve`.".green()
    );
    println!();
    Ok(())
}

/// Write the config (defaults + env overrides) unless one already exists.
/// Returns whether a file was written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        println!("  {} config already exists at {}", "✓".green(), path.display());
        return Ok(false);
    }
    let config = load_config(Some(path));
    save_config(&config, Some(path))?;
    println!("  {} created config at {}", "✓".green(), path.display());
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
