//! Shared CLI helpers — path expansion, answer printing, version banner.

use std::path::PathBuf;

use colored::Colorize;

use scenepilot_agent::{AgentError, AgentOutput, StepAction, ToolRegistry};

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print the answer of a finished run, with a one-line step summary.
pub fn print_answer(output: &AgentOutput, show_steps: bool) {
    println!();
    if show_steps {
        for (i, step) in output.steps.iter().enumerate() {
            let label = match &step.action {
                StepAction::Tool(name) => name.yellow().to_string(),
                StepAction::Finish => "finish".green().to_string(),
                StepAction::InvalidFormat => "invalid_format".red().to_string(),
            };
            println!("  {} {} {}", format!("{:>2}.", i + 1).dimmed(), label, step.action_input.dimmed());
        }
        println!();
    }
    println!("{}", "🎬 Scenepilot".cyan().bold());
    if output.answer.is_empty() {
        println!("{}", "(empty answer)".dimmed());
    } else {
        println!("{}", output.answer);
    }
    println!();
}

/// Print a failed run.
pub fn print_error(err: &AgentError) {
    eprintln!("\n❌ {} {}\n", format!("[{}]", err.reason()).red(), err);
}

/// Print the derived tool surface.
pub fn print_tools(registry: &ToolRegistry) {
    println!();
    println!("{} {}", "Scene API:".bold(), registry.base_url());
    println!();
    for tool in registry.tools() {
        println!("{}", tool.name().cyan().bold());
        for line in tool.description().lines() {
            println!("  {line}");
        }
        println!();
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🎬 Scenepilot".cyan().bold(), version.dimmed());
    println!(
        "{}",
        "Type an instruction, \"/tools\" to list tools, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "working" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ working...".dimmed());
}

/// Clear the "working" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_home() {
        let result = expand_tilde("~/specs/openapi.json");
        assert!(result.ends_with("specs/openapi.json"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn expand_tilde_no_tilde() {
        let result = expand_tilde("/absolute/openapi.json");
        assert_eq!(result, PathBuf::from("/absolute/openapi.json"));
    }

    #[test]
    fn expand_tilde_bare() {
        let result = expand_tilde("~");
        assert!(!result.to_string_lossy().contains('~'));
    }
}
