//! Scenepilot CLI — entry point.
//!
//! # Commands
//!
//! - `scenepilot serve` — HTTP endpoint carrying out instructions
//! - `scenepilot run -q QUERY` — single instruction
//! - `scenepilot repl` — interactive instructions
//! - `scenepilot tools` — print the tools derived from the API description
//! - `scenepilot status` — show configuration and backend status
//! - `scenepilot onboard` — write a default config

mod app;
mod helpers;
mod onboard;
mod repl;
mod server;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use scenepilot_core::config::load_config;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🎬 Scenepilot — drive a scene API with natural-language instructions
#[derive(Parser)]
#[command(name = "scenepilot", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.scenepilot/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the instruction endpoint over HTTP
    Serve {
        /// Bind host (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Carry out a single instruction
    Run {
        /// The instruction
        #[arg(short, long)]
        query: String,

        /// Print the full run (answer + steps) as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Print every step before the answer
        #[arg(long, default_value_t = false)]
        steps: bool,
    },

    /// Interactive instructions (REPL)
    Repl {
        /// Print every step before the answer
        #[arg(long, default_value_t = false)]
        steps: bool,
    },

    /// Print the tools derived from the API description
    Tools,

    /// Show configuration and backend status
    Status,

    /// Write a default config
    Onboard,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { host, port } => {
            init_logging(if cli.logs { LogLevel::Debug } else { LogLevel::Info }, cli.json_logs);
            let mut config = load_config(config_path);
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let app = app::build_app(config).await?;
            let server = app.config.server.clone();
            server::run(app.agent, &server.bind_addr(), &server.route).await
        }
        Commands::Run { query, json, steps } => {
            init_logging(verbosity(cli.logs), cli.json_logs);
            let app = app::build_app(load_config(config_path)).await?;
            run_once(&app, &query, json, steps).await
        }
        Commands::Repl { steps } => {
            init_logging(verbosity(cli.logs), cli.json_logs);
            let app = app::build_app(load_config(config_path)).await?;
            repl::run(&app.agent, steps).await
        }
        Commands::Tools => {
            init_logging(verbosity(cli.logs), cli.json_logs);
            let registry = app::build_registry(&load_config(config_path)).await?;
            helpers::print_tools(&registry);
            Ok(())
        }
        Commands::Status => status::run(config_path),
        Commands::Onboard => onboard::run(config_path),
    }
}

// ─────────────────────────────────────────────
// Run command
// ─────────────────────────────────────────────

async fn run_once(app: &app::App, query: &str, json: bool, show_steps: bool) -> Result<()> {
    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, cancelling run");
                token.cancel();
            }
        });
    }

    match app.agent.run(query, &token).await {
        Ok(output) if json => {
            let text = serde_json::to_string_pretty(&output).context("failed to serialize run output")?;
            println!("{text}");
            Ok(())
        }
        Ok(output) => {
            helpers::print_answer(&output, show_steps);
            Ok(())
        }
        Err(e) => {
            helpers::print_error(&e);
            Err(e).context("instruction failed")
        }
    }
}

// ─────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────

#[derive(Clone, Copy)]
enum LogLevel {
    Warn,
    Info,
    Debug,
}

fn verbosity(logs: bool) -> LogLevel {
    if logs {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    }
}

/// Initialize tracing/logging. `RUST_LOG` wins over the level.
fn init_logging(level: LogLevel, json: bool) {
    use tracing_subscriber::EnvFilter;

    let default = match level {
        LogLevel::Debug => "scenepilot=debug,scenepilot_core=debug,scenepilot_agent=debug,scenepilot_providers=debug,info",
        LogLevel::Info => "scenepilot=info,scenepilot_core=info,scenepilot_agent=info,scenepilot_providers=info,tower_http=info,warn",
        LogLevel::Warn => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
