//! Scenepilot Agent — the ReAct loop and the HTTP request tools it drives.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, request executor and the `requests_*` tools
//! - **parser**: generated text → `Action` / `Finish` / `Malformed`
//! - **prompt**: framing + scratchpad construction
//! - **trace**: the per-run step record
//! - **agent_loop**: the generate ↔ tool-call main loop

pub mod agent_loop;
pub mod parser;
pub mod prompt;
pub mod tools;
pub mod trace;

pub use agent_loop::{AgentConfig, AgentError, AgentLoop, AgentOutput};
pub use parser::{parse, ParseOutcome};
pub use prompt::PromptBuilder;
pub use tools::{HttpExecutor, RequestExecutor, Tool, ToolError, ToolRegistry};
pub use trace::{AgentStep, AgentTrace, StepAction};
