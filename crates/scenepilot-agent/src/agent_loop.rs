//! Agent loop — the generate ↔ parse ↔ tool-call state machine.
//!
//! One run per instruction:
//!
//! 1. Build the framing (tools, format, instruction)
//! 2. Generate from framing + scratchpad
//! 3. Parse: `Finish` ends the run, `Action` calls a tool and records the
//!    observation, `Malformed` records a corrective step
//! 4. Repeat until a final answer, the step ceiling, the malformed ceiling,
//!    a generation failure, or cancellation

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use scenepilot_core::config::AgentSettings;
use scenepilot_core::observer::{Observers, RunContext, TracingObserver};
use scenepilot_core::sanitize;
use scenepilot_providers::client::{GenerationClient, GenerationError};

use crate::parser::{parse, ParseOutcome};
use crate::prompt::{stop_sequences, PromptBuilder};
use crate::tools::ToolRegistry;
use crate::trace::{AgentStep, AgentTrace, StepAction};

/// Bounds of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    /// Tool steps allowed before the run fails.
    pub max_steps: usize,
    /// Malformed outputs in a row that fail the run.
    pub max_malformed: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from(&AgentSettings::default())
    }
}

impl From<&AgentSettings> for AgentConfig {
    fn from(settings: &AgentSettings) -> Self {
        Self {
            max_steps: settings.max_steps,
            max_malformed: settings.max_malformed,
        }
    }
}

// ─────────────────────────────────────────────
// Errors and output
// ─────────────────────────────────────────────

/// Terminal failure of a run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("model output could not be parsed {attempts} times in a row: {reason}")]
    UnparsableOutput { attempts: usize, reason: String },

    #[error("no final answer within {limit} tool steps")]
    StepLimitExceeded { limit: usize },

    #[error("run cancelled")]
    Cancelled,
}

impl AgentError {
    /// Stable machine-readable code.
    pub fn reason(&self) -> &'static str {
        match self {
            AgentError::Generation(_) => "generation",
            AgentError::UnparsableOutput { .. } => "unparsable",
            AgentError::StepLimitExceeded { .. } => "step_limit",
            AgentError::Cancelled => "cancelled",
        }
    }
}

/// Result of a finished run.
#[derive(Clone, Debug, Serialize)]
pub struct AgentOutput {
    pub answer: String,
    pub steps: Vec<AgentStep>,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

fn corrective_observation(reason: &str) -> String {
    format!(
        "Could not parse LLM output: {reason}\nRemember to use the format: \
         'Thought:' then 'Action:' with one of the tool names and 'Action Input:', \
         or 'Final Answer:' when done."
    )
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

pub struct AgentLoop {
    client: Arc<GenerationClient>,
    tools: Arc<ToolRegistry>,
    observers: Observers,
    config: AgentConfig,
}

impl AgentLoop {
    /// Create a loop with the default [`TracingObserver`].
    pub fn new(client: Arc<GenerationClient>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            client,
            tools,
            observers: Observers::new().with(Arc::new(TracingObserver)),
            config,
        }
    }

    /// Replace the observer set (builder pattern).
    pub fn with_observers(mut self, observers: Observers) -> Self {
        self.observers = observers;
        self
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Carry out one instruction.
    ///
    /// Cancelling `cancel` drops whatever is in flight (generation, backoff
    /// sleep or tool request) and ends the run with [`AgentError::Cancelled`].
    pub async fn run(&self, instruction: &str, cancel: &CancellationToken) -> Result<AgentOutput, AgentError> {
        let ctx = RunContext::new_run();
        info!(
            run_id = %ctx.run_id,
            tools = self.tools.len(),
            max_steps = self.config.max_steps,
            "agent run started"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            result = self.drive(instruction, &ctx) => result,
        };

        match &result {
            Ok(output) => info!(
                run_id = %ctx.run_id,
                steps = output.steps.len(),
                "agent run finished"
            ),
            Err(e) => {
                warn!(run_id = %ctx.run_id, reason = e.reason(), error = %e, "agent run failed");
                self.observers.chain_error(&ctx, &e.to_string());
            }
        }
        result
    }

    async fn drive(&self, instruction: &str, run: &RunContext) -> Result<AgentOutput, AgentError> {
        let started_at = Utc::now();
        let known_tools = self.tools.tool_names();
        let prompt = PromptBuilder::new(&self.tools, instruction);
        let stop = stop_sequences();
        let mut trace = AgentTrace::new();
        let mut malformed_in_a_row = 0usize;

        loop {
            let ctx = run.at_step(trace.len());
            let text = self
                .client
                .complete(&prompt.build(&trace), &stop, &ctx, &self.observers)
                .await?;
            self.observers.text(&ctx, &text);

            match parse(&text, &known_tools) {
                ParseOutcome::Finish { thought, answer } => {
                    debug!(run_id = %run.run_id, step = ctx.step, "final answer");
                    trace.push(AgentStep {
                        thought,
                        action: StepAction::Finish,
                        action_input: answer.clone(),
                        observation: None,
                    });
                    return Ok(AgentOutput {
                        answer,
                        steps: trace.into_steps(),
                        run_id: run.run_id,
                        started_at,
                        finished_at: Utc::now(),
                    });
                }

                ParseOutcome::Action { thought, tool, input } => {
                    malformed_in_a_row = 0;
                    let tool = sanitize(&tool);
                    let input = sanitize(&input);

                    info!(run_id = %run.run_id, step = ctx.step, tool = %tool, "executing tool call");
                    self.observers.tool_start(&ctx, &tool, &input);

                    let observation = match self.tools.invoke(&tool, &input).await {
                        Ok(output) => {
                            self.observers.tool_end(&ctx, &tool, &output);
                            output
                        }
                        Err(e) => {
                            let message = e.to_string();
                            self.observers.tool_error(&ctx, &tool, &message);
                            format!("Error: {message}")
                        }
                    };

                    trace.push(AgentStep {
                        thought,
                        action: StepAction::Tool(tool),
                        action_input: input,
                        observation: Some(sanitize(&observation)),
                    });

                    if trace.tool_steps() >= self.config.max_steps {
                        return Err(AgentError::StepLimitExceeded {
                            limit: self.config.max_steps,
                        });
                    }
                }

                ParseOutcome::Malformed { raw_text, reason } => {
                    malformed_in_a_row += 1;
                    warn!(
                        run_id = %run.run_id,
                        step = ctx.step,
                        attempt = malformed_in_a_row,
                        reason = %reason,
                        "malformed model output"
                    );

                    if malformed_in_a_row >= self.config.max_malformed {
                        return Err(AgentError::UnparsableOutput {
                            attempts: malformed_in_a_row,
                            reason,
                        });
                    }

                    trace.push(AgentStep {
                        thought: raw_text,
                        action: StepAction::InvalidFormat,
                        action_input: String::new(),
                        observation: Some(corrective_observation(&reason)),
                    });
                }
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
