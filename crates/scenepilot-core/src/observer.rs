//! Observer hooks — side-channel events fired while an agent run progresses.
//!
//! Observers are fire-and-forget: they see sanitized copies of the text
//! flowing through the loop, they cannot influence control flow, and a
//! panicking observer is caught and logged instead of unwinding into the
//! loop.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::sanitize::sanitize;

// ─────────────────────────────────────────────
// Correlation
// ─────────────────────────────────────────────

/// Correlation identifier for an event: which run, which step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: Uuid,
    pub step: usize,
}

impl RunContext {
    /// Start a new run (fresh v4 id, step 0).
    pub fn new_run() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            step: 0,
        }
    }

    /// Same run, different step.
    pub fn at_step(&self, step: usize) -> Self {
        Self {
            run_id: self.run_id,
            step,
        }
    }
}

// ─────────────────────────────────────────────
// Observer trait
// ─────────────────────────────────────────────

/// One method per event kind. Every method has a no-op default so an
/// observer only implements what it cares about.
pub trait AgentObserver: Send + Sync {
    /// Name used when logging a misbehaving observer.
    fn name(&self) -> &str {
        "observer"
    }

    fn on_tool_start(&self, _ctx: &RunContext, _tool: &str, _input: &str) {}

    fn on_tool_end(&self, _ctx: &RunContext, _tool: &str, _output: &str) {}

    fn on_tool_error(&self, _ctx: &RunContext, _tool: &str, _error: &str) {}

    /// A generation attempt failed transiently and is about to be retried.
    fn on_retry(&self, _ctx: &RunContext, _attempt: u32, _trigger: &str) {}

    /// The run ended in a terminal failure.
    fn on_chain_error(&self, _ctx: &RunContext, _error: &str) {}

    /// Final (aggregated, sanitized) text of a generation.
    fn on_text(&self, _ctx: &RunContext, _text: &str) {}
}

// ─────────────────────────────────────────────
// Observer set
// ─────────────────────────────────────────────

/// The observers injected into one agent loop.
///
/// Sanitizes every payload once, then hands it to each observer inside
/// `catch_unwind`.
#[derive(Clone, Default)]
pub struct Observers {
    observers: Vec<Arc<dyn AgentObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer (builder style).
    pub fn with(mut self, observer: Arc<dyn AgentObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn push(&mut self, observer: Arc<dyn AgentObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn tool_start(&self, ctx: &RunContext, tool: &str, input: &str) {
        let (tool, input) = (sanitize(tool), sanitize(input));
        self.dispatch("on_tool_start", |o| o.on_tool_start(ctx, &tool, &input));
    }

    pub fn tool_end(&self, ctx: &RunContext, tool: &str, output: &str) {
        let (tool, output) = (sanitize(tool), sanitize(output));
        self.dispatch("on_tool_end", |o| o.on_tool_end(ctx, &tool, &output));
    }

    pub fn tool_error(&self, ctx: &RunContext, tool: &str, error: &str) {
        let (tool, error) = (sanitize(tool), sanitize(error));
        self.dispatch("on_tool_error", |o| o.on_tool_error(ctx, &tool, &error));
    }

    pub fn retry(&self, ctx: &RunContext, attempt: u32, trigger: &str) {
        let trigger = sanitize(trigger);
        self.dispatch("on_retry", |o| o.on_retry(ctx, attempt, &trigger));
    }

    pub fn chain_error(&self, ctx: &RunContext, error: &str) {
        let error = sanitize(error);
        self.dispatch("on_chain_error", |o| o.on_chain_error(ctx, &error));
    }

    pub fn text(&self, ctx: &RunContext, text: &str) {
        let text = sanitize(text);
        self.dispatch("on_text", |o| o.on_text(ctx, &text));
    }

    fn dispatch<F>(&self, event: &'static str, f: F)
    where
        F: Fn(&dyn AgentObserver),
    {
        for observer in &self.observers {
            let result = catch_unwind(AssertUnwindSafe(|| f(observer.as_ref())));
            if let Err(panic) = result {
                error!(
                    observer = observer.name(),
                    event = event,
                    panic = %panic_message(panic.as_ref()),
                    "observer hook panicked; ignoring"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ─────────────────────────────────────────────
// TracingObserver
// ─────────────────────────────────────────────

/// Default observer: turns every event into a structured `tracing` event.
pub struct TracingObserver;

impl AgentObserver for TracingObserver {
    fn name(&self) -> &str {
        "tracing"
    }

    fn on_tool_start(&self, ctx: &RunContext, tool: &str, input: &str) {
        info!(run_id = %ctx.run_id, step = ctx.step, tool = tool, input = input, "tool start");
    }

    fn on_tool_end(&self, ctx: &RunContext, tool: &str, output: &str) {
        debug!(
            run_id = %ctx.run_id,
            step = ctx.step,
            tool = tool,
            output_len = output.len(),
            "tool end"
        );
    }

    fn on_tool_error(&self, ctx: &RunContext, tool: &str, error: &str) {
        warn!(run_id = %ctx.run_id, step = ctx.step, tool = tool, error = error, "tool error");
    }

    fn on_retry(&self, ctx: &RunContext, attempt: u32, trigger: &str) {
        warn!(run_id = %ctx.run_id, step = ctx.step, attempt = attempt, trigger = trigger, "retrying generation");
    }

    fn on_chain_error(&self, ctx: &RunContext, error: &str) {
        error!(run_id = %ctx.run_id, step = ctx.step, error = error, "run failed");
    }

    fn on_text(&self, ctx: &RunContext, text: &str) {
        debug!(run_id = %ctx.run_id, step = ctx.step, text = text, "generated text");
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
