//! Run trace — the append-only record of what the agent did.

use serde::{Serialize, Serializer};

/// What a step did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepAction {
    /// Called the named tool.
    Tool(String),
    /// Produced the final answer.
    Finish,
    /// Corrective step after output that couldn't be parsed.
    InvalidFormat,
}

impl StepAction {
    /// Tool name, `"finish"` or `"invalid_format"`.
    pub fn label(&self) -> &str {
        match self {
            StepAction::Tool(name) => name,
            StepAction::Finish => "finish",
            StepAction::InvalidFormat => "invalid_format",
        }
    }
}

impl Serialize for StepAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One step of a run. Never modified after it's appended.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentStep {
    pub thought: String,
    pub action: StepAction,
    /// Tool input, the answer for a finish step, empty for corrective steps.
    pub action_input: String,
    pub observation: Option<String>,
}

/// Ordered steps of one run.
#[derive(Clone, Debug, Default)]
pub struct AgentTrace {
    steps: Vec<AgentStep>,
}

impl AgentTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: AgentStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps that invoked a tool (corrective and finish steps excluded).
    pub fn tool_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.action, StepAction::Tool(_)))
            .count()
    }

    pub fn into_steps(self) -> Vec<AgentStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(action: StepAction) -> AgentStep {
        AgentStep {
            thought: "t".into(),
            action,
            action_input: String::new(),
            observation: None,
        }
    }

    #[test]
    fn test_tool_steps_counted() {
        let mut trace = AgentTrace::new();
        trace.push(step(StepAction::Tool("requests_get".into())));
        trace.push(step(StepAction::InvalidFormat));
        trace.push(step(StepAction::Tool("requests_post".into())));
        trace.push(step(StepAction::Finish));

        assert_eq!(trace.len(), 4);
        assert_eq!(trace.tool_steps(), 2);
        assert_eq!(trace.steps()[1].action.label(), "invalid_format");
    }

    #[test]
    fn test_step_serialization() {
        let json = serde_json::to_value(step(StepAction::Tool("requests_get".into()))).unwrap();
        assert_eq!(json["action"], "requests_get");
        assert!(json["observation"].is_null());
    }
}
