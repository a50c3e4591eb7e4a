//! Prompt builder — the ReAct framing plus the scratchpad of past steps.
//!
//! The framing is built once per run; every generation prompt is the
//! framing followed by the rendered trace, ending on `Thought:` so the
//! model continues from there.

use crate::tools::ToolRegistry;
use crate::trace::{AgentStep, AgentTrace, StepAction};

/// Generation halts before the model invents its own observation.
pub const STOP_SEQUENCES: [&str; 2] = ["\nObservation:", "\n\tObservation:"];

pub fn stop_sequences() -> Vec<String> {
    STOP_SEQUENCES.iter().map(|s| s.to_string()).collect()
}

/// Builds generation prompts for one run.
#[derive(Clone, Debug)]
pub struct PromptBuilder {
    framing: String,
}

impl PromptBuilder {
    pub fn new(tools: &ToolRegistry, instruction: &str) -> Self {
        let mut parts: Vec<String> = Vec::new();

        parts.push(
            "You are an agent that carries out instructions against a scene API \
             by making HTTP requests to it."
                .to_string(),
        );
        if !tools.base_url().is_empty() {
            parts.push(format!("The API lives at {}.", tools.base_url()));
        }

        let tool_lines: Vec<String> = tools.tools().iter().map(|t| t.prompt_line()).collect();
        parts.push(format!(
            "You have access to the following tools:\n\n{}",
            tool_lines.join("\n\n")
        ));

        let names = tools.tool_names().join(", ");
        parts.push(format!(
            "Use the following format:\n\n\
             Question: the instruction you must carry out\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, should be one of [{names}]\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\
             ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original instruction"
        ));

        parts.push(format!("Begin!\n\nQuestion: {}\nThought:", instruction.trim()));

        Self {
            framing: parts.join("\n\n"),
        }
    }

    pub fn framing(&self) -> &str {
        &self.framing
    }

    /// Full prompt for the next generation.
    pub fn build(&self, trace: &AgentTrace) -> String {
        let mut prompt = self.framing.clone();
        for step in trace.steps() {
            render_step(&mut prompt, step);
        }
        prompt
    }
}

fn render_step(out: &mut String, step: &AgentStep) {
    out.push(' ');
    match &step.action {
        StepAction::Tool(tool) => {
            out.push_str(&step.thought);
            out.push_str("\nAction: ");
            out.push_str(tool);
            out.push_str("\nAction Input: ");
            out.push_str(&step.action_input);
        }
        StepAction::InvalidFormat => out.push_str(step.thought.trim()),
        // finish steps end the run and are never rendered back
        StepAction::Finish => return,
    }
    out.push_str("\nObservation: ");
    out.push_str(step.observation.as_deref().unwrap_or_default());
    out.push_str("\nThought:");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolError};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "does things"
        }
        async fn call(&self, _input: &str) -> Result<String, ToolError> {
            Ok(String::new())
        }
    }

    fn registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(NamedTool("requests_post")));
        reg.register(Arc::new(NamedTool("requests_get")));
        reg
    }

    #[test]
    fn test_framing_lists_tools_and_instruction() {
        let builder = PromptBuilder::new(&registry(), "  add a red cube ");
        let framing = builder.framing();

        assert!(framing.contains("requests_get: does things\n\nrequests_post: does things"));
        assert!(framing.contains("should be one of [requests_get, requests_post]"));
        assert!(framing.ends_with("Question: add a red cube\nThought:"));
    }

    #[test]
    fn test_scratchpad_rendering() {
        let builder = PromptBuilder::new(&registry(), "list objects");
        let mut trace = AgentTrace::new();
        trace.push(AgentStep {
            thought: "I should list them".into(),
            action: StepAction::Tool("requests_get".into()),
            action_input: "/objects".into(),
            observation: Some("{\"objects\":[]}".into()),
        });
        trace.push(AgentStep {
            thought: "gibberish\n".into(),
            action: StepAction::InvalidFormat,
            action_input: String::new(),
            observation: Some("Could not parse".into()),
        });

        let prompt = builder.build(&trace);
        assert!(prompt.starts_with(builder.framing()));
        assert!(prompt.ends_with(
            "Thought: I should list them\nAction: requests_get\nAction Input: /objects\n\
             Observation: {\"objects\":[]}\nThought: gibberish\nObservation: Could not parse\nThought:"
        ));
    }

    #[test]
    fn test_stop_sequences() {
        assert_eq!(stop_sequences(), vec!["\nObservation:", "\n\tObservation:"]);
    }
}
