//! Action parser — turns generated text into a decision.
//!
//! The model writes in the ReAct format:
//!
//! ```text
//! Thought: I should list the objects first
//! Action: requests_get
//! Action Input: {"url": "/objects"}
//! ```
//!
//! or finishes with `Final Answer: ...`. Anything else is `Malformed`, and
//! the reason is fed back to the model as a corrective observation.

use std::sync::OnceLock;

use regex::Regex;

/// Marker introducing the final answer.
pub const FINAL_ANSWER: &str = "Final Answer:";

/// Structured decision extracted from one generation.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseOutcome {
    Action {
        thought: String,
        tool: String,
        input: String,
    },
    Finish {
        thought: String,
        answer: String,
    },
    Malformed {
        raw_text: String,
        reason: String,
    },
}

fn action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("action regex is valid")
    })
}

fn action_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Action\s*\d*\s*:").expect("action regex is valid"))
}

fn observation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*Observation\s*\d*\s*:").expect("observation regex is valid"))
}

/// Parse generated text against the set of callable tool names.
pub fn parse(text: &str, known_tools: &[String]) -> ParseOutcome {
    let malformed = |reason: String| ParseOutcome::Malformed {
        raw_text: text.to_string(),
        reason,
    };

    let action = action_re().captures(text);
    let final_at = text.find(FINAL_ANSWER);

    if let (Some(_), Some(_)) = (&action, final_at) {
        return malformed(
            "Parsing LLM output produced both a final answer and a parse-able action. \
             Give either an Action or a Final Answer, not both."
                .into(),
        );
    }

    if let Some(idx) = final_at {
        return ParseOutcome::Finish {
            thought: clean_thought(&text[..idx]),
            answer: text[idx + FINAL_ANSWER.len()..].trim().to_string(),
        };
    }

    let Some(caps) = action else {
        if action_only_re().is_match(text) {
            return malformed("Invalid Format: Missing 'Action Input:' after 'Action:'".into());
        }
        return malformed("Invalid Format: Missing 'Action:' after 'Thought:'".into());
    };

    let (Some(whole), Some(raw_tool), Some(raw_input)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return malformed("Invalid Format: Missing 'Action:' after 'Thought:'".into());
    };

    let tool = clean_tool_name(raw_tool.as_str());
    if tool.is_empty() {
        return malformed("Invalid Format: empty tool name after 'Action:'".into());
    }
    if !known_tools.iter().any(|t| t == &tool) {
        return malformed(format!(
            "{} is not a valid tool, try one of [{}].",
            tool,
            known_tools.join(", ")
        ));
    }

    let input = clean_input(raw_input.as_str());
    if !brackets_balanced(&input) {
        return malformed(format!(
            "Invalid Format: unbalanced brackets in 'Action Input' for {tool}"
        ));
    }

    ParseOutcome::Action {
        thought: clean_thought(&text[..whole.start()]),
        tool,
        input,
    }
}

fn clean_thought(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix("Thought:").unwrap_or(text).trim().to_string()
}

/// First line of the captured name, without quotes, backticks, brackets or
/// trailing punctuation.
fn clean_tool_name(raw: &str) -> String {
    let first_line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    first_line
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '[' | ']' | '*' | '.' | ',' | ';' | ':')
        })
        .to_string()
}

/// Input text up to a stray `Observation:` line, without surrounding quotes.
fn clean_input(raw: &str) -> String {
    let cut = match observation_re().find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    let trimmed = cut.trim();
    let unquoted = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    unquoted.trim().to_string()
}

/// `()`, `[]` and `{}` nest properly outside of double-quoted strings.
fn brackets_balanced(text: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty() && !in_string
}
