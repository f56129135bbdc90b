//! Flatten streamed response events into display fragments.
//!
//! Text blocks become one fragment each. A tool call becomes two: a bold
//! label with the tool name and a fenced code block showing the invocation.

use serde_json::Value;

use crate::error::AgentError;
use crate::event::{ContentBlock, ResponseEvent};

/// Name of Claude Code's shell tool, rendered as a command line.
pub const BASH_TOOL: &str = "Bash";

/// Incremental flattener fed one event at a time while the stream is open.
#[derive(Debug, Default)]
pub struct Flattener {
    fragments: Vec<String>,
}

impl Flattener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the fragments for one event. Non-assistant events are skipped.
    pub fn push(&mut self, event: &ResponseEvent) -> Result<(), AgentError> {
        let ResponseEvent::Assistant { message } = event else {
            return Ok(());
        };

        for block in &message.content {
            match block {
                ContentBlock::Text { text } => self.fragments.push(text.clone()),
                ContentBlock::ToolUse { name, input, .. } => {
                    let body = render_tool_input(name, input)?;
                    self.fragments.push(format!("**{name}**"));
                    self.fragments.push(format!("```\n{body}\n```"));
                }
                ContentBlock::Unknown => {}
            }
        }
        Ok(())
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn into_fragments(self) -> Vec<String> {
        self.fragments
    }
}

/// Flatten a complete event sequence.
pub fn flatten<'a>(
    events: impl IntoIterator<Item = &'a ResponseEvent>,
) -> Result<Vec<String>, AgentError> {
    let mut flattener = Flattener::new();
    for event in events {
        flattener.push(event)?;
    }
    Ok(flattener.into_fragments())
}

/// Body of the code block shown for a tool call.
///
/// `Bash` renders as `$ <command> # <description>`; everything else as the
/// pretty-printed input object.
fn render_tool_input(name: &str, input: &Value) -> Result<String, AgentError> {
    if name == BASH_TOOL {
        let command = input
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::MalformedToolInput {
                tool: name.to_string(),
                field: "command",
            })?;
        let description = input
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("");
        return Ok(format!("$ {command} # {description}"));
    }

    Ok(serde_json::to_string_pretty(input)?)
}
