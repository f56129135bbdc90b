//! Response events streamed by Claude Code in `--output-format stream-json`.
//!
//! Every stdout line is one JSON object tagged by `type`. Only `assistant`
//! events are flattened into chat text; the rest are logged and skipped.
//! The decoded object is kept next to the typed event so logs show every
//! field the CLI sent, including ones this crate does not model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseEvent {
    /// Session bootstrap (`subtype: "init"`) and other CLI notices.
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },

    /// A message produced by the model.
    Assistant { message: AssistantMessage },

    /// Tool results fed back to the model by the CLI.
    User {
        #[serde(default)]
        message: Value,
    },

    /// Final summary emitted once the query is finished.
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        num_turns: Option<u32>,
        #[serde(default)]
        total_cost_usd: Option<f64>,
    },

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    /// Thinking blocks, tool results and anything newer.
    #[serde(other)]
    Unknown,
}

impl ResponseEvent {
    /// Build an assistant event from content blocks.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        ResponseEvent::Assistant {
            message: AssistantMessage {
                model: None,
                content,
            },
        }
    }

}

/// One event as received: the typed view plus the untouched JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEvent {
    pub event: ResponseEvent,
    pub raw: Value,
}

impl ReceivedEvent {
    /// The raw object as compact JSON, for logging.
    pub fn to_log_json(&self) -> String {
        self.raw.to_string()
    }
}

impl From<ResponseEvent> for ReceivedEvent {
    fn from(event: ResponseEvent) -> Self {
        let raw = serde_json::to_value(&event).unwrap_or(Value::Null);
        Self { event, raw }
    }
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_use(name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolUse {
            id: String::new(),
            name: name.into(),
            input,
        }
    }
}

/// Decode one stdout line. Blank lines yield `None`.
pub fn parse_event_line(line: &str) -> Result<Option<ReceivedEvent>, AgentError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let decode_error = |source| AgentError::Decode {
        source,
        line: truncate(line, 200).to_string(),
    };
    let raw: Value = serde_json::from_str(line).map_err(decode_error)?;
    let event = ResponseEvent::deserialize(&raw).map_err(decode_error)?;
    Ok(Some(ReceivedEvent { event, raw }))
}

/// Truncate a string for error messages, respecting char boundaries.
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
