use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use clawcord_core::config::{BotConfig, ClaudeCodeConfig};

use crate::error::AgentError;
use crate::event::ReceivedEvent;

/// Lazily produced, finite sequence of response events for one query.
///
/// An `Err` item does not necessarily end the stream; consumers drain it and
/// collect every error.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ReceivedEvent, AgentError>> + Send>>;

/// Options attached to every assistant query. Built once at startup and
/// shared read-only between all in-flight messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub system_prompt: String,
    /// Tools the assistant may use without asking. `*` allows everything.
    pub allowed_tools: BTreeSet<String>,
    pub max_turns: Option<u32>,
    /// Model override. `None` uses the CLI's default.
    pub model: Option<String>,
}

impl QueryOptions {
    pub fn from_config(bot: &BotConfig, claude_code: &ClaudeCodeConfig) -> Self {
        Self {
            system_prompt: bot.system_prompt.clone(),
            allowed_tools: bot.allowed_tools.iter().cloned().collect(),
            max_turns: bot.max_turns,
            model: claude_code.model.clone(),
        }
    }
}

/// An assistant that answers a prompt with a stream of response events.
pub trait AssistantBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Start a query. Nothing runs until the returned stream is polled.
    fn query(&self, prompt: String, options: Arc<QueryOptions>) -> EventStream;
}
