use clawcord_core::config::{ClawcordConfig, MessagesConfig};

/// Which branch produced the outbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Mention carried no prompt; the assistant was not queried.
    EmptyPrompt,
    /// Answer exceeded the length limit and was withheld.
    TooLong,
    /// Assistant produced no displayable text.
    EmptyResponse,
    /// The flattened answer itself.
    Answer,
    /// Something failed; the generic error template was sent.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

/// Chooses the outbound text for a handled mention.
#[derive(Debug, Clone)]
pub struct ReplyPolicy {
    templates: MessagesConfig,
    max_chars: usize,
}

impl ReplyPolicy {
    pub fn new(templates: MessagesConfig, max_chars: usize) -> Self {
        Self {
            templates,
            max_chars,
        }
    }

    pub fn from_config(config: &ClawcordConfig) -> Self {
        Self::new(config.messages.clone(), config.bot.max_response_chars)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn empty_prompt(&self) -> Reply {
        Reply {
            kind: ReplyKind::EmptyPrompt,
            text: self.templates.empty_message.clone(),
        }
    }

    pub fn failure(&self) -> Reply {
        Reply {
            kind: ReplyKind::Failed,
            text: self.templates.general_error.clone(),
        }
    }

    /// Join fragments with newlines and pick the reply.
    ///
    /// Length is counted in chars. Oversized text is never sent.
    pub fn select(&self, fragments: &[String]) -> Reply {
        let joined = fragments.join("\n");
        let len = joined.chars().count();

        if len > self.max_chars {
            Reply {
                kind: ReplyKind::TooLong,
                text: self.templates.long_response_warning.clone(),
            }
        } else if len == 0 {
            Reply {
                kind: ReplyKind::EmptyResponse,
                text: self.templates.empty_response.clone(),
            }
        } else {
            Reply {
                kind: ReplyKind::Answer,
                text: joined,
            }
        }
    }
}
