//! Mention pipeline: detect a mention, extract the prompt, stream the
//! assistant's answer through the flattener, and reply once.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info};

use crate::backend::{AssistantBackend, QueryOptions};
use crate::flatten::Flattener;

use super::boundary::{self, Fault, PipelineFailure};
use super::context::ReplyChannel;
use super::policy::{Reply, ReplyKind, ReplyPolicy};

/// The parts of an inbound chat message the pipeline looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub author_id: u64,
    pub content: String,
    /// Ids of every user mentioned in the message.
    pub mentions: Vec<u64>,
}

impl InboundMessage {
    pub fn mentions_user(&self, user_id: u64) -> bool {
        self.mentions.contains(&user_id)
    }
}

/// What the pipeline did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Written by the agent itself; ignored.
    SelfAuthored,
    /// Agent not mentioned; ignored.
    NotMentioned,
    /// Exactly one reply was produced.
    Replied(ReplyKind),
}

/// Remove every mention of `agent_id` (`<@id>` and `<@!id>`) and trim.
pub fn extract_prompt(content: &str, agent_id: u64) -> String {
    content
        .replace(&format!("<@{agent_id}>"), "")
        .replace(&format!("<@!{agent_id}>"), "")
        .trim()
        .to_string()
}

/// Shared, read-only pipeline used for every inbound message.
pub struct MentionPipeline {
    backend: Arc<dyn AssistantBackend>,
    options: Arc<QueryOptions>,
    policy: ReplyPolicy,
}

impl MentionPipeline {
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        options: QueryOptions,
        policy: ReplyPolicy,
    ) -> Self {
        Self {
            backend,
            options: Arc::new(options),
            policy,
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn policy(&self) -> &ReplyPolicy {
        &self.policy
    }

    /// Handle one inbound message on behalf of the agent `agent_id`.
    ///
    /// Messages that are not addressed to the agent (or are its own) get no
    /// reply. Every mention gets exactly one, whatever happens in between.
    pub async fn handle<R: ReplyChannel>(
        &self,
        agent_id: u64,
        msg: &InboundMessage,
        channel: &R,
    ) -> Disposition {
        if msg.author_id == agent_id {
            return Disposition::SelfAuthored;
        }
        if !msg.mentions_user(agent_id) {
            return Disposition::NotMentioned;
        }

        let work = self.respond(agent_id, msg, channel);
        let kind = boundary::contain(work, &self.policy, channel).await;
        debug!(author = msg.author_id, ?kind, "mention handled");
        Disposition::Replied(kind)
    }

    async fn respond<R: ReplyChannel>(
        &self,
        agent_id: u64,
        msg: &InboundMessage,
        channel: &R,
    ) -> Result<Reply, PipelineFailure> {
        let prompt = extract_prompt(&msg.content, agent_id);
        if prompt.is_empty() {
            return Ok(self.policy.empty_prompt());
        }

        info!(prompt = %prompt, "user message");

        let _activity = channel.start_activity();
        let fragments = self.query(prompt).await?;
        Ok(self.policy.select(&fragments))
    }

    /// Stream one query to exhaustion, flattening events as they arrive.
    ///
    /// Errors do not stop the drain: each one is collected, and any error
    /// discards the fragments gathered so far.
    async fn query(&self, prompt: String) -> Result<Vec<String>, PipelineFailure> {
        let mut stream = self.backend.query(prompt, Arc::clone(&self.options));
        let mut flattener = Flattener::new();
        let mut errors = Vec::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(received) => {
                    info!(
                        backend = self.backend.name(),
                        event = %received.to_log_json(),
                        "received response"
                    );
                    if let Err(e) = flattener.push(&received.event) {
                        errors.push(Fault::new(e));
                    }
                }
                Err(e) => errors.push(Fault::new(e)),
            }
        }

        if !errors.is_empty() {
            return Err(PipelineFailure::new(errors));
        }

        let fragments = flattener.into_fragments();
        info!(fragments = ?fragments, "assistant response");
        Ok(fragments)
    }
}
