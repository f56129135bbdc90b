//! Discord implementation of the pipeline's reply seam.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::CreateMessage;
use serenity::http::{Http, Typing};
use serenity::model::id::{ChannelId, MessageId};

use clawcord_agent::pipeline::ReplyChannel;
use clawcord_agent::AgentError;

/// Replies to one Discord message, threaded onto it.
pub struct DiscordReply {
    http: Arc<Http>,
    channel_id: ChannelId,
    message_id: MessageId,
}

impl DiscordReply {
    pub fn new(http: Arc<Http>, channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            http,
            channel_id,
            message_id,
        }
    }
}

#[async_trait]
impl ReplyChannel for DiscordReply {
    /// Typing indicator; stops when dropped.
    type Activity = Typing;

    fn start_activity(&self) -> Typing {
        self.channel_id.start_typing(&self.http)
    }

    async fn reply(&self, text: &str) -> Result<(), AgentError> {
        let msg = CreateMessage::new()
            .content(text)
            .reference_message((self.channel_id, self.message_id));
        self.channel_id
            .send_message(&self.http, msg)
            .await
            .map(|_| ())
            .map_err(|e| AgentError::Reply(e.to_string()))
    }
}
