use std::sync::{Arc, OnceLock};

use serenity::async_trait;
use serenity::builder::CreateMessage;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, info, warn};

use clawcord_agent::pipeline::{InboundMessage, MentionPipeline};
use clawcord_core::config::DiscordConfig;

use crate::commands;
use crate::reply::DiscordReply;

/// Serenity event handler wired to the mention pipeline.
pub struct DiscordHandler {
    pub pipeline: Arc<MentionPipeline>,
    pub config: DiscordConfig,
    pub bot_id: OnceLock<UserId>,
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.bot_id.set(ready.user.id).ok();
        info!(name = %ready.user.name, id = %ready.user.id, "Discord bot connected");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(bot_id) = self.bot_id.get().copied() else {
            debug!(message_id = %msg.id, "message received before ready, dropped");
            return;
        };

        let inbound = to_inbound(&msg);
        match route(&inbound, bot_id.get(), &self.config.prefix) {
            Route::Ignore => {}
            Route::Command(response) => {
                let reply = CreateMessage::new().content(response).reference_message(&msg);
                if let Err(e) = msg.channel_id.send_message(&ctx.http, reply).await {
                    warn!(error = %e, "Discord command reply failed");
                }
            }
            Route::Mention => {
                let pipeline = Arc::clone(&self.pipeline);
                let channel = DiscordReply::new(Arc::clone(&ctx.http), msg.channel_id, msg.id);

                // The gateway listener must not wait on the assistant.
                tokio::spawn(async move {
                    pipeline.handle(bot_id.get(), &inbound, &channel).await;
                });
            }
        }
    }
}

/// Where an inbound message goes.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Ignore,
    /// Prefix command with its response text.
    Command(String),
    /// Addressed to the bot; goes to the assistant.
    Mention,
}

/// Mentions always reach the pipeline, even when they also look like a
/// prefix command. Our own messages are never routed.
fn route(inbound: &InboundMessage, bot_id: u64, prefix: &str) -> Route {
    if inbound.author_id == bot_id {
        return Route::Ignore;
    }
    if inbound.mentions_user(bot_id) {
        return Route::Mention;
    }
    match commands::handle_prefix_command(&inbound.content, prefix) {
        Some(response) => Route::Command(response),
        None => Route::Ignore,
    }
}

/// Copy the fields the pipeline needs out of a serenity message.
fn to_inbound(msg: &Message) -> InboundMessage {
    InboundMessage {
        author_id: msg.author.id.get(),
        content: msg.content.clone(),
        mentions: msg.mentions.iter().map(|u| u.id.get()).collect(),
    }
}
