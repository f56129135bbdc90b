use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serenity::gateway::GatewayError;
use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tracing::{error, info, warn};

use clawcord_agent::pipeline::MentionPipeline;
use clawcord_core::config::DiscordConfig;

use crate::error::DiscordError;
use crate::handler::DiscordHandler;

/// Discord channel adapter.
///
/// Wraps a serenity `Client` and drives the event loop. Reconnects whenever
/// the gateway drops, except when Discord rejects the token or intents.
pub struct DiscordAdapter {
    pipeline: Arc<MentionPipeline>,
    config: DiscordConfig,
    token: String,
}

impl DiscordAdapter {
    pub fn new(
        config: &DiscordConfig,
        pipeline: Arc<MentionPipeline>,
    ) -> Result<Self, DiscordError> {
        let token = config
            .token()
            .map_err(|_| DiscordError::NoToken)?
            .to_string();
        Ok(Self {
            pipeline,
            config: config.clone(),
            token,
        })
    }

    /// Connect to Discord and keep reconnecting whenever the gateway drops.
    ///
    /// Only returns on a fatal gateway error (bad token, disallowed intents).
    pub async fn run(self) -> Result<(), DiscordError> {
        let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

        loop {
            let mut client = match self.build_client(intents).await {
                Ok(c) => c,
                Err(e) => {
                    error!("Discord: connect failed ({e}), retrying in 30s");
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    continue;
                }
            };

            info!("Discord: gateway connecting");

            match client.start().await {
                Err(e) if is_fatal(&e) => {
                    error!("Discord: gateway refused connection ({e})");
                    return Err(e.into());
                }
                Err(e) => warn!("Discord: gateway error ({e}), reconnecting in 5s"),
                Ok(()) => info!("Discord: gateway stopped cleanly, reconnecting in 5s"),
            }

            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    /// Build a fresh serenity `Client` with our event handler.
    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, serenity::Error> {
        let handler = DiscordHandler {
            pipeline: Arc::clone(&self.pipeline),
            config: self.config.clone(),
            bot_id: OnceLock::new(),
        };

        Client::builder(&self.token, intents)
            .event_handler(handler)
            .await
    }
}

/// Errors that reconnecting cannot fix.
fn is_fatal(e: &serenity::Error) -> bool {
    matches!(
        e,
        serenity::Error::Gateway(
            GatewayError::InvalidAuthentication
                | GatewayError::InvalidGatewayIntents
                | GatewayError::DisallowedGatewayIntents
        )
    )
}
