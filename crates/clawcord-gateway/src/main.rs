use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use clawcord_agent::pipeline::{MentionPipeline, ReplyPolicy};
use clawcord_agent::{AssistantBackend, ClaudeCliBackend, QueryOptions};
use clawcord_core::config::{ClawcordConfig, DEFAULT_CONFIG_PATH};
use clawcord_core::ClawcordError;
use clawcord_discord::DiscordAdapter;

mod logging;

/// Relay Discord mentions to Claude Code and post the answers back.
#[derive(Debug, Parser)]
#[command(name = "clawcord", version)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(short, long, env = "CLAWCORD_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match ClawcordConfig::load(Some(cli.config.as_str())) {
        Ok(config) => config,
        Err(e) => {
            logging::init_default();
            error!(code = e.code(), "{e}");
            if matches!(e, ClawcordError::ConfigNotFound { .. }) {
                error!("Please create {} based on config.example.yaml", cli.config);
            }
            return Err(e.into());
        }
    };

    logging::init(&config.logging);

    if let Err(e) = config.discord.token() {
        error!(
            code = e.code(),
            "Discord bot token is not configured in {}",
            cli.config
        );
        return Err(e.into());
    }

    let backend: Arc<dyn AssistantBackend> =
        Arc::new(ClaudeCliBackend::from_config(&config.claude_code));
    let options = QueryOptions::from_config(&config.bot, &config.claude_code);
    let policy = ReplyPolicy::from_config(&config);
    info!(
        backend = backend.name(),
        allowed_tools = ?options.allowed_tools,
        max_turns = ?options.max_turns,
        max_response_chars = policy.max_chars(),
        "assistant configured"
    );

    let pipeline = Arc::new(MentionPipeline::new(backend, options, policy));
    let adapter = DiscordAdapter::new(&config.discord, pipeline)?;

    tokio::select! {
        result = adapter.run() => {
            if let Err(ref e) = result {
                error!(error = %e, "Error occurred while running bot");
            }
            result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Stopping bot...");
        }
    }

    Ok(())
}
