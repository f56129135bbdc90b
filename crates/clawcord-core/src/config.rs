use std::path::Path;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ClawcordError, Result};

/// Upper bound on a reply's length in characters. Longer replies are withheld
/// and answered with `long_response_warning`.
pub const DEFAULT_MAX_RESPONSE_CHARS: usize = 4000;
/// Token value shipped in `config.example.yaml`. Never valid.
pub const PLACEHOLDER_TOKEN: &str = "your_discord_bot_token_here";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful Discord bot.";

/// Top-level config (config.yaml + CLAWCORD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClawcordConfig {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub claude_code: ClaudeCodeConfig,
    #[serde(default)]
    pub bot: BotConfig,
    pub messages: MessagesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Prefix for text commands (e.g. `!help`).
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl DiscordConfig {
    /// Return the bot token, rejecting empty and placeholder values.
    pub fn token(&self) -> Result<&str> {
        let token = self.bot_token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(ClawcordError::InvalidToken);
        }
        Ok(token)
    }
}

/// Claude Code CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeCodeConfig {
    /// Anthropic API key handed to the CLI. When absent the CLI falls back
    /// to whatever login it already has.
    pub api_key: Option<String>,
    /// Path or name of the `claude` executable.
    #[serde(default = "default_command")]
    pub command: String,
    pub model: Option<String>,
    /// Working directory for the CLI process. Defaults to the bot's cwd.
    pub working_dir: Option<String>,
}

impl Default for ClaudeCodeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            command: default_command(),
            model: None,
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    pub max_turns: Option<u32>,
    #[serde(default = "default_max_response_chars")]
    pub max_response_chars: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            allowed_tools: Vec::new(),
            max_turns: None,
            max_response_chars: DEFAULT_MAX_RESPONSE_CHARS,
        }
    }
}

/// Canned replies. All four are required; there are no defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    pub empty_message: String,
    pub long_response_warning: String,
    pub empty_response: String,
    pub general_error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Map the configured level name onto a `tracing` filter directive.
    ///
    /// Accepts both `tracing` names and the classic `WARNING`/`CRITICAL`
    /// spellings; anything unrecognised falls back to `info`.
    pub fn filter_directive(&self) -> &'static str {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" | "critical" | "fatal" => "error",
            _ => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

fn default_prefix() -> String {
    "!".to_string()
}
fn default_command() -> String {
    "claude".to_string()
}
fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}
fn default_max_response_chars() -> usize {
    DEFAULT_MAX_RESPONSE_CHARS
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl ClawcordConfig {
    /// Load config from a YAML file with CLAWCORD_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `CLAWCORD_DISCORD__BOT_TOKEN` overrides `discord.bot_token`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);
        if !Path::new(path).is_file() {
            return Err(ClawcordError::ConfigNotFound {
                path: path.to_string(),
            });
        }

        let config = Self::extract(
            Figment::new()
                .merge(Yaml::file(path))
                .merge(Env::prefixed("CLAWCORD_").split("__")),
        )?;
        tracing::debug!(path, "config loaded");
        Ok(config)
    }

    /// Parse config from an in-memory YAML document (no env overrides).
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::extract(Figment::from(Yaml::string(yaml)))
    }

    fn extract(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| ClawcordError::Config(e.to_string()))
    }
}
