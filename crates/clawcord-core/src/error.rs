use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClawcordError {
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Discord bot token is not configured")]
    InvalidToken,
}

impl ClawcordError {
    /// Short error code string, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            ClawcordError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            ClawcordError::Config(_) => "CONFIG_ERROR",
            ClawcordError::InvalidToken => "INVALID_TOKEN",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClawcordError>;
