use std::process::ExitStatus;

/// Errors raised while querying the assistant or delivering its answer.
///
/// All of these are per-message: the pipeline's fault boundary logs them and
/// answers with the `general_error` template.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("claude CLI not found at '{0}'; install Claude Code first")]
    NotFound(String),

    #[error("failed to spawn claude CLI: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("claude CLI I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode stream event ({source}): {line}")]
    Decode {
        source: serde_json::Error,
        line: String,
    },

    #[error("failed to render tool input: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("claude CLI exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("tool `{tool}` input has no string field `{field}`")]
    MalformedToolInput { tool: String, field: &'static str },

    #[error("reply send failed: {0}")]
    Reply(String),
}
