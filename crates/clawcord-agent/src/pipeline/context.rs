//! Platform seam used by the mention pipeline.
//!
//! Each chat adapter implements `ReplyChannel` for the message being handled;
//! the pipeline stays platform-agnostic.

use async_trait::async_trait;

use crate::error::AgentError;

/// Where the answer to one inbound message goes.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Guard for the "working" indicator; dropping it ends the indicator.
    type Activity: Send;

    /// Show that the agent is working. Best-effort: failures are swallowed.
    fn start_activity(&self) -> Self::Activity;

    /// Send a reply referencing the inbound message.
    async fn reply(&self, text: &str) -> Result<(), AgentError>;
}
