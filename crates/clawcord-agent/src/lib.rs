pub mod backend;
pub mod claude_cli;
pub mod error;
pub mod event;
pub mod flatten;
pub mod pipeline;

pub use backend::{AssistantBackend, EventStream, QueryOptions};
pub use claude_cli::ClaudeCliBackend;
pub use error::AgentError;
pub use event::{ContentBlock, ReceivedEvent, ResponseEvent};
