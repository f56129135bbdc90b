pub mod adapter;
pub mod commands;
pub mod error;
pub mod handler;
pub mod reply;

pub use adapter::DiscordAdapter;
pub use error::DiscordError;
pub use reply::DiscordReply;
