//! Message-to-response pipeline shared by chat adapters.
//!
//! An adapter converts a platform message into an `InboundMessage`, wraps the
//! reply target in a `ReplyChannel`, and calls `MentionPipeline::handle`.

pub mod boundary;
pub mod context;
pub mod mention;
pub mod policy;

pub use boundary::{Fault, PipelineFailure};
pub use context::ReplyChannel;
pub use mention::{extract_prompt, Disposition, InboundMessage, MentionPipeline};
pub use policy::{Reply, ReplyKind, ReplyPolicy};
