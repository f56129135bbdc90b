pub mod config;
pub mod error;

pub use config::ClawcordConfig;
pub use error::{ClawcordError, Result};
