//! Tracing subscriber setup. `RUST_LOG` wins over the configured level.

use tracing_subscriber::EnvFilter;

use clawcord_core::config::{LogFormat, LoggingConfig};

/// Install the global subscriber from the `logging` config section.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.format {
        LogFormat::Full => builder.init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

/// Subscriber used before the config is available (e.g. to report that it
/// could not be loaded).
pub fn init_default() {
    init(&LoggingConfig::default());
}
