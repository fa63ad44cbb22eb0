//! Logging setup for the command-line tool

use serde::{Deserialize, Serialize};

/// Subscriber settings; `RUST_LOG` takes precedence over `level` when set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `sku_forecast=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, json: bool) -> Self {
        Self {
            level: level.into(),
            json,
        }
    }

    /// Install the global subscriber; a second call is a no-op
    pub fn init(&self) {
        use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        let subscriber = tracing_subscriber::registry().with(filter);

        if self.json {
            let layer = fmt::layer().json().with_writer(std::io::stderr);
            subscriber.with(layer).try_init().ok();
        } else {
            let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
            subscriber.with(layer).try_init().ok();
        }
    }
}
