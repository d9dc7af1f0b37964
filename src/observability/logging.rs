//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber for binaries and tests that want one
//! - Honor `RUST_LOG`, falling back to the configured level
//!
//! Library code only emits events; installing a subscriber is the embedder's choice.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::error::{Error, Result};

/// Install a global fmt subscriber filtered by `RUST_LOG` or `config.log_level`.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| Error::Config(format!("invalid log level '{}': {e}", config.log_level)))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(config.ansi))
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = ObservabilityConfig {
            log_level: "request_pipeline=loud".into(),
            ..ObservabilityConfig::default()
        };
        assert!(matches!(init_logging(&config), Err(Error::Config(_))));
    }
}
