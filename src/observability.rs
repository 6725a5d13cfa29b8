//! Tracing initialization.
//!
//! The core itself only emits through `tracing` macros; embedding
//! applications decide whether and how to subscribe. This helper wires
//! the usual env-filter + fmt stack for binaries and tests.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;
use crate::error::{CgpError, Result};

/// Installs the global subscriber. Safe to call once per process;
/// a second call reports a configuration error.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CgpError::Config(format!("invalid log filter: {}", e)))?;

    if config.json {
        let fmt_layer = fmt::layer().json().with_target(true);
        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| CgpError::Config(format!("failed to init tracing: {}", e)))?;
    } else {
        let fmt_layer = fmt::layer().with_target(true);
        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| CgpError::Config(format!("failed to init tracing: {}", e)))?;
    }

    Ok(())
}
