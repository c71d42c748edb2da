//! Process-wide logging setup.
//!
//! Installs a `tracing-subscriber` registry filtered by `RUST_LOG` (default
//! `info`) and forwards `log` records into it, so library code can keep using
//! the `log` macros while poll tasks carry `tracing` spans.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::LogFormat;

static INIT: Once = Once::new();

/// Initializes logging for the process. Subsequent calls are no-ops.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = Registry::default().with(filter);

        let installed = match format {
            LogFormat::Text => tracing::subscriber::set_global_default(
                registry.with(fmt::layer().with_target(true)),
            ),
            LogFormat::Json => tracing::subscriber::set_global_default(
                registry.with(fmt::layer().json().with_current_span(true)),
            ),
        };
        if let Err(e) = installed {
            eprintln!("Logging already initialized elsewhere: {}", e);
            return;
        }

        if let Err(e) = tracing_log::LogTracer::init() {
            eprintln!("Failed to forward log records to tracing: {}", e);
        }
    });
}
