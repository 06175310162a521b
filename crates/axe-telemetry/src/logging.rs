//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::EnvFilter;

/// Fallback filter when `RUST_LOG` is unset: the engine and the bot run
/// at debug, everything else at info.
const DEFAULT_FILTER: &str = "info,axe_engine=debug,axe_bot=debug";

/// Install the global subscriber.
///
/// The output format follows `RUST_ENV`: flattened JSON events in
/// production, human-readable lines everywhere else.
pub fn init_logging() -> TelemetryResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let installed = if production {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(false)
            .try_init()
    };
    installed.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
