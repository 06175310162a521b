//! Prometheus metrics and structured logging for the axe engine.
//!
//! - Prometheus metrics for order flow, gate blocks, and run progress
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
