//! Axe order slicer application.
//!
//! Ties the workspace together into a runnable bot:
//! - TOML configuration with per-section serde defaults
//! - Paper venue seeded from config for dry runs
//! - Mode-selected execution core (TWAP scheduler / POV controller)
//! - Once-per-second supervisor loop with heartbeat and snapshots
//! - Cooperative pause/stop flags for embedders

pub mod app;
pub mod config;
pub mod error;
pub mod flags;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use flags::RunFlags;
