//! Execution engine for the axe order slicer.
//!
//! Turns one validated strategy into a stream of child limit orders:
//! time-paced for a TWAP run, volume-paced for a POV run. The engine is
//! cooperatively driven; the supervisor calls `tick`/`poll` roughly once
//! a second and everything else is wall-clock math against the timestamp
//! it passes in.
//!
//! # Key Components
//!
//! - [`ExecutionScheduler`]: paced child-order state machine with guard
//!   rails (freshness gate, balance guard, threshold/trigger/stop checks)
//! - [`ParticipationController`]: burst-based POV wrapper over the
//!   scheduler
//! - [`SlicePlan`]/[`planner::plan`]: slice sizing and pacing arithmetic
//! - [`OrderTracker`]: venue order-state bookkeeping seam
//! - [`MarketDataGate`], [`BalanceGuard`], [`LimitsCache`]: the guard
//!   rails themselves

pub mod balance;
pub mod error;
pub mod gate;
pub mod limits;
pub mod participation;
pub mod planner;
pub mod scheduler;
pub mod tracker;

// Cores
pub use participation::ParticipationController;
pub use scheduler::{ExecutionScheduler, SchedulerSettings};

// Planning
pub use planner::{plan, SlicePlan};

// Guard rails
pub use balance::{BalanceCache, BalanceCheck, BalanceGuard};
pub use gate::{Freshness, MarketDataGate};
pub use limits::LimitsCache;

// Order-state bookkeeping
pub use tracker::{InMemoryOrderTracker, OrderTracker};

// Error types
pub use error::{EngineError, EngineResult};
