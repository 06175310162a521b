//! Core domain types for the axe execution engine.
//!
//! This crate provides fundamental types used throughout the engine:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `InstrumentLimits`: Venue trading constraints (tick, step, minimums)
//! - `Side`, `ChildOrder`, `OrderStatus`: Order vocabulary
//! - `SchedulerStatus`: The execution state machine's status set
//! - `RawStrategyConfig` / `StrategyConfig`: Parent-order configuration
//! - `StopCondition`, `TriggerCondition`: Guard conditions from config strings

pub mod account;
pub mod book;
pub mod condition;
pub mod config;
pub mod decimal;
pub mod error;
pub mod instrument;
pub mod order;
pub mod status;

pub use account::{AccountId, AccountKind, AssetBalance, BalanceSnapshot, PositionMode};
pub use book::{BookTop, Kline};
pub use condition::{Comparison, StopCondition, TriggerCondition};
pub use config::{RawStrategyConfig, StrategyConfig, StrategyMode};
pub use decimal::{Price, Size};
pub use error::{CoreError, CoreResult};
pub use instrument::InstrumentLimits;
pub use order::{ChildOrder, OrderId, OrderStatus, Side};
pub use status::SchedulerStatus;
