//! Venue connectivity for the axe engine.
//!
//! Defines the async seam the engine talks to a venue through, plus an
//! in-process paper venue used by tests and dry runs.
//!
//! # Key Components
//!
//! - [`ExchangeClient`]: async trait covering placement, cancellation,
//!   order state, instrument metadata, balances, books, and candles
//! - [`PaperExchange`]: scriptable reference implementation
//! - [`ExchangeError`]: venue error taxonomy with retryability

pub mod client;
pub mod error;
pub mod paper;

// Client seam
pub use client::{DynExchangeClient, ExchangeClient, OrderAck, OrderSnapshot, PlaceOrderRequest};

// Error types
pub use error::{ExchangeError, ExchangeResult};

// Paper venue
pub use paper::PaperExchange;
