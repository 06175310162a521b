//! Engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] axe_core::CoreError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] axe_exchange::ExchangeError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] axe_persistence::PersistenceError),

    #[error("Instrument unavailable: {0}")]
    InstrumentUnavailable(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
