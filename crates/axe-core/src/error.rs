//! Core error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid condition '{input}': {reason}")]
    InvalidCondition { input: String, reason: String },

    #[error("Invalid instrument: {0}")]
    InvalidInstrument(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
