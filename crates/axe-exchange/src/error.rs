//! Exchange error types.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    #[error("Order submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Cancel failed for order {0}")]
    CancelFailed(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(String),

    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Rate limited")]
    RateLimited,
}

impl ExchangeError {
    /// Whether a later identical request can reasonably succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_)
                | Self::RateLimited
                | Self::BalanceUnavailable(_)
                | Self::MarketDataUnavailable(_)
        )
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
