//! Market-data views: top-of-book and traded-volume candles.

use crate::decimal::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Best bid/offer with the venue's own update timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookTop {
    pub bid_price: Price,
    pub bid_size: Size,
    pub ask_price: Price,
    pub ask_size: Size,
    /// Venue book update time (Unix ms).
    pub ts_ms: u64,
}

impl BookTop {
    pub fn new(
        bid_price: Price,
        bid_size: Size,
        ask_price: Price,
        ask_size: Size,
        ts_ms: u64,
    ) -> Self {
        Self {
            bid_price,
            bid_size,
            ask_price,
            ask_size,
            ts_ms,
        }
    }

    /// True when either side is absent (zero price or size).
    pub fn is_empty(&self) -> bool {
        self.bid_price.is_zero()
            || self.ask_price.is_zero()
            || self.bid_size.is_zero()
            || self.ask_size.is_zero()
    }

    pub fn mid_price(&self) -> Option<Price> {
        if self.is_empty() {
            return None;
        }
        Some(Price::new(
            (self.bid_price.inner() + self.ask_price.inner()) / Decimal::TWO,
        ))
    }
}

/// Fixed-interval traded-volume aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// Interval open (Unix ms).
    pub open_time_ms: u64,
    /// Interval close (Unix ms, exclusive).
    pub close_time_ms: u64,
    /// Base-asset volume traded in the interval.
    pub volume: Size,
}

impl Kline {
    pub fn interval_ms(&self) -> u64 {
        self.close_time_ms.saturating_sub(self.open_time_ms)
    }

    /// Fraction of the interval elapsed at `now_ms`, clamped to [0, 1].
    pub fn elapsed_fraction(&self, now_ms: u64) -> Decimal {
        let interval = self.interval_ms();
        if interval == 0 {
            return Decimal::ONE;
        }
        let elapsed = now_ms.saturating_sub(self.open_time_ms).min(interval);
        Decimal::from(elapsed) / Decimal::from(interval)
    }
}
