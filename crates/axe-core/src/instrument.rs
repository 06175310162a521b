//! Instrument trading limits.
//!
//! Venue-published constraints on a tradable pair: price tick, size step,
//! minimum order size and minimum notional. The engine refreshes these
//! periodically because venues raise minimums on live markets.

use crate::decimal::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trading constraints for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentLimits {
    /// Pair symbol, e.g. "BTCUSDT".
    pub symbol: String,
    /// Base asset, e.g. "BTC".
    pub base: String,
    /// Quote asset, e.g. "USDT".
    pub quote: String,
    /// Price granularity.
    pub price_tick: Price,
    /// Size granularity.
    pub size_step: Size,
    /// Smallest order quantity the venue accepts.
    pub min_order_size: Size,
    /// Smallest order notional (size * price) the venue accepts.
    pub min_notional: Decimal,
}

impl InstrumentLimits {
    /// Effective minimum order quantity at a given price.
    ///
    /// The larger of the venue's size floor and the quantity needed to
    /// clear the notional floor, lifted onto the size grid.
    pub fn min_order_qty(&self, price: Price) -> Size {
        if price.is_zero() {
            return self.min_order_size;
        }
        let notional_qty = Size::new(self.min_notional / price.inner());
        let min = if notional_qty > self.min_order_size {
            notional_qty
        } else {
            self.min_order_size
        };
        min.round_up_to_step(self.size_step)
    }

    /// Round a candidate price down onto the tick grid.
    pub fn round_price(&self, price: Price) -> Price {
        price.round_to_tick(self.price_tick)
    }

    /// Round a candidate quantity down onto the size grid.
    pub fn round_size(&self, size: Size) -> Size {
        size.round_to_step(self.size_step)
    }
}

impl Default for InstrumentLimits {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            base: String::new(),
            quote: String::new(),
            price_tick: Price::new(Decimal::new(1, 2)),
            size_step: Size::new(Decimal::new(1, 3)),
            min_order_size: Size::new(Decimal::new(1, 3)),
            min_notional: Decimal::ZERO,
        }
    }
}
