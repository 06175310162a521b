//! Venue client seam.
//!
//! Everything the engine needs from a venue goes through [`ExchangeClient`]:
//! order placement/cancellation, order state, instrument metadata, balances,
//! top-of-book (own and reference venues), volume candles, and the venue's
//! replication lag. Implementations must be cheap to clone behind an `Arc`
//! and safe to call from the driver loop once per second.

use std::sync::Arc;

use async_trait::async_trait;
use axe_core::{
    AccountId, BalanceSnapshot, BookTop, InstrumentLimits, Kline, OrderId, OrderStatus, Price,
    Side, Size,
};
use serde::{Deserialize, Serialize};

use crate::error::ExchangeResult;

/// One limit order as the venue sees it: client-generated id, explicit
/// account, and the opaque remark forwarded from the strategy config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub account: AccountId,
    pub symbol: String,
    pub side: Side,
    pub price: Price,
    pub size: Size,
    pub client_order_id: OrderId,
    pub remark: String,
}

/// Venue acknowledgement of a placement. The venue echoes the client order
/// id; there is a single id space end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub accepted_at_ms: u64,
}

/// Point-in-time view of one order at the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub requested: Size,
    pub dealt: Size,
    /// Cumulative filled notional in quote units.
    pub dealt_notional: rust_decimal::Decimal,
    pub status: OrderStatus,
}

impl OrderSnapshot {
    pub fn outstanding(&self) -> Size {
        self.requested.saturating_sub(self.dealt)
    }
}

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Venue name as used in trigger conditions and logs.
    fn venue(&self) -> &str;

    async fn place_limit_order(&self, request: &PlaceOrderRequest) -> ExchangeResult<OrderAck>;

    /// Request cancellation. `UnknownOrder` means the venue no longer has
    /// the order open, which callers treat as already closed.
    async fn cancel_order(&self, symbol: &str, order_id: &OrderId) -> ExchangeResult<()>;

    async fn order_snapshot(&self, symbol: &str, order_id: &OrderId)
        -> ExchangeResult<OrderSnapshot>;

    async fn instrument_limits(&self, symbol: &str) -> ExchangeResult<InstrumentLimits>;

    async fn balance_snapshot(&self, account: &AccountId) -> ExchangeResult<BalanceSnapshot>;

    /// Top-of-book for the traded instrument. `Ok(None)` is a venue with no
    /// book for the symbol right now; transport failures are `Err`.
    async fn book_top(&self, symbol: &str) -> ExchangeResult<Option<BookTop>>;

    /// Top-of-book on an arbitrary venue/pair, for trigger conditions.
    async fn reference_book_top(&self, venue: &str, pair: &str)
        -> ExchangeResult<Option<BookTop>>;

    /// Most recent volume candles, oldest first, at the given interval.
    async fn recent_klines(
        &self,
        symbol: &str,
        interval_ms: u64,
        limit: usize,
    ) -> ExchangeResult<Vec<Kline>>;

    /// How far the venue's public data replication runs behind its matching
    /// engine, in milliseconds.
    async fn replication_lag_ms(&self, venue: &str) -> ExchangeResult<u64>;
}

/// Arc wrapper for client trait objects.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;
