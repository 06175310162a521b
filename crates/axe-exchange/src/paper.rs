//! In-process paper venue.
//!
//! Implements [`ExchangeClient`] against scriptable state: books, balances,
//! candles, fills, and failures are all set by the caller. Used by the
//! integration tests and by dry runs, where it stands in for real
//! connectivity without touching a venue.

use std::collections::HashMap;

use axe_core::{
    AccountId, BalanceSnapshot, BookTop, InstrumentLimits, Kline, OrderId, OrderStatus, Size,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::client::{ExchangeClient, OrderAck, OrderSnapshot, PlaceOrderRequest};
use crate::error::{ExchangeError, ExchangeResult};

struct PaperOrder {
    request: PlaceOrderRequest,
    dealt: Size,
    dealt_notional: Decimal,
    status: OrderStatus,
}

impl PaperOrder {
    fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            order_id: self.request.client_order_id.clone(),
            requested: self.request.size,
            dealt: self.dealt,
            dealt_notional: self.dealt_notional,
            status: self.status,
        }
    }
}

#[derive(Default)]
struct PaperState {
    now_ms: u64,
    limits: HashMap<String, InstrumentLimits>,
    balances: HashMap<AccountId, BalanceSnapshot>,
    books: HashMap<String, BookTop>,
    reference_books: HashMap<(String, String), BookTop>,
    klines: HashMap<String, Vec<Kline>>,
    replication_lags: HashMap<String, u64>,
    orders: HashMap<OrderId, PaperOrder>,
    placements: Vec<PlaceOrderRequest>,
    cancel_requests: Vec<OrderId>,
    next_place_error: Option<ExchangeError>,
    // Cancel requests to acknowledge without closing the order.
    deaf_cancels: u32,
    // Fraction of each placement filled immediately at its limit price.
    auto_fill: Option<Decimal>,
}

/// Scriptable in-process venue.
pub struct PaperExchange {
    venue: String,
    state: Mutex<PaperState>,
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new("paper")
    }
}

impl PaperExchange {
    pub fn new(venue: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            state: Mutex::new(PaperState::default()),
        }
    }

    /// Advance the venue clock used for acknowledgement timestamps.
    pub fn set_now_ms(&self, now_ms: u64) {
        self.state.lock().now_ms = now_ms;
    }

    pub fn set_instrument(&self, limits: InstrumentLimits) {
        self.state.lock().limits.insert(limits.symbol.clone(), limits);
    }

    pub fn set_balance(&self, account: AccountId, snapshot: BalanceSnapshot) {
        self.state.lock().balances.insert(account, snapshot);
    }

    pub fn set_book(&self, symbol: impl Into<String>, book: BookTop) {
        self.state.lock().books.insert(symbol.into(), book);
    }

    pub fn clear_book(&self, symbol: &str) {
        self.state.lock().books.remove(symbol);
    }

    pub fn set_reference_book(
        &self,
        venue: impl Into<String>,
        pair: impl Into<String>,
        book: BookTop,
    ) {
        self.state
            .lock()
            .reference_books
            .insert((venue.into(), pair.into()), book);
    }

    pub fn set_klines(&self, symbol: impl Into<String>, klines: Vec<Kline>) {
        self.state.lock().klines.insert(symbol.into(), klines);
    }

    pub fn set_replication_lag(&self, venue: impl Into<String>, lag_ms: u64) {
        self.state.lock().replication_lags.insert(venue.into(), lag_ms);
    }

    /// Fail the next placement with the given error.
    pub fn fail_next_place(&self, error: ExchangeError) {
        self.state.lock().next_place_error = Some(error);
    }

    /// Acknowledge the next `n` cancel requests without closing the order.
    pub fn swallow_cancels(&self, n: u32) {
        self.state.lock().deaf_cancels = n;
    }

    /// Fill the given fraction of every placement immediately.
    pub fn set_auto_fill(&self, fraction: Decimal) {
        self.state.lock().auto_fill = Some(fraction);
    }

    /// Fill `qty` of an open order at its limit price. Caps at the
    /// requested quantity and marks the order completed when full.
    pub fn fill(&self, order_id: &OrderId, qty: Size) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| ExchangeError::UnknownOrder(order_id.to_string()))?;
        let room = order.request.size.saturating_sub(order.dealt);
        let fill = if qty > room { room } else { qty };
        order.dealt = order.dealt + fill;
        order.dealt_notional += fill.notional(order.request.price);
        if order.dealt >= order.request.size {
            order.status = OrderStatus::Completed;
        } else if order.status == OrderStatus::Sending {
            order.status = OrderStatus::Open;
        }
        Ok(())
    }

    pub fn placements(&self) -> Vec<PlaceOrderRequest> {
        self.state.lock().placements.clone()
    }

    pub fn cancel_requests(&self) -> Vec<OrderId> {
        self.state.lock().cancel_requests.clone()
    }

    pub fn open_order_count(&self) -> usize {
        self.state
            .lock()
            .orders
            .values()
            .filter(|o| o.status.is_active())
            .count()
    }
}

#[async_trait]
impl ExchangeClient for PaperExchange {
    fn venue(&self) -> &str {
        &self.venue
    }

    async fn place_limit_order(&self, request: &PlaceOrderRequest) -> ExchangeResult<OrderAck> {
        let mut state = self.state.lock();
        if let Some(error) = state.next_place_error.take() {
            return Err(error);
        }

        state.placements.push(request.clone());
        let auto_fill = state.auto_fill;
        let mut order = PaperOrder {
            request: request.clone(),
            dealt: Size::ZERO,
            dealt_notional: Decimal::ZERO,
            status: OrderStatus::Open,
        };
        if let Some(fraction) = auto_fill {
            let fill = request.size * fraction;
            order.dealt = fill;
            order.dealt_notional = fill.notional(request.price);
            if order.dealt >= request.size {
                order.status = OrderStatus::Completed;
            }
        }
        state.orders.insert(request.client_order_id.clone(), order);

        Ok(OrderAck {
            order_id: request.client_order_id.clone(),
            accepted_at_ms: state.now_ms,
        })
    }

    async fn cancel_order(&self, _symbol: &str, order_id: &OrderId) -> ExchangeResult<()> {
        let mut state = self.state.lock();
        state.cancel_requests.push(order_id.clone());
        if state.deaf_cancels > 0 {
            state.deaf_cancels -= 1;
            return Ok(());
        }
        match state.orders.get_mut(order_id) {
            Some(order) if order.status.is_active() => {
                order.status = OrderStatus::Canceled;
                Ok(())
            }
            _ => Err(ExchangeError::UnknownOrder(order_id.to_string())),
        }
    }

    async fn order_snapshot(
        &self,
        _symbol: &str,
        order_id: &OrderId,
    ) -> ExchangeResult<OrderSnapshot> {
        self.state
            .lock()
            .orders
            .get(order_id)
            .map(PaperOrder::snapshot)
            .ok_or_else(|| ExchangeError::UnknownOrder(order_id.to_string()))
    }

    async fn instrument_limits(&self, symbol: &str) -> ExchangeResult<InstrumentLimits> {
        self.state
            .lock()
            .limits
            .get(symbol)
            .cloned()
            .ok_or_else(|| ExchangeError::UnknownInstrument(symbol.to_string()))
    }

    async fn balance_snapshot(&self, account: &AccountId) -> ExchangeResult<BalanceSnapshot> {
        self.state
            .lock()
            .balances
            .get(account)
            .cloned()
            .ok_or_else(|| ExchangeError::BalanceUnavailable(account.to_string()))
    }

    async fn book_top(&self, symbol: &str) -> ExchangeResult<Option<BookTop>> {
        Ok(self.state.lock().books.get(symbol).cloned())
    }

    async fn reference_book_top(
        &self,
        venue: &str,
        pair: &str,
    ) -> ExchangeResult<Option<BookTop>> {
        Ok(self
            .state
            .lock()
            .reference_books
            .get(&(venue.to_string(), pair.to_string()))
            .cloned())
    }

    async fn recent_klines(
        &self,
        symbol: &str,
        _interval_ms: u64,
        limit: usize,
    ) -> ExchangeResult<Vec<Kline>> {
        let state = self.state.lock();
        let klines = state.klines.get(symbol).cloned().unwrap_or_default();
        let start = klines.len().saturating_sub(limit);
        Ok(klines[start..].to_vec())
    }

    async fn replication_lag_ms(&self, venue: &str) -> ExchangeResult<u64> {
        Ok(self
            .state
            .lock()
            .replication_lags
            .get(venue)
            .copied()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axe_core::{Price, Side};
    use rust_decimal_macros::dec;

    fn sample_request(size: Decimal) -> PlaceOrderRequest {
        PlaceOrderRequest {
            account: AccountId::new("acct-1"),
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            price: Price::new(dec!(30000)),
            size: Size::new(size),
            client_order_id: OrderId::new(),
            remark: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_place_fill_complete_lifecycle() {
        let venue = PaperExchange::default();
        let request = sample_request(dec!(2));
        let ack = venue.place_limit_order(&request).await.unwrap();
        assert_eq!(ack.order_id, request.client_order_id);

        let snap = venue
            .order_snapshot("BTCUSDT", &request.client_order_id)
            .await
            .unwrap();
        assert_eq!(snap.status, OrderStatus::Open);
        assert_eq!(snap.dealt, Size::ZERO);

        venue.fill(&request.client_order_id, Size::new(dec!(0.5))).unwrap();
        let snap = venue
            .order_snapshot("BTCUSDT", &request.client_order_id)
            .await
            .unwrap();
        assert_eq!(snap.dealt, Size::new(dec!(0.5)));
        assert_eq!(snap.outstanding(), Size::new(dec!(1.5)));
        assert_eq!(snap.dealt_notional, dec!(15000));

        // Overfill attempts cap at the requested quantity.
        venue.fill(&request.client_order_id, Size::new(dec!(10))).unwrap();
        let snap = venue
            .order_snapshot("BTCUSDT", &request.client_order_id)
            .await
            .unwrap();
        assert_eq!(snap.dealt, Size::new(dec!(2)));
        assert_eq!(snap.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_scripted_place_failure() {
        let venue = PaperExchange::default();
        venue.fail_next_place(ExchangeError::RateLimited);

        let request = sample_request(dec!(1));
        assert!(venue.place_limit_order(&request).await.is_err());
        // Only the next placement fails.
        assert!(venue.place_limit_order(&request).await.is_ok());
        assert_eq!(venue.placements().len(), 1);
    }

    #[tokio::test]
    async fn test_swallowed_cancels_keep_order_open() {
        let venue = PaperExchange::default();
        let request = sample_request(dec!(1));
        venue.place_limit_order(&request).await.unwrap();
        venue.swallow_cancels(2);

        for _ in 0..2 {
            venue
                .cancel_order("BTCUSDT", &request.client_order_id)
                .await
                .unwrap();
            let snap = venue
                .order_snapshot("BTCUSDT", &request.client_order_id)
                .await
                .unwrap();
            assert_eq!(snap.status, OrderStatus::Open);
        }

        venue
            .cancel_order("BTCUSDT", &request.client_order_id)
            .await
            .unwrap();
        let snap = venue
            .order_snapshot("BTCUSDT", &request.client_order_id)
            .await
            .unwrap();
        assert_eq!(snap.status, OrderStatus::Canceled);
        assert_eq!(venue.cancel_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_auto_fill_fraction() {
        let venue = PaperExchange::default();
        venue.set_auto_fill(dec!(0.25));

        let request = sample_request(dec!(4));
        venue.place_limit_order(&request).await.unwrap();
        let snap = venue
            .order_snapshot("BTCUSDT", &request.client_order_id)
            .await
            .unwrap();
        assert_eq!(snap.dealt, Size::new(dec!(1)));
        assert_eq!(snap.status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn test_missing_lookups() {
        let venue = PaperExchange::default();
        assert!(venue
            .order_snapshot("BTCUSDT", &OrderId::new())
            .await
            .is_err());
        assert!(venue.instrument_limits("BTCUSDT").await.is_err());
        assert_eq!(venue.book_top("BTCUSDT").await.unwrap(), None);
        assert_eq!(venue.replication_lag_ms("paper").await.unwrap(), 0);
    }
}
