//! Order-state tracking.
//!
//! The tracker owns every child order of a run. The scheduler registers
//! orders at submission, pulls venue state into the tracker once per tick,
//! and reads dealt totals and per-order predicates from it. Totals include
//! cancelled partial fills, so `dealt_total` only ever grows.

use axe_core::{ChildOrder, OrderId, OrderStatus, Size};
use axe_exchange::{ExchangeClient, ExchangeError, OrderSnapshot};
use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::EngineResult;

#[async_trait]
pub trait OrderTracker: Send + Sync {
    /// Start watching an order. Idempotent per id.
    fn register(&self, order: ChildOrder);

    /// Fold one venue snapshot into the tracked order.
    fn apply(&self, snapshot: &OrderSnapshot);

    /// Pull venue state for every active order.
    ///
    /// An order the venue no longer knows is marked failed locally; venue
    /// transport errors propagate so the caller can skip the tick.
    async fn sync(&self, client: &dyn ExchangeClient, symbol: &str) -> EngineResult<()>;

    fn get(&self, id: &OrderId) -> Option<ChildOrder>;

    fn status(&self, id: &OrderId) -> Option<OrderStatus>;

    /// Unfilled remainder of one order; zero when unknown.
    fn outstanding(&self, id: &OrderId) -> Size;

    /// Cumulative filled quantity across all tracked orders.
    fn dealt_total(&self) -> Size;

    /// Cumulative filled notional across all tracked orders.
    fn dealt_notional_total(&self) -> Decimal;

    /// Quantity committed at the venue: requested size of live and
    /// completed orders, plus the filled part of dead ones. The overshoot
    /// guard compares this against the parent quantity.
    fn committed_size_total(&self) -> Size;

    fn open_orders(&self) -> Vec<ChildOrder>;

    fn terminal_orders(&self) -> Vec<ChildOrder>;

    /// Stop tracking an order entirely (abandonment, failure cooldown).
    fn remove(&self, id: &OrderId) -> Option<ChildOrder>;

    /// Hydrate from a persisted order set.
    fn restore(&self, orders: Vec<ChildOrder>);

    fn clear(&self);

    fn is_terminal(&self, id: &OrderId) -> bool {
        self.status(id).map(|s| s.is_terminal()).unwrap_or(true)
    }

    fn is_failed(&self, id: &OrderId) -> bool {
        self.status(id).map(|s| s.is_failed()).unwrap_or(false)
    }
}

/// DashMap-backed tracker for a single strategy run.
#[derive(Default)]
pub struct InMemoryOrderTracker {
    orders: DashMap<OrderId, ChildOrder>,
}

impl InMemoryOrderTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderTracker for InMemoryOrderTracker {
    fn register(&self, order: ChildOrder) {
        self.orders.entry(order.id.clone()).or_insert(order);
    }

    fn apply(&self, snapshot: &OrderSnapshot) {
        if let Some(mut order) = self.orders.get_mut(&snapshot.order_id) {
            order.dealt = snapshot.dealt;
            order.dealt_notional = snapshot.dealt_notional;
            order.status = snapshot.status;
        }
    }

    async fn sync(&self, client: &dyn ExchangeClient, symbol: &str) -> EngineResult<()> {
        let active: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|e| e.value().status.is_active())
            .map(|e| e.key().clone())
            .collect();

        for id in active {
            match client.order_snapshot(symbol, &id).await {
                Ok(snapshot) => self.apply(&snapshot),
                Err(ExchangeError::UnknownOrder(_)) => {
                    warn!(order_id = %id, "Venue no longer knows order, marking failed");
                    if let Some(mut order) = self.orders.get_mut(&id) {
                        order.status = OrderStatus::Failed;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn get(&self, id: &OrderId) -> Option<ChildOrder> {
        self.orders.get(id).map(|o| o.clone())
    }

    fn status(&self, id: &OrderId) -> Option<OrderStatus> {
        self.orders.get(id).map(|o| o.status)
    }

    fn outstanding(&self, id: &OrderId) -> Size {
        self.orders
            .get(id)
            .map(|o| o.outstanding())
            .unwrap_or(Size::ZERO)
    }

    fn dealt_total(&self) -> Size {
        self.orders
            .iter()
            .fold(Size::ZERO, |acc, o| acc + o.value().dealt)
    }

    fn dealt_notional_total(&self) -> Decimal {
        self.orders
            .iter()
            .fold(Decimal::ZERO, |acc, o| acc + o.value().dealt_notional)
    }

    fn committed_size_total(&self) -> Size {
        self.orders.iter().fold(Size::ZERO, |acc, entry| {
            let order = entry.value();
            match order.status {
                OrderStatus::Sending | OrderStatus::Open | OrderStatus::Completed => {
                    acc + order.size
                }
                OrderStatus::Canceled | OrderStatus::Failed => acc + order.dealt,
            }
        })
    }

    fn open_orders(&self) -> Vec<ChildOrder> {
        self.orders
            .iter()
            .filter(|e| e.value().status.is_active())
            .map(|e| e.value().clone())
            .collect()
    }

    fn terminal_orders(&self) -> Vec<ChildOrder> {
        self.orders
            .iter()
            .filter(|e| e.value().status.is_terminal())
            .map(|e| e.value().clone())
            .collect()
    }

    fn remove(&self, id: &OrderId) -> Option<ChildOrder> {
        self.orders.remove(id).map(|(_, order)| order)
    }

    fn restore(&self, orders: Vec<ChildOrder>) {
        for order in orders {
            self.orders.insert(order.id.clone(), order);
        }
    }

    fn clear(&self) {
        self.orders.clear();
    }
}
