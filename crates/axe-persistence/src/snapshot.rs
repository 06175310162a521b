//! Versioned progress snapshot schema.
//!
//! Three documents per strategy namespace, written once per driver loop and
//! read back at startup:
//! - `progress`: scalar run state for resumption and dashboards
//! - `orders`: serialized child-order sets for tracker recovery
//! - `ui_orders`: compact rows for UI consumption
//!
//! Every field is defaulted so old snapshots load after additive schema
//! changes; an unknown `schema_version` refuses hydration and the run
//! starts fresh.

use axe_core::{ChildOrder, SchedulerStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PersistenceError, PersistenceResult};
use crate::store::{SnapshotStore, SnapshotStoreExt};

pub const PROGRESS_SCHEMA_VERSION: u32 = 1;

pub const KEY_PROGRESS: &str = "progress";
pub const KEY_ORDERS: &str = "orders";
pub const KEY_UI_ORDERS: &str = "ui_orders";

/// Scalar run state for one strategy instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSnapshot {
    pub schema_version: u32,
    pub account: String,
    pub instrument: String,
    pub side: String,
    pub status: SchedulerStatus,
    pub status_reason: String,
    pub slice_size: Decimal,
    pub post_frequency_ms: u64,
    pub total_no_of_posts: u32,
    pub posts_completed: u32,
    /// Wall-clock progress through the run duration.
    pub progress_duration_ms: u64,
    pub last_min_order_qty: Decimal,
    pub last_order_id: Option<String>,
    pub last_order_qty: Decimal,
    pub dealt_qty: Decimal,
    pub remaining_qty: Decimal,
    /// Volume-weighted average fill price across the run.
    pub deal_price: Decimal,
    pub updated_at_ms: u64,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            schema_version: PROGRESS_SCHEMA_VERSION,
            account: String::new(),
            instrument: String::new(),
            side: String::new(),
            status: SchedulerStatus::default(),
            status_reason: String::new(),
            slice_size: Decimal::ZERO,
            post_frequency_ms: 0,
            total_no_of_posts: 0,
            posts_completed: 0,
            progress_duration_ms: 0,
            last_min_order_qty: Decimal::ZERO,
            last_order_id: None,
            last_order_qty: Decimal::ZERO,
            dealt_qty: Decimal::ZERO,
            remaining_qty: Decimal::ZERO,
            deal_price: Decimal::ZERO,
            updated_at_ms: 0,
        }
    }
}

impl ProgressSnapshot {
    pub fn validate(&self) -> PersistenceResult<()> {
        if self.schema_version != PROGRESS_SCHEMA_VERSION {
            return Err(PersistenceError::SchemaVersion {
                found: self.schema_version,
                expected: PROGRESS_SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    pub fn save(&self, store: &dyn SnapshotStore, namespace: &str) -> PersistenceResult<()> {
        store.put_json(namespace, KEY_PROGRESS, self)
    }

    /// Load and validate. An unknown schema version warns and returns
    /// `None` so the caller starts fresh instead of hydrating bad state.
    pub fn load(store: &dyn SnapshotStore, namespace: &str) -> PersistenceResult<Option<Self>> {
        let Some(snapshot) = store.get_json::<Self>(namespace, KEY_PROGRESS)? else {
            return Ok(None);
        };
        match snapshot.validate() {
            Ok(()) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(namespace, error = %e, "Refusing progress snapshot, starting fresh");
                Ok(None)
            }
        }
    }
}

/// Serialized child-order sets for tracker recovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBookOfRecord {
    pub schema_version: u32,
    pub open: Vec<ChildOrder>,
    pub completed: Vec<ChildOrder>,
}

impl OrderBookOfRecord {
    pub fn new(open: Vec<ChildOrder>, completed: Vec<ChildOrder>) -> Self {
        Self {
            schema_version: PROGRESS_SCHEMA_VERSION,
            open,
            completed,
        }
    }

    pub fn save(&self, store: &dyn SnapshotStore, namespace: &str) -> PersistenceResult<()> {
        store.put_json(namespace, KEY_ORDERS, self)
    }

    pub fn load(store: &dyn SnapshotStore, namespace: &str) -> PersistenceResult<Option<Self>> {
        let Some(record) = store.get_json::<Self>(namespace, KEY_ORDERS)? else {
            return Ok(None);
        };
        if record.schema_version != PROGRESS_SCHEMA_VERSION {
            warn!(
                namespace,
                found = record.schema_version,
                "Refusing order record, starting fresh"
            );
            return Ok(None);
        }
        Ok(Some(record))
    }
}

/// Compact per-order row for UI consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiOrderRow {
    pub order_id: String,
    pub side: String,
    pub price: Decimal,
    pub size: Decimal,
    pub dealt: Decimal,
    pub status: String,
    pub created_at_ms: u64,
}

impl From<&ChildOrder> for UiOrderRow {
    fn from(order: &ChildOrder) -> Self {
        Self {
            order_id: order.id.to_string(),
            side: order.side.to_string(),
            price: order.price.inner(),
            size: order.size.inner(),
            dealt: order.dealt.inner(),
            status: order.status.to_string(),
            created_at_ms: order.created_at_ms,
        }
    }
}

/// Write the UI rows for a set of orders.
pub fn save_ui_orders(
    store: &dyn SnapshotStore,
    namespace: &str,
    orders: &[ChildOrder],
) -> PersistenceResult<()> {
    let rows: Vec<UiOrderRow> = orders.iter().map(UiOrderRow::from).collect();
    store.put_json(namespace, KEY_UI_ORDERS, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axe_core::{OrderId, Price, Side, Size};
    use rust_decimal_macros::dec;

    fn sample_progress() -> ProgressSnapshot {
        ProgressSnapshot {
            account: "acct-1".to_string(),
            instrument: "BTCUSDT".to_string(),
            side: "BUY".to_string(),
            status: SchedulerStatus::OrderSubmitted,
            slice_size: dec!(2),
            post_frequency_ms: 10_000,
            total_no_of_posts: 10,
            posts_completed: 3,
            dealt_qty: dec!(6),
            remaining_qty: dec!(94),
            deal_price: dec!(30010.5),
            updated_at_ms: 1_700_000_000_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_progress_roundtrip() {
        let store = MemoryStore::new();
        let snapshot = sample_progress();
        snapshot.save(&store, "ns").unwrap();

        let loaded = ProgressSnapshot::load(&store, "ns").unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_progress_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(ProgressSnapshot::load(&store, "ns").unwrap(), None);
    }

    #[test]
    fn test_unknown_version_refused() {
        let store = MemoryStore::new();
        let mut snapshot = sample_progress();
        snapshot.schema_version = 99;
        store.put_json("ns", KEY_PROGRESS, &snapshot).unwrap();

        assert_eq!(ProgressSnapshot::load(&store, "ns").unwrap(), None);
    }

    #[test]
    fn test_sparse_document_loads_with_defaults() {
        let store = MemoryStore::new();
        store
            .put("ns", KEY_PROGRESS, r#"{"schema_version":1,"dealt_qty":"5"}"#)
            .unwrap();

        let loaded = ProgressSnapshot::load(&store, "ns").unwrap().unwrap();
        assert_eq!(loaded.dealt_qty, dec!(5));
        assert_eq!(loaded.status, SchedulerStatus::Waiting);
        assert_eq!(loaded.posts_completed, 0);
    }

    #[test]
    fn test_order_record_roundtrip() {
        let store = MemoryStore::new();
        let open = vec![ChildOrder::new(
            OrderId::new(),
            Side::Buy,
            Price::new(dec!(30000)),
            Size::new(dec!(1)),
            1_000,
            "r".to_string(),
        )];
        let record = OrderBookOfRecord::new(open.clone(), vec![]);
        record.save(&store, "ns").unwrap();

        let loaded = OrderBookOfRecord::load(&store, "ns").unwrap().unwrap();
        assert_eq!(loaded.open, open);
        assert!(loaded.completed.is_empty());
    }

    #[test]
    fn test_ui_rows_written() {
        let store = MemoryStore::new();
        let mut order = ChildOrder::new(
            OrderId::from_string("axe_1_abc".to_string()),
            Side::Sell,
            Price::new(dec!(101)),
            Size::new(dec!(3)),
            2_000,
            String::new(),
        );
        order.dealt = Size::new(dec!(1));

        save_ui_orders(&store, "ns", &[order]).unwrap();
        let rows: Vec<UiOrderRow> = store.get_json("ns", KEY_UI_ORDERS).unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].order_id, "axe_1_abc");
        assert_eq!(rows[0].side, "SELL");
        assert_eq!(rows[0].dealt, dec!(1));
    }
}
