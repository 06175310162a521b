//! Persistence for the axe engine.
//!
//! - Key-value snapshot store (atomic file-per-key JSON, plus in-memory)
//! - Versioned progress/orders/ui_orders schema, validated on load
//! - Dead-man-switch heartbeat per strategy namespace

pub mod error;
pub mod heartbeat;
pub mod snapshot;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use heartbeat::{read_heartbeat, Heartbeat, HeartbeatRecord, KEY_HEARTBEAT};
pub use snapshot::{
    save_ui_orders, OrderBookOfRecord, ProgressSnapshot, UiOrderRow, KEY_ORDERS, KEY_PROGRESS,
    KEY_UI_ORDERS, PROGRESS_SCHEMA_VERSION,
};
pub use store::{FileStore, MemoryStore, SnapshotStore, SnapshotStoreExt};
