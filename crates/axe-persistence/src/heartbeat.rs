//! Dead-man switch for strategy runs.
//!
//! The driver loop refreshes the heartbeat once per iteration by writing
//! the next deadline into the strategy namespace. Any reader (a monitor, a
//! dashboard, a restarting supervisor) treats a passed deadline as a hung
//! run. The timeout is fixed at registration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PersistenceResult;
use crate::store::{SnapshotStore, SnapshotStoreExt};

pub const KEY_HEARTBEAT: &str = "heartbeat";

/// One heartbeat document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    /// Past this instant the run is considered hung.
    pub deadline_ms: u64,
    pub timeout_ms: u64,
    pub refreshed_at_ms: u64,
}

impl HeartbeatRecord {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.deadline_ms
    }
}

/// Writer half of the dead-man switch.
pub struct Heartbeat {
    store: Arc<dyn SnapshotStore>,
    namespace: String,
    timeout_ms: u64,
}

impl Heartbeat {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        namespace: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            timeout_ms,
        }
    }

    /// Push the deadline out by the fixed timeout.
    pub fn refresh(&self, now_ms: u64) -> PersistenceResult<()> {
        let record = HeartbeatRecord {
            deadline_ms: now_ms + self.timeout_ms,
            timeout_ms: self.timeout_ms,
            refreshed_at_ms: now_ms,
        };
        self.store
            .put_json(&self.namespace, KEY_HEARTBEAT, &record)?;
        debug!(
            namespace = %self.namespace,
            deadline_ms = record.deadline_ms,
            "Heartbeat refreshed"
        );
        Ok(())
    }

    /// Remove the heartbeat on clean shutdown so readers do not report a
    /// finished run as hung.
    pub fn clear(&self) -> PersistenceResult<()> {
        self.store.delete(&self.namespace, KEY_HEARTBEAT)
    }
}

/// Reader half: `None` means no live run has registered.
pub fn read_heartbeat(
    store: &dyn SnapshotStore,
    namespace: &str,
) -> PersistenceResult<Option<HeartbeatRecord>> {
    store.get_json(namespace, KEY_HEARTBEAT)
}
