//! Subscription types for store change notifications.

use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 256
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Include order list updates.
    pub include_orders: bool,

    /// Include catalog updates.
    pub include_catalog: bool,

    /// Include snapshot lifecycle events (create, restore, reset).
    pub include_snapshots: bool,

    /// Include raw storage key writes.
    pub include_storage: bool,

    /// Restrict storage events to these keys (None = all keys).
    pub storage_keys: Option<Vec<String>>,
}

impl SubscriptionFilter {
    /// Order list updates only.
    pub fn orders() -> Self {
        Self {
            include_orders: true,
            ..Default::default()
        }
    }

    /// Catalog updates only.
    pub fn catalog() -> Self {
        Self {
            include_catalog: true,
            ..Default::default()
        }
    }

    /// Snapshot lifecycle events only.
    pub fn snapshots() -> Self {
        Self {
            include_snapshots: true,
            ..Default::default()
        }
    }

    /// Writes to specific storage keys.
    pub fn storage_keys(keys: Vec<String>) -> Self {
        Self {
            include_storage: true,
            storage_keys: Some(keys),
            ..Default::default()
        }
    }

    /// Everything.
    pub fn all() -> Self {
        Self {
            include_orders: true,
            include_catalog: true,
            include_snapshots: true,
            include_storage: true,
            storage_keys: None,
        }
    }

    /// Check if an event passes this filter.
    pub fn matches(&self, event: &StoreEvent) -> bool {
        match event {
            StoreEvent::OrdersUpdated { .. } => self.include_orders,
            StoreEvent::CatalogUpdated { .. } => self.include_catalog,
            StoreEvent::SnapshotCreated { .. }
            | StoreEvent::SnapshotRestored { .. }
            | StoreEvent::DataReset => self.include_snapshots,
            StoreEvent::StorageChanged { key } => {
                self.include_storage
                    && self
                        .storage_keys
                        .as_ref()
                        .map_or(true, |keys| keys.iter().any(|k| k == key))
            }
            StoreEvent::Dropped { .. } => true,
        }
    }
}

/// Events emitted to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// The order list was rewritten.
    OrdersUpdated { order_count: usize },

    /// The sublimation type catalog was rewritten.
    CatalogUpdated { entry_count: usize },

    /// A storage key was written or removed.
    StorageChanged { key: String },

    /// A backup snapshot was captured.
    SnapshotCreated { backup_id: String },

    /// The order list was replaced from a snapshot.
    SnapshotRestored {
        backup_id: String,
        /// Snapshot of the state that was overwritten.
        safety_backup_id: Option<String>,
    },

    /// All data was reset to the initial state.
    DataReset,

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiver went away.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<StoreEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<StoreEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<StoreEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<StoreEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain every event currently buffered.
    pub fn drain(&self) -> Vec<StoreEvent> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_filter() {
        let filter = SubscriptionFilter::storage_keys(vec!["orders".into()]);
        assert!(filter.matches(&StoreEvent::StorageChanged { key: "orders".into() }));
        assert!(!filter.matches(&StoreEvent::StorageChanged {
            key: "sublimationTypes".into()
        }));
        assert!(!filter.matches(&StoreEvent::OrdersUpdated { order_count: 1 }));
    }

    #[test]
    fn test_event_wire_format() {
        let event = StoreEvent::SnapshotCreated {
            backup_id: "backup_20240101_120000".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "snapshot_created");
        assert_eq!(json["backup_id"], "backup_20240101_120000");
    }
}
