//! Subscription manager for broadcasting store events.

use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Callback invoked synchronously for every published event.
pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Identifier of a registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<StoreEvent>,
}

impl Subscription {
    /// Try to send an event. Returns the drop reason if the subscriber must go.
    fn try_send(&self, event: StoreEvent) -> Option<DropReason> {
        match self.sender.try_send(event) {
            Ok(()) => None,
            Err(crossbeam_channel::TrySendError::Full(_)) => Some(DropReason::BufferOverflow),
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                Some(DropReason::Disconnected)
            }
        }
    }
}

/// Manages subscriptions and broadcasts events.
///
/// Owned by the store and handed to every component that writes, so that
/// views never depend on ambient global state.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Registered callbacks, in registration order.
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    /// Counter for generating subscription and listener IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new channel subscription.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Send dropped event (best effort)
            let _ = sub.sender.try_send(StoreEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Register a callback for every event.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Get callback count.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    // --- Broadcasting ---

    /// The order list was rewritten.
    pub fn broadcast_orders_updated(&self, order_count: usize) {
        self.publish(StoreEvent::OrdersUpdated { order_count });
    }

    /// The catalog was rewritten.
    pub fn broadcast_catalog_updated(&self, entry_count: usize) {
        self.publish(StoreEvent::CatalogUpdated { entry_count });
    }

    /// A storage key was written or removed.
    pub fn broadcast_storage_changed(&self, key: &str) {
        self.publish(StoreEvent::StorageChanged {
            key: key.to_string(),
        });
    }

    /// A snapshot was captured.
    pub fn broadcast_snapshot_created(&self, backup_id: &str) {
        self.publish(StoreEvent::SnapshotCreated {
            backup_id: backup_id.to_string(),
        });
    }

    /// A snapshot was restored over the order list.
    pub fn broadcast_snapshot_restored(&self, backup_id: &str, safety_backup_id: Option<String>) {
        self.publish(StoreEvent::SnapshotRestored {
            backup_id: backup_id.to_string(),
            safety_backup_id,
        });
    }

    /// All data was reset.
    pub fn broadcast_data_reset(&self) {
        self.publish(StoreEvent::DataReset);
    }

    /// Deliver an event to matching subscriptions and all callbacks.
    /// Drops subscribers that fail to receive.
    pub fn publish(&self, event: StoreEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.config.filter.matches(&event) {
                    if let Some(reason) = sub.try_send(event.clone()) {
                        to_remove.push((*id, reason));
                    }
                }
            }
        }

        // Remove dropped subscriptions
        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for (id, reason) in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::warn!(subscription = id.0, ?reason, "dropping subscriber");
                    // Try to notify about the drop (might fail, that's ok)
                    let _ = sub.sender.try_send(StoreEvent::Dropped { reason });
                }
            }
        }

        // Callbacks may publish again, so call them without holding the lock
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
