//! Record store over a key/value substrate.

use crate::error::{Result, StoreError};
use crate::storage::Storage;
use crate::subscriptions::SubscriptionManager;
use crate::types::{default_catalog, Order, SublimationType};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Key of the order list.
pub const ORDERS_KEY: &str = "orders";

/// Key of the sublimation type catalog.
pub const CATALOG_KEY: &str = "sublimationTypes";

/// Key of the last issued order number.
pub const ORDER_NUMBER_KEY: &str = "orderNumber";

/// Persisted order list, catalog and order counter.
///
/// Writes publish change events through the shared [`SubscriptionManager`]
/// after the storage call succeeds.
pub struct RecordStore {
    storage: Arc<dyn Storage>,
    events: Arc<SubscriptionManager>,

    /// Serialises read-modify-write cycles within the process.
    write_lock: ReentrantMutex<()>,
}

impl RecordStore {
    pub fn new(storage: Arc<dyn Storage>, events: Arc<SubscriptionManager>) -> Self {
        Self {
            storage,
            events,
            write_lock: ReentrantMutex::new(()),
        }
    }

    /// Hold this across a load-modify-save cycle.
    ///
    /// Reentrant, so an operation that snapshots while holding it (order
    /// creation, restore) does not deadlock.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.write_lock.lock()
    }

    /// Underlying storage.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Shared event publisher.
    pub fn events(&self) -> &Arc<SubscriptionManager> {
        &self.events
    }

    // --- Orders ---

    /// Load every order. Missing or unreadable data yields an empty list.
    pub fn load_orders(&self) -> Vec<Order> {
        match self.try_load_orders() {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(error = %e, "failed to load orders, treating as empty");
                Vec::new()
            }
        }
    }

    /// Load every order, surfacing storage and parse failures.
    ///
    /// Mutations use this so that an unreadable list is never silently
    /// replaced by a fresh one.
    pub fn try_load_orders(&self) -> Result<Vec<Order>> {
        Ok(self.read_json(ORDERS_KEY)?.unwrap_or_default())
    }

    /// Overwrite the whole order list.
    pub fn save_orders(&self, orders: &[Order]) -> Result<()> {
        let encoded = serde_json::to_string(orders)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.storage.set(ORDERS_KEY, &encoded)?;

        tracing::debug!(count = orders.len(), "saved orders");
        self.events.broadcast_storage_changed(ORDERS_KEY);
        self.events.broadcast_orders_updated(orders.len());
        Ok(())
    }

    /// Find an order by its serial job number.
    pub fn find_order(&self, serial_job_number: &str) -> Option<Order> {
        self.load_orders()
            .into_iter()
            .find(|o| o.serial_job_number == serial_job_number)
    }

    // --- Catalog ---

    /// Load the catalog. An absent catalog yields the default one.
    pub fn load_catalog(&self) -> Vec<SublimationType> {
        match self.try_load_catalog() {
            Ok(types) => types,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable catalog, using defaults");
                default_catalog()
            }
        }
    }

    /// Load the catalog for a mutation. A missing catalog is the default
    /// one; an unreadable one is an error.
    pub fn try_load_catalog(&self) -> Result<Vec<SublimationType>> {
        Ok(self.read_json(CATALOG_KEY)?.unwrap_or_else(default_catalog))
    }

    /// Overwrite the whole catalog.
    pub fn save_catalog(&self, types: &[SublimationType]) -> Result<()> {
        let encoded = serde_json::to_string(types)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.storage.set(CATALOG_KEY, &encoded)?;

        tracing::debug!(count = types.len(), "saved catalog");
        self.events.broadcast_storage_changed(CATALOG_KEY);
        self.events.broadcast_catalog_updated(types.len());
        Ok(())
    }

    // --- Order counter ---

    /// Last issued order number, 0 if none.
    pub fn last_order_number(&self) -> u32 {
        match self.storage.get(ORDER_NUMBER_KEY) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unparsable order counter, restarting at 0");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                tracing::error!(error = %e, "failed to read order counter");
                0
            }
        }
    }

    /// Record `number` as the last issued order number.
    pub fn save_order_number(&self, number: u32) -> Result<()> {
        self.set_raw(ORDER_NUMBER_KEY, &number.to_string())
    }

    /// Restart numbering at 1.
    pub fn reset_order_numbers(&self) -> Result<()> {
        self.save_order_number(0)
    }

    // --- Raw access ---

    /// Read a raw value.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.storage.get(key)
    }

    /// Write a raw value and announce the key change.
    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set(key, value)?;
        self.events.broadcast_storage_changed(key);
        Ok(())
    }

    /// Remove a raw value and announce the key change.
    pub fn remove_raw(&self, key: &str) -> Result<bool> {
        let removed = self.storage.remove(key)?;
        if removed {
            self.events.broadcast_storage_changed(key);
        }
        Ok(removed)
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.storage.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Deserialization(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }
}
