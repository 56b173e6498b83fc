//! Change notification for store readers.
//!
//! Views that show orders (tracking, history, reports) subscribe here and
//! reload whenever the store tells them something changed:
//! - Order list rewrites
//! - Catalog rewrites
//! - Raw storage key writes
//! - Snapshot creation, restore and data resets
//!
//! Events are delivered synchronously at dispatch time, either into a
//! bounded channel per subscription or to registered callbacks. There is
//! no payload contract beyond "this changed".
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new();
//!
//! let handle = manager.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::orders(),
//!     ..Default::default()
//! });
//!
//! loop {
//!     match handle.recv() {
//!         Ok(StoreEvent::OrdersUpdated { .. }) => reload(),
//!         Ok(StoreEvent::Dropped { .. }) | Err(_) => break,
//!         Ok(_) => {}
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::{Listener, ListenerId, SubscriptionManager};
pub use types::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
