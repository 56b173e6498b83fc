//! # Print-shop order store
//!
//! Order management core for a sublimation print shop: order entry,
//! status and payment tracking, order history, analytics, and backup
//! snapshots over a persisted order list.
//!
//! ## Core Concepts
//!
//! - **Orders**: customer jobs with line items, a fulfillment status and a
//!   billing status derived from deposit and total
//! - **Snapshots**: timestamped copies of the order list, taken on every new
//!   order and before any restore or reset
//! - **Catalog**: priced sublimation types used to fill line items
//! - **Events**: every write is announced to subscribers so views can reload
//!
//! ## Example
//!
//! ```ignore
//! use printshop::{FulfillmentStatus, OrderForm, OrderType, Store, StoreConfig};
//!
//! let store = Store::open_or_create(StoreConfig {
//!     path: "./shop-data".into(),
//!     ..Default::default()
//! })?;
//!
//! let order = store.create_order(
//!     &OrderForm::new("Jo")
//!         .deadline(deadline)
//!         .order_type(OrderType::New)
//!         .customer("Ana Cruz", "09171234567")
//!         .line_item("Mug", 150.0, 3),
//! )?;
//!
//! store.apply_deposit(&order.serial_job_number, 450.0)?;
//! store.set_status(&order.serial_job_number, FulfillmentStatus::Done)?;
//! ```

pub mod catalog;
pub mod demo;
pub mod error;
pub mod lifecycle;
pub mod records;
pub mod reports;
pub mod snapshots;
pub mod storage;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use catalog::Catalog;
pub use demo::DemoMode;
pub use error::{Result, StoreError};
pub use lifecycle::{FormStep, OrderEngine, OrderForm};
pub use records::RecordStore;
pub use reports::{Analytics, Metric, ReportRange, SeriesPoint};
pub use snapshots::{RestoreOutcome, SnapshotManager};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{Store, StoreConfig, StoreStats};
pub use subscriptions::{
    DropReason, ListenerId, StoreEvent, SubscriptionConfig, SubscriptionFilter,
    SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
pub use types::*;
