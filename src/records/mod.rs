//! Whole-collection persistence of orders and the catalog.
//!
//! The record store has no partial-update API: every mutation loads the
//! full order list, changes it in memory and writes it back in one call.

mod numbering;
mod store;

pub use numbering::{
    format_order_number, generate_job_serial, next_order_number, parse_order_number,
    OrderNumbers,
};
pub use store::{RecordStore, CATALOG_KEY, ORDERS_KEY, ORDER_NUMBER_KEY};
