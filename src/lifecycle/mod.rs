//! Order lifecycle: creation, status and billing transitions, archival.
//!
//! The engine is the only writer of an order's status, money fields and
//! line items. Every derived field is recomputed by the functions in
//! [`derive`] after each mutation, so stored orders always satisfy:
//!
//! - `total_amount == sum(line.total_price)`
//! - `balance == total_amount - deposit_amount`
//! - `billing_status` follows from deposit and balance
//!
//! An order is archived (hidden from active views) when it is Done and
//! Paid, Cancelled, or manually moved to history.

pub mod derive;
mod engine;
mod form;

pub use engine::OrderEngine;
pub use form::{validate_email, validate_line_items, FormStep, OrderForm};
