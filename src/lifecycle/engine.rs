//! Order lifecycle engine.

use chrono::Local;
use std::sync::Arc;

use super::derive;
use super::form::{validate_line_items, OrderForm};
use crate::error::{Result, StoreError};
use crate::records::{next_order_number, OrderNumbers, RecordStore};
use crate::snapshots::SnapshotManager;
use crate::types::{
    BillingStatus, CustomerDetails, FulfillmentStatus, LineItem, Order, OrderDetails,
};

/// Applies lifecycle operations to stored orders.
///
/// Every operation re-reads the full order list, changes one order, and
/// writes the list back. Nothing is cached between operations.
pub struct OrderEngine {
    records: Arc<RecordStore>,
    snapshots: Arc<SnapshotManager>,
}

impl OrderEngine {
    pub fn new(records: Arc<RecordStore>, snapshots: Arc<SnapshotManager>) -> Self {
        Self { records, snapshots }
    }

    // --- Creation ---

    /// Validate the form and append a new `Pending` order.
    ///
    /// A snapshot is captured after the order is saved and the order
    /// counter advances. Numbering never reuses a `JO-` number that is
    /// already present in the store, even if the counter was reset.
    pub fn create_order(&self, form: &OrderForm) -> Result<Order> {
        form.validate()?;

        let _lock = self.records.lock();
        let mut orders = self.records.try_load_orders()?;

        let number = next_order_number(self.records.last_order_number(), &orders);
        let numbers = OrderNumbers::for_number(number, &form.layout_artist, &mut rand::rng());

        if orders
            .iter()
            .any(|o| o.serial_job_number == numbers.order_number)
        {
            return Err(StoreError::DuplicateOrder(numbers.order_number));
        }

        let order = build_order(form, numbers);
        orders.push(order.clone());
        self.records.save_orders(&orders)?;

        tracing::info!(
            serial = %order.serial_job_number,
            job_order = %order.job_order_number,
            total = order.total_amount,
            "order created"
        );

        if self.snapshots.create_snapshot().is_none() {
            tracing::warn!(serial = %order.serial_job_number, "order saved without a snapshot");
        }
        if let Err(e) = self.records.save_order_number(number) {
            tracing::error!(error = %e, number, "failed to advance order counter");
        }

        Ok(order)
    }

    // --- Transitions ---

    /// Change the fulfillment status.
    ///
    /// `Done` requires the order to be fully paid. Cancelling needs a
    /// reason and goes through [`cancel_order`](Self::cancel_order).
    pub fn set_status(&self, serial_job_number: &str, status: FulfillmentStatus) -> Result<Order> {
        if status == FulfillmentStatus::Cancelled {
            return Err(StoreError::invalid(
                "Please provide a reason for cancellation",
            ));
        }

        self.mutate(serial_job_number, |order| {
            if status == FulfillmentStatus::Done && order.billing_status != BillingStatus::Paid {
                return Err(StoreError::PaymentRequired(order.serial_job_number.clone()));
            }
            order.status = status;
            Ok(())
        })
    }

    /// Cancel an order. Always allowed for open orders; the order stays in
    /// the store but leaves every active view.
    pub fn cancel_order(&self, serial_job_number: &str, reason: &str) -> Result<Order> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(StoreError::invalid(
                "Please provide a reason for cancellation",
            ));
        }

        self.mutate(serial_job_number, |order| {
            order.status = FulfillmentStatus::Cancelled;
            order.cancel_reason = Some(reason.to_string());
            Ok(())
        })
    }

    /// Add a payment to the order's deposit.
    pub fn apply_deposit(&self, serial_job_number: &str, amount: f64) -> Result<Order> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(StoreError::invalid("Please enter a valid deposit amount"));
        }

        self.mutate(serial_job_number, |order| {
            if order.billing_status == BillingStatus::Paid {
                return Err(StoreError::AlreadyPaid(order.serial_job_number.clone()));
            }
            order.deposit_amount += amount;
            Ok(())
        })
    }

    /// Replace the line items. The deposit is kept; total, balance and
    /// billing status follow the new items.
    ///
    /// A Done order must stay fully paid, so an edit that would leave a
    /// balance on it fails with [`StoreError::PaymentRequired`].
    pub fn edit_line_items(&self, serial_job_number: &str, items: Vec<LineItem>) -> Result<Order> {
        validate_line_items(&items)?;

        self.mutate(serial_job_number, move |order| {
            order.order_details.sublimation_orders =
                items.into_iter().map(LineItem::recomputed).collect();
            derive::refresh(order);
            if order.status == FulfillmentStatus::Done && order.balance > derive::SETTLED_TOLERANCE
            {
                return Err(StoreError::PaymentRequired(
                    order.serial_job_number.clone(),
                ));
            }
            Ok(())
        })
    }

    /// Permanently archive a Done and Paid order.
    pub fn move_to_history(&self, serial_job_number: &str) -> Result<Order> {
        self.mutate(serial_job_number, |order| {
            if !derive::is_fulfilled(order) {
                return Err(StoreError::NotReadyForHistory(
                    order.serial_job_number.clone(),
                ));
            }
            order.moved_to_history = true;
            Ok(())
        })
    }

    // --- Queries ---

    pub fn get_order(&self, serial_job_number: &str) -> Option<Order> {
        self.records.find_order(serial_job_number)
    }

    /// Every stored order, archived or not.
    pub fn all_orders(&self) -> Vec<Order> {
        self.records.load_orders()
    }

    /// Orders shown in tracking views.
    pub fn active_orders(&self) -> Vec<Order> {
        self.filtered(derive::is_active)
    }

    /// Done and Paid orders plus manually archived ones.
    pub fn history_orders(&self) -> Vec<Order> {
        self.filtered(derive::is_completed)
    }

    pub fn cancelled_orders(&self) -> Vec<Order> {
        self.filtered(|o| o.status == FulfillmentStatus::Cancelled)
    }

    // --- Private Helpers ---

    fn filtered(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        self.records
            .load_orders()
            .into_iter()
            .filter(|o| keep(o))
            .collect()
    }

    /// Load, change one order, re-derive, save. The change closure sees
    /// freshly derived fields; if it fails nothing is written.
    fn mutate<F>(&self, serial_job_number: &str, change: F) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> Result<()>,
    {
        let _lock = self.records.lock();
        let mut orders = self.records.try_load_orders()?;

        let index = orders
            .iter()
            .position(|o| o.serial_job_number == serial_job_number)
            .ok_or_else(|| StoreError::OrderNotFound(serial_job_number.to_string()))?;

        let mut order = orders[index].clone();
        if derive::is_closed(&order) {
            return Err(StoreError::OrderClosed(serial_job_number.to_string()));
        }

        derive::refresh(&mut order);
        change(&mut order)?;
        derive::refresh(&mut order);

        orders[index] = order.clone();
        self.records.save_orders(&orders)?;

        tracing::debug!(
            serial = %order.serial_job_number,
            status = %order.status,
            billing = %order.billing_status,
            archived = derive::is_archived(&order),
            "order updated"
        );
        Ok(order)
    }
}

fn build_order(form: &OrderForm, numbers: OrderNumbers) -> Order {
    let email = form.customer_email.trim();
    let customer = CustomerDetails {
        name: form.customer_name.trim().to_string(),
        email: (!email.is_empty()).then(|| email.to_string()),
        contact: form.customer_contact.trim().to_string(),
    };
    let order_type = form.order_type.unwrap_or(crate::types::OrderType::New);
    let today = Local::now().date_naive();

    let mut order = Order {
        job_order_number: numbers.job_serial,
        serial_job_number: numbers.order_number,
        customer_name: customer.name.clone(),
        status: FulfillmentStatus::Pending,
        order_type,
        deadline: form.deadline.unwrap_or(today),
        billing_status: BillingStatus::Unpaid,
        total_amount: 0.0,
        deposit_amount: form.deposit,
        balance: 0.0,
        discount_percentage: derive::clamp_discount(form.discount_percentage),
        cancel_reason: None,
        moved_to_history: false,
        customer_details: customer,
        order_details: OrderDetails {
            order_type,
            layout_artist: form.layout_artist.clone(),
            date_of_order: form.date_of_order.unwrap_or(today),
            sublimation_orders: form.line_items.clone(),
        },
    };
    derive::refresh(&mut order);
    order
}
