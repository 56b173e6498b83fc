//! Pure derivations over orders.

use crate::types::{BillingStatus, FulfillmentStatus, LineItem, Order};

/// Balances within this distance of zero count as settled. Deposits are
/// entered with at most two decimals, so float drift stays far below it.
pub const SETTLED_TOLERANCE: f64 = 1e-6;

/// Sum of line totals, without intermediate rounding.
pub fn total_amount(items: &[LineItem]) -> f64 {
    items.iter().map(|item| item.total_price).sum()
}

pub fn balance(total_amount: f64, deposit_amount: f64) -> f64 {
    total_amount - deposit_amount
}

/// `Paid` when nothing is owed, `Unpaid` when nothing was deposited,
/// `Partially Paid` otherwise.
pub fn billing_status(deposit_amount: f64, balance: f64) -> BillingStatus {
    if balance <= SETTLED_TOLERANCE {
        BillingStatus::Paid
    } else if deposit_amount <= 0.0 {
        BillingStatus::Unpaid
    } else {
        BillingStatus::PartiallyPaid
    }
}

/// Recompute line totals, order total, balance and billing status.
pub fn refresh(order: &mut Order) {
    for item in &mut order.order_details.sublimation_orders {
        item.total_price = item.price_per_unit * f64::from(item.quantity);
    }
    order.total_amount = total_amount(&order.order_details.sublimation_orders);
    order.balance = balance(order.total_amount, order.deposit_amount);
    order.billing_status = billing_status(order.deposit_amount, order.balance);
}

/// Done and fully paid.
pub fn is_fulfilled(order: &Order) -> bool {
    order.status == FulfillmentStatus::Done && order.billing_status == BillingStatus::Paid
}

/// Cancelled or manually archived: no further changes are accepted.
pub fn is_closed(order: &Order) -> bool {
    order.status == FulfillmentStatus::Cancelled || order.moved_to_history
}

/// Hidden from active views.
pub fn is_archived(order: &Order) -> bool {
    is_fulfilled(order) || is_closed(order)
}

pub fn is_active(order: &Order) -> bool {
    !is_archived(order)
}

/// Shown in the history view and counted as a completed sale.
pub fn is_completed(order: &Order) -> bool {
    is_fulfilled(order) || order.moved_to_history
}

pub fn clamp_discount(percentage: f64) -> f64 {
    if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_status_table() {
        assert_eq!(billing_status(0.0, 450.0), BillingStatus::Unpaid);
        assert_eq!(billing_status(100.0, 350.0), BillingStatus::PartiallyPaid);
        assert_eq!(billing_status(450.0, 0.0), BillingStatus::Paid);
        assert_eq!(billing_status(500.0, -50.0), BillingStatus::Paid);
        // Nothing owed and nothing deposited
        assert_eq!(billing_status(0.0, 0.0), BillingStatus::Paid);
    }

    #[test]
    fn test_float_drift_counts_as_settled() {
        let total = total_amount(&[LineItem::new("Sticker", 0.1, 3)]);
        let owed = balance(total, 0.3);
        assert!(owed > 0.0);
        assert_eq!(billing_status(0.3, owed), BillingStatus::Paid);
    }

    #[test]
    fn test_total_amount() {
        let items = vec![LineItem::new("Mug", 150.0, 3), LineItem::new("Cap", 250.0, 2)];
        assert_eq!(total_amount(&items), 950.0);
        assert_eq!(total_amount(&[]), 0.0);
    }

    #[test]
    fn test_clamp_discount() {
        assert_eq!(clamp_discount(-5.0), 0.0);
        assert_eq!(clamp_discount(150.0), 100.0);
        assert_eq!(clamp_discount(12.5), 12.5);
        assert_eq!(clamp_discount(f64::NAN), 0.0);
    }
}
