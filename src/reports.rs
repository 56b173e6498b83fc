//! Sales analytics over the order collection.
//!
//! Reports read orders and never write. Completion follows the same rule as
//! the history view: Done and Paid, or manually moved to history.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::lifecycle::derive;
use crate::types::{BillingStatus, FulfillmentStatus, Order};

/// Headline figures.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_orders: usize,
    pub completed_orders: usize,
    pub pending_orders: usize,
    /// Total of completed orders.
    pub total_sales: f64,
    /// Total of Paid orders, completed or not.
    pub total_payments_received: f64,
    /// Outstanding balance of unpaid, non-cancelled orders.
    pub total_pending_payments: f64,
}

/// Figure plotted by [`series`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalOrders,
    CompletedOrders,
    PendingOrders,
    TotalSales,
    TotalPaymentsReceived,
    TotalPendingPayments,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::TotalOrders,
        Metric::CompletedOrders,
        Metric::PendingOrders,
        Metric::TotalSales,
        Metric::TotalPaymentsReceived,
        Metric::TotalPendingPayments,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Metric::TotalOrders => "Total Orders",
            Metric::CompletedOrders => "Completed Orders",
            Metric::PendingOrders => "Pending Orders",
            Metric::TotalSales => "Total Sales",
            Metric::TotalPaymentsReceived => "Total Payments Received",
            Metric::TotalPendingPayments => "Total Pending Payments",
        }
    }

    /// Value of this metric over `orders`.
    pub fn measure<'a>(&self, orders: impl IntoIterator<Item = &'a Order>) -> f64 {
        let mut analytics = Analytics::default();
        for order in orders {
            analytics.add(order);
        }
        analytics.value_of(*self)
    }
}

/// Bucket width of a series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportRange {
    /// One point per day of a month.
    Monthly,
    /// One point per month of a year.
    Annually,
}

/// One bucket of a series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// `Mar` for annual buckets, `Mar 05` for daily ones.
    pub label: String,
    /// First day of the bucket.
    pub start: NaiveDate,
    pub value: f64,
}

impl Analytics {
    fn add(&mut self, order: &Order) {
        let completed = derive::is_completed(order);
        let paid = order.billing_status == BillingStatus::Paid;

        self.total_orders += 1;
        if completed {
            self.completed_orders += 1;
            self.total_sales += order.total_amount;
        }
        if derive::is_active(order) {
            self.pending_orders += 1;
        }
        if paid {
            self.total_payments_received += order.total_amount;
        }
        if !paid && order.status != FulfillmentStatus::Cancelled {
            self.total_pending_payments += order.total_amount - order.deposit_amount;
        }
    }

    pub fn value_of(&self, metric: Metric) -> f64 {
        match metric {
            Metric::TotalOrders => self.total_orders as f64,
            Metric::CompletedOrders => self.completed_orders as f64,
            Metric::PendingOrders => self.pending_orders as f64,
            Metric::TotalSales => self.total_sales,
            Metric::TotalPaymentsReceived => self.total_payments_received,
            Metric::TotalPendingPayments => self.total_pending_payments,
        }
    }
}

pub fn analytics(orders: &[Order]) -> Analytics {
    let mut analytics = Analytics::default();
    for order in orders {
        analytics.add(order);
    }
    analytics
}

/// Plot `metric` over time, bucketing orders by their date of order.
///
/// `month` is 1-based and only used for [`ReportRange::Monthly`]. An out of
/// range month or year yields an empty series.
pub fn series(
    orders: &[Order],
    range: ReportRange,
    metric: Metric,
    year: i32,
    month: u32,
) -> Vec<SeriesPoint> {
    let (start, step, count, label_format) = match range {
        ReportRange::Monthly => {
            let Some(start) = NaiveDate::from_ymd_opt(year, month, 1) else {
                return Vec::new();
            };
            (start, Step::Day, days_in_month(start), "%b %d")
        }
        ReportRange::Annually => {
            let Some(start) = NaiveDate::from_ymd_opt(year, 1, 1) else {
                return Vec::new();
            };
            (start, Step::Month, 12, "%b")
        }
    };

    let mut points = Vec::with_capacity(count as usize);
    let mut bucket = start;
    for _ in 0..count {
        let Some(next) = step.advance(bucket) else {
            break;
        };
        let value = metric.measure(orders.iter().filter(|o| {
            let date = o.order_details.date_of_order;
            date >= bucket && date < next
        }));
        points.push(SeriesPoint {
            label: bucket.format(label_format).to_string(),
            start: bucket,
            value,
        });
        bucket = next;
    }
    points
}

#[derive(Clone, Copy)]
enum Step {
    Day,
    Month,
}

impl Step {
    fn advance(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Step::Day => date.succ_opt(),
            Step::Month => date.checked_add_months(Months::new(1)),
        }
    }
}

fn days_in_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerDetails, LineItem, OrderDetails, OrderType};

    fn order(serial: &str, date: NaiveDate, total: f64, deposit: f64) -> Order {
        let mut order = Order {
            job_order_number: format!("IRONWOLF-100000-{}", serial),
            serial_job_number: serial.to_string(),
            customer_name: "Ana".to_string(),
            status: FulfillmentStatus::Pending,
            order_type: OrderType::New,
            deadline: date,
            billing_status: BillingStatus::Unpaid,
            total_amount: 0.0,
            deposit_amount: deposit,
            balance: 0.0,
            discount_percentage: 0.0,
            cancel_reason: None,
            moved_to_history: false,
            customer_details: CustomerDetails {
                name: "Ana".to_string(),
                email: None,
                contact: "0917".to_string(),
            },
            order_details: OrderDetails {
                order_type: OrderType::New,
                layout_artist: "Jo".to_string(),
                date_of_order: date,
                sublimation_orders: vec![LineItem::new("Mug", total, 1)],
            },
        };
        derive::refresh(&mut order);
        order
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_orders() -> Vec<Order> {
        let mut done = order("JO-0001", date(2024, 3, 5), 450.0, 450.0);
        done.status = FulfillmentStatus::Done;

        let partial = order("JO-0002", date(2024, 3, 5), 300.0, 100.0);

        let mut cancelled = order("JO-0003", date(2024, 3, 20), 200.0, 50.0);
        cancelled.status = FulfillmentStatus::Cancelled;

        let paid_open = order("JO-0004", date(2024, 7, 1), 100.0, 100.0);

        vec![done, partial, cancelled, paid_open]
    }

    #[test]
    fn test_analytics() {
        let a = analytics(&sample_orders());
        assert_eq!(a.total_orders, 4);
        assert_eq!(a.completed_orders, 1);
        assert_eq!(a.pending_orders, 2);
        assert_eq!(a.total_sales, 450.0);
        assert_eq!(a.total_payments_received, 550.0);
        assert_eq!(a.total_pending_payments, 200.0);
    }

    #[test]
    fn test_empty_analytics() {
        assert_eq!(analytics(&[]), Analytics::default());
    }

    #[test]
    fn test_monthly_series() {
        let points = series(&sample_orders(), ReportRange::Monthly, Metric::TotalOrders, 2024, 3);
        assert_eq!(points.len(), 31);
        assert_eq!(points[4].label, "Mar 05");
        assert_eq!(points[4].value, 2.0);
        assert_eq!(points[19].value, 1.0);
        assert_eq!(points.iter().map(|p| p.value).sum::<f64>(), 3.0);
    }

    #[test]
    fn test_february_leap_year() {
        let points = series(&[], ReportRange::Monthly, Metric::TotalSales, 2024, 2);
        assert_eq!(points.len(), 29);
        assert!(points.iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn test_annual_series() {
        let points = series(&sample_orders(), ReportRange::Annually, Metric::TotalSales, 2024, 0);
        assert_eq!(points.len(), 12);
        assert_eq!(points[2].label, "Mar");
        assert_eq!(points[2].value, 450.0);
        assert_eq!(points[6].value, 0.0);

        let payments = series(
            &sample_orders(),
            ReportRange::Annually,
            Metric::TotalPaymentsReceived,
            2024,
            0,
        );
        assert_eq!(payments[6].value, 100.0);
    }

    #[test]
    fn test_invalid_month_is_empty() {
        assert!(series(&[], ReportRange::Monthly, Metric::TotalOrders, 2024, 13).is_empty());
    }
}
