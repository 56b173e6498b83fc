//! Core types for the order store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Order classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrderType {
    /// A regular order.
    New,
    /// A late ("pahabol") order added to an existing job.
    Pahabol,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::New => "NEW",
            OrderType::Pahabol => "PAHABOL",
        }
    }
}

impl FromStr for OrderType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Ok(OrderType::New),
            "PAHABOL" | "LATE" => Ok(OrderType::Pahabol),
            other => Err(StoreError::invalid(format!("Unknown order type: {}", other))),
        }
    }
}

/// Production stage of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FulfillmentStatus {
    Pending,
    OnProcess,
    Done,
    Cancelled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "Pending",
            FulfillmentStatus::OnProcess => "On Process",
            FulfillmentStatus::Done => "Done",
            FulfillmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl FromStr for FulfillmentStatus {
    type Err = StoreError;

    /// Case-insensitive; also accepts the older "In Progress" label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(FulfillmentStatus::Pending),
            "on process" | "in progress" => Ok(FulfillmentStatus::OnProcess),
            "done" | "completed" => Ok(FulfillmentStatus::Done),
            "cancelled" | "canceled" => Ok(FulfillmentStatus::Cancelled),
            other => Err(StoreError::invalid(format!("Unknown order status: {}", other))),
        }
    }
}

/// Payment completeness of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BillingStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::Unpaid => "Unpaid",
            BillingStatus::PartiallyPaid => "Partially Paid",
            BillingStatus::Paid => "Paid",
        }
    }
}

impl FromStr for BillingStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(BillingStatus::Unpaid),
            "partially paid" => Ok(BillingStatus::PartiallyPaid),
            "paid" => Ok(BillingStatus::Paid),
            other => Err(StoreError::invalid(format!("Unknown billing status: {}", other))),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl TryFrom<String> for $ty {
                type Error = StoreError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.as_str().to_string()
                }
            }
        )*
    };
}

string_conversions!(OrderType, FulfillmentStatus, BillingStatus);

/// Customer contact captured at order creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub contact: String,
}

/// One priced entry of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Catalog type name (e.g. "Mug"). Not a foreign key.
    #[serde(rename = "type")]
    pub item_type: String,
    pub price_per_unit: f64,
    pub quantity: u32,
    /// Always `price_per_unit * quantity`.
    pub total_price: f64,
}

impl LineItem {
    pub fn new(item_type: impl Into<String>, price_per_unit: f64, quantity: u32) -> Self {
        Self {
            item_type: item_type.into(),
            price_per_unit,
            quantity,
            total_price: price_per_unit * f64::from(quantity),
        }
    }

    /// Recompute `total_price` from unit price and quantity.
    pub fn recomputed(mut self) -> Self {
        self.total_price = self.price_per_unit * f64::from(self.quantity);
        self
    }
}

/// Production details of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub layout_artist: String,
    pub date_of_order: NaiveDate,
    pub sublimation_orders: Vec<LineItem>,
}

/// A customer order.
///
/// Money fields are derived: `total_amount` from the line items, `balance`
/// from total and deposit, and `billing_status` from the balance. Only the
/// lifecycle engine writes them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Display identifier (`IRONWOLF-<6 digits>-<artist>`).
    pub job_order_number: String,

    /// Unique, immutable join key (`JO-0001`).
    pub serial_job_number: String,

    pub customer_name: String,
    pub status: FulfillmentStatus,
    pub order_type: OrderType,
    pub deadline: NaiveDate,
    pub billing_status: BillingStatus,
    pub total_amount: f64,
    pub deposit_amount: f64,
    pub balance: f64,

    #[serde(default)]
    pub discount_percentage: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,

    #[serde(default)]
    pub moved_to_history: bool,

    pub customer_details: CustomerDetails,
    pub order_details: OrderDetails,
}

impl Order {
    pub fn line_items(&self) -> &[LineItem] {
        &self.order_details.sublimation_orders
    }

    /// Discount applied to the total, for display and printing.
    pub fn discount_amount(&self) -> f64 {
        self.total_amount * self.discount_percentage / 100.0
    }

    /// Total after discount, for display and printing.
    pub fn total_after_discount(&self) -> f64 {
        self.total_amount - self.discount_amount()
    }
}

/// Priced catalog entry used to fill line items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SublimationType {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub price: f64,
}

impl SublimationType {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            price,
        }
    }
}

/// Catalog written on first use and by a full data reset.
pub fn default_catalog() -> Vec<SublimationType> {
    vec![
        SublimationType::new("1", "T-Shirt", 350.0),
        SublimationType::new("2", "Jersey", 450.0),
        SublimationType::new("3", "Mug", 200.0),
        SublimationType::new("4", "Phone Case", 250.0),
        SublimationType::new("5", "Mouse Pad", 180.0),
    ]
}

/// Point-in-time copy of the order collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub orders: Vec<Order>,
    pub timestamp: DateTime<Utc>,
    pub backup_id: String,
}

/// Round a money value to two decimals for display.
pub fn display_amount(value: f64) -> String {
    format!("{:.2}", value)
}
