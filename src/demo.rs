//! Demo mode: swap in generated sample data and restore the real data on
//! exit.

use chrono::{Days, Local, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::lifecycle::derive;
use crate::records::{format_order_number, RecordStore, CATALOG_KEY, ORDERS_KEY, ORDER_NUMBER_KEY};
use crate::types::{
    default_catalog, BillingStatus, CustomerDetails, FulfillmentStatus, LineItem, Order,
    OrderDetails, OrderType,
};

/// Flag key, `"true"` while demo data is loaded.
pub const DEMO_FLAG_KEY: &str = "isDemoMode";

/// Raw values replaced by demo data.
pub const ORIGINAL_DATA_KEY: &str = "originalData";

/// Number of generated orders.
pub const DEMO_ORDER_COUNT: u32 = 20;

const DEMO_ARTISTS: [&str; 2] = ["Demo Manager", "Demo Staff"];

/// Raw values saved on entry. `None` means the key was absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OriginalData {
    orders: Option<String>,
    sublimation_types: Option<String>,
    order_number: Option<String>,
}

pub struct DemoMode {
    records: Arc<RecordStore>,
}

impl DemoMode {
    pub fn new(records: Arc<RecordStore>) -> Self {
        Self { records }
    }

    pub fn is_demo_mode(&self) -> bool {
        matches!(self.records.get_raw(DEMO_FLAG_KEY), Ok(Some(v)) if v == "true")
    }

    /// Save the current data and load sample orders with the default
    /// catalog. Fails if demo mode is already active so the saved original
    /// is never overwritten with demo data.
    pub fn enter_demo_mode(&self) -> Result<()> {
        let _lock = self.records.lock();
        if self.is_demo_mode() {
            return Err(StoreError::DemoModeActive);
        }

        let original = OriginalData {
            orders: self.records.get_raw(ORDERS_KEY)?,
            sublimation_types: self.records.get_raw(CATALOG_KEY)?,
            order_number: self.records.get_raw(ORDER_NUMBER_KEY)?,
        };
        let encoded = serde_json::to_string(&original)?;
        self.records.set_raw(ORIGINAL_DATA_KEY, &encoded)?;

        let orders = generate_sample_orders(&mut rand::rng(), Local::now().date_naive());
        self.records.save_orders(&orders)?;
        self.records.save_catalog(&default_catalog())?;
        self.records.reset_order_numbers()?;
        self.records.set_raw(DEMO_FLAG_KEY, "true")?;

        tracing::info!(orders = orders.len(), "entered demo mode");
        Ok(())
    }

    /// Put back every saved key, removing those that were absent on entry.
    pub fn exit_demo_mode(&self) -> Result<()> {
        let _lock = self.records.lock();
        if !self.is_demo_mode() {
            return Err(StoreError::DemoModeInactive);
        }

        let original: OriginalData = match self.records.get_raw(ORIGINAL_DATA_KEY)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => {
                tracing::warn!("demo mode active without saved data, clearing demo keys");
                OriginalData::default()
            }
        };

        self.restore_raw(ORDERS_KEY, original.orders.as_deref())?;
        self.restore_raw(CATALOG_KEY, original.sublimation_types.as_deref())?;
        self.restore_raw(ORDER_NUMBER_KEY, original.order_number.as_deref())?;
        self.records.remove_raw(ORIGINAL_DATA_KEY)?;
        self.records.remove_raw(DEMO_FLAG_KEY)?;

        let events = self.records.events();
        events.broadcast_orders_updated(self.records.load_orders().len());
        events.broadcast_catalog_updated(self.records.load_catalog().len());

        tracing::info!("exited demo mode");
        Ok(())
    }

    fn restore_raw(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.records.set_raw(key, value),
            None => self.records.remove_raw(key).map(|_| ()),
        }
    }
}

/// Generate sample orders dated within the 30 days before `today`.
///
/// Every order satisfies the same invariants as entered orders: money
/// fields are derived and a Done order is always fully paid.
pub fn generate_sample_orders<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> Vec<Order> {
    let catalog = default_catalog();

    (1..=DEMO_ORDER_COUNT)
        .map(|n| {
            let date_of_order = today
                .checked_sub_days(Days::new(rng.random_range(0..30)))
                .unwrap_or(today);
            let deadline = date_of_order
                .checked_add_days(Days::new(rng.random_range(1..=14)))
                .unwrap_or(date_of_order);
            let order_type = if rng.random_bool(0.2) {
                OrderType::Pahabol
            } else {
                OrderType::New
            };
            let layout_artist = DEMO_ARTISTS[rng.random_range(0..DEMO_ARTISTS.len())];

            let items: Vec<LineItem> = (0..rng.random_range(1..=3usize))
                .map(|_| {
                    let entry = &catalog[rng.random_range(0..catalog.len())];
                    LineItem::new(entry.type_name.clone(), entry.price, rng.random_range(1..=50))
                })
                .collect();
            let total = derive::total_amount(&items);

            let status = match rng.random_range(0..3u8) {
                0 => FulfillmentStatus::Pending,
                1 => FulfillmentStatus::OnProcess,
                _ => FulfillmentStatus::Done,
            };
            let deposit = if status == FulfillmentStatus::Done {
                total
            } else {
                (total * rng.random_range(0.0..0.7)).floor()
            };

            let name = format!("Demo Customer {}", n);
            let mut order = Order {
                job_order_number: format!(
                    "IRONWOLF-{}-{}",
                    rng.random_range(100_000..=999_999u32),
                    layout_artist
                ),
                serial_job_number: format_order_number(n),
                customer_name: name.clone(),
                status,
                order_type,
                deadline,
                billing_status: BillingStatus::Unpaid,
                total_amount: 0.0,
                deposit_amount: deposit,
                balance: 0.0,
                discount_percentage: 0.0,
                cancel_reason: None,
                moved_to_history: false,
                customer_details: CustomerDetails {
                    name,
                    email: Some(format!("customer{}@demo.com", n)),
                    contact: format!("09{:09}", rng.random_range(0..1_000_000_000u32)),
                },
                order_details: OrderDetails {
                    order_type,
                    layout_artist: layout_artist.to_string(),
                    date_of_order,
                    sublimation_orders: items,
                },
            };
            derive::refresh(&mut order);
            order
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::subscriptions::SubscriptionManager;
    use crate::types::SublimationType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_demo() -> (DemoMode, Arc<RecordStore>) {
        let records = Arc::new(RecordStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(SubscriptionManager::new()),
        ));
        (DemoMode::new(Arc::clone(&records)), records)
    }

    #[test]
    fn test_sample_orders_are_consistent() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let orders = generate_sample_orders(&mut StdRng::seed_from_u64(42), today);

        assert_eq!(orders.len(), 20);
        assert_eq!(orders[0].serial_job_number, "JO-0001");
        assert_eq!(orders[19].serial_job_number, "JO-0020");
        for order in &orders {
            let mut derived = order.clone();
            derive::refresh(&mut derived);
            assert_eq!(&derived, order);
            assert!(order.order_details.date_of_order <= today);
            assert!(order.deadline > order.order_details.date_of_order);
            if order.status == FulfillmentStatus::Done {
                assert_eq!(order.billing_status, BillingStatus::Paid);
            }
        }
    }

    #[test]
    fn test_enter_and_exit_restore_original() {
        let (demo, records) = test_demo();
        records
            .save_catalog(&[SublimationType::new("1", "Cap", 99.0)])
            .unwrap();
        records.save_order_number(7).unwrap();
        assert!(!demo.is_demo_mode());

        demo.enter_demo_mode().unwrap();
        assert!(demo.is_demo_mode());
        assert_eq!(records.load_orders().len(), 20);
        assert_eq!(records.load_catalog(), default_catalog());
        assert_eq!(records.last_order_number(), 0);

        demo.exit_demo_mode().unwrap();
        assert!(!demo.is_demo_mode());
        // Orders were absent before and are removed again
        assert_eq!(records.get_raw(ORDERS_KEY).unwrap(), None);
        assert_eq!(records.load_catalog()[0].type_name, "Cap");
        assert_eq!(records.last_order_number(), 7);
        assert_eq!(records.get_raw(ORIGINAL_DATA_KEY).unwrap(), None);
    }

    #[test]
    fn test_enter_twice_keeps_first_original() {
        let (demo, records) = test_demo();
        records.save_order_number(3).unwrap();

        demo.enter_demo_mode().unwrap();
        assert!(matches!(demo.enter_demo_mode(), Err(StoreError::DemoModeActive)));

        demo.exit_demo_mode().unwrap();
        assert_eq!(records.last_order_number(), 3);
    }

    #[test]
    fn test_exit_when_inactive() {
        let (demo, _) = test_demo();
        assert!(matches!(demo.exit_demo_mode(), Err(StoreError::DemoModeInactive)));
    }
}
