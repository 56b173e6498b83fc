//! Sublimation type catalog.

use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::records::RecordStore;
use crate::types::{LineItem, SublimationType};

/// Editable list of priced sublimation types.
///
/// Line items copy the type name and price at entry time; catalog edits
/// never touch existing orders.
pub struct Catalog {
    records: Arc<RecordStore>,
}

impl Catalog {
    pub fn new(records: Arc<RecordStore>) -> Self {
        Self { records }
    }

    pub fn list(&self) -> Vec<SublimationType> {
        self.records.load_catalog()
    }

    /// Find an entry by type name, ignoring case and surrounding spaces.
    pub fn find(&self, type_name: &str) -> Option<SublimationType> {
        let wanted = type_name.trim();
        self.list()
            .into_iter()
            .find(|t| t.type_name.eq_ignore_ascii_case(wanted))
    }

    pub fn price_of(&self, type_name: &str) -> Option<f64> {
        self.find(type_name).map(|t| t.price)
    }

    /// Line item priced from the catalog.
    pub fn line_item(&self, type_name: &str, quantity: u32) -> Result<LineItem> {
        let entry = self
            .find(type_name)
            .ok_or_else(|| StoreError::CatalogEntryNotFound(type_name.to_string()))?;
        Ok(LineItem::new(entry.type_name, entry.price, quantity))
    }

    /// Append a new entry and return it.
    pub fn add(&self, type_name: &str, price: f64) -> Result<SublimationType> {
        let type_name = validate_entry(type_name, price)?;

        let _lock = self.records.lock();
        let mut types = self.records.try_load_catalog()?;
        let id = next_id(&types);
        let entry = SublimationType::new(id, type_name, price);
        types.push(entry.clone());
        self.records.save_catalog(&types)?;

        tracing::info!(id = %entry.id, type_name = %entry.type_name, price, "catalog entry added");
        Ok(entry)
    }

    pub fn update(&self, id: &str, type_name: &str, price: f64) -> Result<SublimationType> {
        let type_name = validate_entry(type_name, price)?;

        let _lock = self.records.lock();
        let mut types = self.records.try_load_catalog()?;
        let entry = types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::CatalogEntryNotFound(id.to_string()))?;
        entry.type_name = type_name;
        entry.price = price;
        let updated = entry.clone();
        self.records.save_catalog(&types)?;

        tracing::info!(id, "catalog entry updated");
        Ok(updated)
    }

    pub fn remove(&self, id: &str) -> Result<SublimationType> {
        let _lock = self.records.lock();
        let mut types = self.records.try_load_catalog()?;
        let index = types
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::CatalogEntryNotFound(id.to_string()))?;
        let removed = types.remove(index);
        self.records.save_catalog(&types)?;

        tracing::info!(id, "catalog entry removed");
        Ok(removed)
    }
}

fn validate_entry(type_name: &str, price: f64) -> Result<String> {
    let mut errors = Vec::new();
    let type_name = type_name.trim();
    if type_name.is_empty() {
        errors.push("Type name is required".to_string());
    }
    if !price.is_finite() || price <= 0.0 {
        errors.push("Price must be greater than 0".to_string());
    }
    if errors.is_empty() {
        Ok(type_name.to_string())
    } else {
        Err(StoreError::Validation(errors))
    }
}

/// One past the highest numeric id. Non-numeric ids are ignored.
fn next_id(types: &[SublimationType]) -> String {
    let highest = types
        .iter()
        .filter_map(|t| t.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (highest + 1).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CATALOG_KEY;
    use crate::storage::MemoryStorage;
    use crate::subscriptions::{StoreEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionManager};

    fn test_catalog() -> (Catalog, Arc<SubscriptionManager>) {
        let events = Arc::new(SubscriptionManager::new());
        let records = Arc::new(RecordStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::clone(&events),
        ));
        (Catalog::new(records), events)
    }

    #[test]
    fn test_defaults_until_edited() {
        let (catalog, _) = test_catalog();
        assert_eq!(catalog.list().len(), 5);
        assert_eq!(catalog.price_of("mug"), Some(200.0));
        assert_eq!(catalog.price_of("Cap"), None);
    }

    #[test]
    fn test_add_assigns_next_id() {
        let (catalog, _) = test_catalog();
        let cap = catalog.add("  Cap ", 250.0).unwrap();
        assert_eq!(cap.id, "6");
        assert_eq!(cap.type_name, "Cap");

        catalog.remove("3").unwrap();
        let pin = catalog.add("Pin", 20.0).unwrap();
        assert_eq!(pin.id, "7");
        assert_eq!(catalog.list().len(), 6);
    }

    #[test]
    fn test_validation() {
        let (catalog, _) = test_catalog();
        assert!(matches!(catalog.add("", 10.0), Err(StoreError::Validation(_))));
        assert!(matches!(catalog.add("Cap", 0.0), Err(StoreError::Validation(_))));
        assert!(matches!(
            catalog.update("1", "T-Shirt", -1.0),
            Err(StoreError::Validation(_))
        ));
        assert_eq!(catalog.list().len(), 5);
    }

    #[test]
    fn test_update_and_remove() {
        let (catalog, _) = test_catalog();
        let updated = catalog.update("1", "Tee", 300.0).unwrap();
        assert_eq!(updated.type_name, "Tee");
        assert_eq!(catalog.price_of("Tee"), Some(300.0));

        assert!(matches!(
            catalog.update("99", "X", 1.0),
            Err(StoreError::CatalogEntryNotFound(_))
        ));
        assert!(matches!(
            catalog.remove("99"),
            Err(StoreError::CatalogEntryNotFound(_))
        ));
    }

    #[test]
    fn test_edits_refuse_unreadable_catalog() {
        let (catalog, _) = test_catalog();
        let corrupt = "[{\"id\":\"1\",";
        catalog.records.set_raw(CATALOG_KEY, corrupt).unwrap();

        assert!(matches!(
            catalog.add("Cap", 250.0),
            Err(StoreError::Deserialization(_))
        ));
        assert!(matches!(
            catalog.update("1", "Tee", 300.0),
            Err(StoreError::Deserialization(_))
        ));
        assert!(matches!(
            catalog.remove("1"),
            Err(StoreError::Deserialization(_))
        ));
        assert_eq!(
            catalog.records.get_raw(CATALOG_KEY).unwrap().as_deref(),
            Some(corrupt)
        );
        // Reads still fall back to the defaults
        assert_eq!(catalog.list().len(), 5);
    }

    #[test]
    fn test_line_item_uses_catalog_price() {
        let (catalog, _) = test_catalog();
        let item = catalog.line_item("Jersey", 2).unwrap();
        assert_eq!(item.price_per_unit, 450.0);
        assert_eq!(item.total_price, 900.0);
        assert!(catalog.line_item("Cap", 1).is_err());
    }

    #[test]
    fn test_edits_publish_catalog_updated() {
        let (catalog, events) = test_catalog();
        let handle = events.subscribe(SubscriptionConfig {
            filter: SubscriptionFilter::catalog(),
            ..Default::default()
        });

        catalog.add("Cap", 250.0).unwrap();
        assert_eq!(
            handle.try_recv().ok(),
            Some(StoreEvent::CatalogUpdated { entry_count: 6 })
        );
    }
}
