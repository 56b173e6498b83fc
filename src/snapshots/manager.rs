//! Snapshot manager implementation.

use crate::error::{Result, StoreError};
use crate::records::RecordStore;
use crate::types::{default_catalog, Snapshot};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

/// Storage key prefix of snapshot entries.
pub const BACKUP_KEY_PREFIX: &str = "order_backup_";

/// Default number of snapshots kept.
pub const DEFAULT_MAX_SNAPSHOTS: usize = 50;

/// Storage key of a snapshot id.
pub fn snapshot_key(backup_id: &str) -> String {
    format!("{}{}", BACKUP_KEY_PREFIX, backup_id)
}

/// Result of a successful restore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Snapshot that was applied.
    pub restored_id: String,
    /// Snapshot of the state that was overwritten.
    pub safety_backup_id: String,
}

/// Creates, lists, restores and prunes snapshots of the order list.
pub struct SnapshotManager {
    records: Arc<RecordStore>,
    max_snapshots: usize,
}

impl SnapshotManager {
    pub fn new(records: Arc<RecordStore>, max_snapshots: usize) -> Self {
        Self {
            records,
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Number of snapshots kept after pruning.
    pub fn max_snapshots(&self) -> usize {
        self.max_snapshots
    }

    /// Capture the current order list. Returns the new id, or `None` if it
    /// could not be persisted.
    pub fn create_snapshot(&self) -> Option<String> {
        self.create_snapshot_at(Utc::now())
    }

    /// Capture the current order list with an explicit capture time.
    pub fn create_snapshot_at(&self, at: DateTime<Utc>) -> Option<String> {
        match self.try_create_snapshot(at) {
            Ok(backup_id) => {
                tracing::info!(backup_id = %backup_id, "snapshot created");
                Some(backup_id)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to create snapshot");
                None
            }
        }
    }

    /// All readable snapshots, newest first.
    ///
    /// Entries that fail to read or parse are skipped.
    pub fn list_snapshots(&self) -> Vec<Snapshot> {
        let keys = match self.records.storage().keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "failed to enumerate snapshots");
                return Vec::new();
            }
        };

        let mut snapshots: Vec<Snapshot> = keys
            .iter()
            .filter(|key| key.starts_with(BACKUP_KEY_PREFIX))
            .filter_map(|key| match self.read_snapshot(key) {
                Ok(Some(snapshot)) => Some(snapshot),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping unreadable snapshot");
                    None
                }
            })
            .collect();

        snapshots.sort_by(newest_first);
        snapshots
    }

    /// Number of readable snapshots.
    pub fn snapshot_count(&self) -> usize {
        self.list_snapshots().len()
    }

    /// Look up one snapshot.
    pub fn get_snapshot(&self, backup_id: &str) -> Option<Snapshot> {
        match self.read_snapshot(&snapshot_key(backup_id)) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(backup_id = %backup_id, error = %e, "unreadable snapshot");
                None
            }
        }
    }

    /// Replace the order list with a snapshot's orders.
    ///
    /// Returns false, changing nothing, if the snapshot does not exist or
    /// any step fails before the order list is written.
    pub fn restore_snapshot(&self, backup_id: &str) -> bool {
        self.restore_snapshot_detailed(backup_id).is_some()
    }

    /// Like [`restore_snapshot`](Self::restore_snapshot), also reporting the
    /// safety snapshot taken beforehand.
    pub fn restore_snapshot_detailed(&self, backup_id: &str) -> Option<RestoreOutcome> {
        match self.try_restore(backup_id) {
            Ok(Some(outcome)) => {
                tracing::info!(
                    backup_id = %backup_id,
                    safety_backup_id = %outcome.safety_backup_id,
                    "snapshot restored"
                );
                Some(outcome)
            }
            Ok(None) => {
                tracing::warn!(backup_id = %backup_id, "snapshot not found");
                None
            }
            Err(e) => {
                tracing::error!(backup_id = %backup_id, error = %e, "failed to restore snapshot");
                None
            }
        }
    }

    /// Delete every snapshot. Irreversible.
    pub fn clear_all_snapshots(&self) -> bool {
        match self.try_clear_all() {
            Ok(count) => {
                tracing::info!(count, "cleared snapshots");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to clear snapshots");
                false
            }
        }
    }

    /// Keep the `max_count` newest snapshots and delete the rest.
    /// Returns how many were deleted.
    pub fn prune_oldest(&self, max_count: usize) -> usize {
        let snapshots = self.list_snapshots();
        let mut removed = 0;

        for snapshot in snapshots.iter().skip(max_count) {
            match self.records.storage().remove(&snapshot_key(&snapshot.backup_id)) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(backup_id = %snapshot.backup_id, error = %e, "failed to prune snapshot");
                }
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "pruned old snapshots");
        }
        removed
    }

    /// Snapshot the current state, then empty the order list, restore the
    /// default catalog and restart order numbering.
    pub fn reset_all_data(&self) -> bool {
        match self.try_reset() {
            Ok(safety_backup_id) => {
                tracing::info!(safety_backup_id = %safety_backup_id, "all data reset");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to reset data");
                false
            }
        }
    }

    // --- Private Helpers ---

    fn try_create_snapshot(&self, at: DateTime<Utc>) -> Result<String> {
        let _lock = self.records.lock();

        let orders = self.records.try_load_orders()?;
        let backup_id = self.unique_backup_id(at)?;

        let snapshot = Snapshot {
            orders,
            timestamp: at,
            backup_id: backup_id.clone(),
        };
        let encoded = serde_json::to_string(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.records
            .storage()
            .set(&snapshot_key(&backup_id), &encoded)?;

        self.prune_oldest(self.max_snapshots);
        self.records.events().broadcast_snapshot_created(&backup_id);

        Ok(backup_id)
    }

    fn try_restore(&self, backup_id: &str) -> Result<Option<RestoreOutcome>> {
        let _lock = self.records.lock();

        let snapshot = match self.read_snapshot(&snapshot_key(backup_id))? {
            Some(snapshot) => snapshot,
            None => return Ok(None),
        };

        // Restores are undoable: capture what is about to be overwritten
        let safety_backup_id = self.try_create_snapshot(Utc::now())?;

        self.records.save_orders(&snapshot.orders)?;
        self.records
            .events()
            .broadcast_snapshot_restored(backup_id, Some(safety_backup_id.clone()));

        Ok(Some(RestoreOutcome {
            restored_id: backup_id.to_string(),
            safety_backup_id,
        }))
    }

    fn try_clear_all(&self) -> Result<usize> {
        let _lock = self.records.lock();

        let storage = self.records.storage();
        let mut count = 0;
        for key in storage.keys()? {
            if key.starts_with(BACKUP_KEY_PREFIX) && storage.remove(&key)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn try_reset(&self) -> Result<String> {
        let _lock = self.records.lock();

        let safety_backup_id = self.try_create_snapshot(Utc::now())?;

        self.records.save_orders(&[])?;
        self.records.save_catalog(&default_catalog())?;
        self.records.reset_order_numbers()?;
        self.records.events().broadcast_data_reset();

        Ok(safety_backup_id)
    }

    fn read_snapshot(&self, key: &str) -> Result<Option<Snapshot>> {
        match self.records.storage().get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// `backup_<YYYYMMDD_HHmmss>`, suffixed `_001`, `_002`, ... when a
    /// snapshot was already taken within the same second.
    fn unique_backup_id(&self, at: DateTime<Utc>) -> Result<String> {
        let base = format!("backup_{}", at.format("%Y%m%d_%H%M%S"));
        let storage = self.records.storage();

        if !storage.contains(&snapshot_key(&base))? {
            return Ok(base);
        }
        for n in 1..=999u32 {
            let candidate = format!("{}_{:03}", base, n);
            if !storage.contains(&snapshot_key(&candidate))? {
                return Ok(candidate);
            }
        }
        Err(StoreError::InvalidOperation(format!(
            "Too many snapshots captured at {}",
            base
        )))
    }
}

/// Newest capture time first; ids break ties so same-second captures keep
/// their creation order.
fn newest_first(a: &Snapshot, b: &Snapshot) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.backup_id.cmp(&a.backup_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ORDERS_KEY;
    use crate::storage::{MemoryStorage, Storage};
    use crate::subscriptions::SubscriptionManager;
    use chrono::{Duration, TimeZone};

    fn test_manager(max: usize) -> (SnapshotManager, Arc<RecordStore>) {
        let records = Arc::new(RecordStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(SubscriptionManager::new()),
        ));
        (SnapshotManager::new(Arc::clone(&records), max), records)
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_backup_id_format() {
        let (manager, _) = test_manager(10);
        let id = manager.create_snapshot_at(base_time()).unwrap();
        assert_eq!(id, "backup_20240517_093000");
        assert!(manager.get_snapshot(&id).is_some());
    }

    #[test]
    fn test_same_second_ids_are_unique() {
        let (manager, _) = test_manager(10);
        let first = manager.create_snapshot_at(base_time()).unwrap();
        let second = manager.create_snapshot_at(base_time()).unwrap();
        let third = manager.create_snapshot_at(base_time()).unwrap();

        assert_eq!(second, "backup_20240517_093000_001");
        assert_eq!(third, "backup_20240517_093000_002");

        let listed: Vec<String> = manager
            .list_snapshots()
            .into_iter()
            .map(|s| s.backup_id)
            .collect();
        assert_eq!(listed, vec![third, second, first]);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let (manager, _) = test_manager(3);
        let ids: Vec<String> = (0..5)
            .map(|i| {
                manager
                    .create_snapshot_at(base_time() + Duration::minutes(i))
                    .unwrap()
            })
            .collect();

        let listed: Vec<String> = manager
            .list_snapshots()
            .into_iter()
            .map(|s| s.backup_id)
            .collect();
        assert_eq!(listed, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);
    }

    #[test]
    fn test_prune_by_timestamp_not_creation_order() {
        let (manager, _) = test_manager(2);
        // Captured out of order: the oldest timestamp goes, not the first created
        let late = manager.create_snapshot_at(base_time() + Duration::hours(2)).unwrap();
        let early = manager.create_snapshot_at(base_time()).unwrap();
        let middle = manager.create_snapshot_at(base_time() + Duration::hours(1)).unwrap();

        assert!(manager.get_snapshot(&early).is_none());
        assert!(manager.get_snapshot(&late).is_some());
        assert!(manager.get_snapshot(&middle).is_some());
    }

    #[test]
    fn test_list_skips_unparsable() {
        let (manager, records) = test_manager(10);
        manager.create_snapshot_at(base_time()).unwrap();
        records
            .storage()
            .set(&snapshot_key("backup_broken"), "{oops")
            .unwrap();

        assert_eq!(manager.list_snapshots().len(), 1);
    }

    #[test]
    fn test_restore_missing_changes_nothing() {
        let (manager, records) = test_manager(10);
        records.storage().set(ORDERS_KEY, "[]").unwrap();

        assert!(!manager.restore_snapshot("backup_19990101_000000"));
        assert_eq!(manager.snapshot_count(), 0);
    }

    #[test]
    fn test_create_fails_on_corrupt_orders() {
        let (manager, records) = test_manager(10);
        records.storage().set(ORDERS_KEY, "not json").unwrap();

        assert!(manager.create_snapshot().is_none());
        assert_eq!(manager.snapshot_count(), 0);
    }

    #[test]
    fn test_clear_all() {
        let (manager, records) = test_manager(10);
        manager.create_snapshot_at(base_time()).unwrap();
        manager
            .create_snapshot_at(base_time() + Duration::seconds(1))
            .unwrap();
        records.storage().set("unrelated", "1").unwrap();

        assert!(manager.clear_all_snapshots());
        assert_eq!(manager.snapshot_count(), 0);
        assert!(records.storage().contains("unrelated").unwrap());
    }
}
