//! Main Store struct tying all components together.

use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::demo::DemoMode;
use crate::error::{Result, StoreError};
use crate::lifecycle::{derive, OrderEngine, OrderForm};
use crate::records::RecordStore;
use crate::reports::{self, Analytics, Metric, ReportRange, SeriesPoint};
use crate::snapshots::{RestoreOutcome, SnapshotManager, DEFAULT_MAX_SNAPSHOTS};
use crate::storage::{FileStorage, MemoryStorage, Storage};
use crate::subscriptions::{
    ListenerId, StoreEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
use crate::types::{FulfillmentStatus, LineItem, Order, Snapshot};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Base directory for the store. Ignored when `in_memory` is set.
    pub path: PathBuf,

    /// Read cache size (number of values).
    pub cache_size: usize,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,

    /// Snapshots kept before the oldest are pruned.
    pub max_snapshots: usize,

    /// Keep everything in memory; nothing touches the disk.
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./store"),
            cache_size: 64,
            create_if_missing: true,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            in_memory: false,
        }
    }
}

/// Point-in-time counts for a store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub order_count: usize,
    pub active_orders: usize,
    pub cancelled_orders: usize,
    pub snapshot_count: usize,
    pub catalog_entries: usize,
    pub last_order_number: u32,
    /// Bytes on disk, 0 for in-memory stores.
    pub storage_bytes: u64,
}

/// Magic bytes for store manifest.
const STORE_MAGIC: &[u8; 4] = b"PSO\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

/// Name of the manifest file.
const MANIFEST: &str = "MANIFEST";

/// The print-shop order store.
///
/// Provides a unified interface for:
/// - Creating orders and driving them through their lifecycle
/// - Snapshotting and restoring the order list
/// - Editing the sublimation type catalog
/// - Analytics over all orders
/// - Switching to and from demo data
///
/// Every change is announced to subscribers; see [`Store::subscribe`].
pub struct Store {
    config: StoreConfig,

    /// Set for directory-backed stores.
    files: Option<Arc<FileStorage>>,

    events: Arc<SubscriptionManager>,
    records: Arc<RecordStore>,
    snapshots: Arc<SnapshotManager>,
    engine: OrderEngine,
    catalog: Catalog,
    demo: DemoMode,
}

impl Store {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        if config.in_memory || config.path.join(MANIFEST).exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    /// Create a new store.
    pub fn create(config: StoreConfig) -> Result<Self> {
        if config.in_memory {
            return Ok(Self::assemble(config, None));
        }

        fs::create_dir_all(&config.path)?;
        Self::write_manifest(&config.path)?;
        let files = Arc::new(FileStorage::open(&config.path, config.cache_size)?);

        tracing::info!(path = %config.path.display(), "created store");
        Ok(Self::assemble(config, Some(files)))
    }

    /// Open an existing store.
    pub fn open(config: StoreConfig) -> Result<Self> {
        if config.in_memory {
            return Ok(Self::assemble(config, None));
        }

        Self::verify_manifest(&config.path)?;
        let files = Arc::new(FileStorage::open(&config.path, config.cache_size)?);

        tracing::debug!(path = %config.path.display(), "opened store");
        Ok(Self::assemble(config, Some(files)))
    }

    /// A fresh in-memory store with default settings.
    pub fn in_memory() -> Self {
        Self::assemble(
            StoreConfig {
                in_memory: true,
                ..Default::default()
            },
            None,
        )
    }

    fn assemble(config: StoreConfig, files: Option<Arc<FileStorage>>) -> Self {
        let storage: Arc<dyn Storage> = match &files {
            Some(files) => Arc::clone(files) as Arc<dyn Storage>,
            None => Arc::new(MemoryStorage::new()),
        };
        let events = Arc::new(SubscriptionManager::new());
        let records = Arc::new(RecordStore::new(storage, Arc::clone(&events)));
        let snapshots = Arc::new(SnapshotManager::new(
            Arc::clone(&records),
            config.max_snapshots,
        ));

        Self {
            engine: OrderEngine::new(Arc::clone(&records), Arc::clone(&snapshots)),
            catalog: Catalog::new(Arc::clone(&records)),
            demo: DemoMode::new(Arc::clone(&records)),
            config,
            files,
            events,
            records,
            snapshots,
        }
    }

    // --- Components ---

    pub fn engine(&self) -> &OrderEngine {
        &self.engine
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn demo(&self) -> &DemoMode {
        &self.demo
    }

    /// Raw record access.
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    // --- Order Operations ---

    pub fn create_order(&self, form: &OrderForm) -> Result<Order> {
        self.engine.create_order(form)
    }

    pub fn set_status(&self, serial_job_number: &str, status: FulfillmentStatus) -> Result<Order> {
        self.engine.set_status(serial_job_number, status)
    }

    pub fn cancel_order(&self, serial_job_number: &str, reason: &str) -> Result<Order> {
        self.engine.cancel_order(serial_job_number, reason)
    }

    pub fn apply_deposit(&self, serial_job_number: &str, amount: f64) -> Result<Order> {
        self.engine.apply_deposit(serial_job_number, amount)
    }

    pub fn edit_line_items(&self, serial_job_number: &str, items: Vec<LineItem>) -> Result<Order> {
        self.engine.edit_line_items(serial_job_number, items)
    }

    pub fn move_to_history(&self, serial_job_number: &str) -> Result<Order> {
        self.engine.move_to_history(serial_job_number)
    }

    pub fn get_order(&self, serial_job_number: &str) -> Option<Order> {
        self.engine.get_order(serial_job_number)
    }

    pub fn all_orders(&self) -> Vec<Order> {
        self.engine.all_orders()
    }

    pub fn active_orders(&self) -> Vec<Order> {
        self.engine.active_orders()
    }

    pub fn history_orders(&self) -> Vec<Order> {
        self.engine.history_orders()
    }

    pub fn cancelled_orders(&self) -> Vec<Order> {
        self.engine.cancelled_orders()
    }

    // --- Snapshot Operations ---

    pub fn create_snapshot(&self) -> Option<String> {
        self.snapshots.create_snapshot()
    }

    pub fn create_snapshot_at(&self, at: DateTime<Utc>) -> Option<String> {
        self.snapshots.create_snapshot_at(at)
    }

    pub fn list_snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.list_snapshots()
    }

    pub fn restore_snapshot(&self, backup_id: &str) -> bool {
        self.snapshots.restore_snapshot(backup_id)
    }

    pub fn restore_snapshot_detailed(&self, backup_id: &str) -> Option<RestoreOutcome> {
        self.snapshots.restore_snapshot_detailed(backup_id)
    }

    pub fn clear_all_snapshots(&self) -> bool {
        self.snapshots.clear_all_snapshots()
    }

    /// Empty the order list, restore the default catalog and restart
    /// numbering. A snapshot of the previous orders is taken first.
    pub fn reset_all_data(&self) -> bool {
        self.snapshots.reset_all_data()
    }

    // --- Reports ---

    pub fn analytics(&self) -> Analytics {
        reports::analytics(&self.records.load_orders())
    }

    pub fn series(&self, range: ReportRange, metric: Metric, year: i32, month: u32) -> Vec<SeriesPoint> {
        reports::series(&self.records.load_orders(), range, metric, year, month)
    }

    // --- Demo Mode ---

    pub fn enter_demo_mode(&self) -> Result<()> {
        self.demo.enter_demo_mode()
    }

    pub fn exit_demo_mode(&self) -> Result<()> {
        self.demo.exit_demo_mode()
    }

    pub fn is_demo_mode(&self) -> bool {
        self.demo.is_demo_mode()
    }

    // --- Subscriptions ---

    /// Receive change events on a bounded channel. Subscribers that fall
    /// behind are dropped.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.events.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id)
    }

    /// Run `listener` synchronously for every change event.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.events.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    // --- Utility ---

    pub fn stats(&self) -> Result<StoreStats> {
        let orders = self.records.load_orders();
        let storage_bytes = match &self.files {
            Some(files) => files.total_size()?,
            None => 0,
        };

        Ok(StoreStats {
            order_count: orders.len(),
            active_orders: orders.iter().filter(|o| derive::is_active(o)).count(),
            cancelled_orders: orders
                .iter()
                .filter(|o| o.status == FulfillmentStatus::Cancelled)
                .count(),
            snapshot_count: self.snapshots.snapshot_count(),
            catalog_entries: self.records.load_catalog().len(),
            last_order_number: self.records.last_order_number(),
            storage_bytes,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Store directory, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.files.as_ref().map(|files| files.path())
    }

    // --- Private Helpers ---

    fn write_manifest(path: &Path) -> Result<()> {
        use std::io::Write;

        let mut file = File::create(path.join(MANIFEST))?;
        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;

        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        use std::io::Read;

        let mut file = match File::open(path.join(MANIFEST)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotInitialized),
            Err(e) => return Err(e.into()),
        };

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != STORE_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }
}
