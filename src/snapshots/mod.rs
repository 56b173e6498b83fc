//! Backup snapshots of the order list.
//!
//! A snapshot is a full copy of the order collection captured under its own
//! storage key (`order_backup_<backupId>`). Snapshots are taken on every
//! order creation, on demand, and automatically before a restore or a data
//! reset so that both can be undone. The oldest snapshots beyond a fixed
//! cap are pruned after every capture.
//!
//! Nothing in this module returns an error: persistence failures are
//! logged and reported as `None`/`false`.

mod manager;

pub use manager::{
    snapshot_key, RestoreOutcome, SnapshotManager, BACKUP_KEY_PREFIX, DEFAULT_MAX_SNAPSHOTS,
};
