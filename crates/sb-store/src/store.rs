//! Store interface shared by the query and sync paths.

use std::path::PathBuf;

use sb_core::{EntryChange, ListType};
use serde::Serialize;

/// Error type for store access.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Counts produced by one atomic application of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppliedChanges {
    /// Rows opened by `Add` changes
    pub additions: u64,
    /// `Remove` changes seen (not rows closed)
    pub removals: u64,
    /// Rows moved from the active table into the archive
    pub archived: u64,
}

/// Snapshot of one list for operator inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListStatus {
    pub list: ListType,
    pub local_version: i64,
    pub active: u64,
    pub archived: u64,
    pub log_rows: u64,
}

/// Persistent blacklist mirror, partitioned per list type.
pub trait BlacklistStore {
    /// Number of active rows for `hash`.
    fn active_count(&self, list: ListType, hash: &str) -> Result<u64, StoreError>;

    /// Highest logged version, or `NEVER_SYNCED` when the log is empty.
    fn local_version(&self, list: ListType) -> Result<i64, StoreError>;

    /// Apply changes in order, migrate closed rows to the archive and append a
    /// log row, all as one unit. On error nothing is persisted.
    fn apply_changes(
        &mut self,
        list: ListType,
        version: i64,
        changes: &[EntryChange],
        now: i64,
    ) -> Result<AppliedChanges, StoreError>;

    /// Row counts and version for a list.
    fn status(&self, list: ListType) -> Result<ListStatus, StoreError>;
}
