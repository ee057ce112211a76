//! Diff-sync updater
//!
//! One run per list: read the local version, fetch the diff since then,
//! parse it and hand the whole change set to the store as a single atomic
//! unit (apply, archive, log). Lists never share state, so a failure on one
//! list does not affect the other.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use serde::Serialize;

use sb_core::ListType;
use sb_store::{BlacklistStore, StoreError};

use crate::feed::{DiffFeed, DiffRequest, FeedError};
use crate::parser::{parse_diff, DiffError, MAJOR_VERSION};

/// Error type for a synchronization run. Every variant aborts the run with
/// the store left as it was before.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),
    #[error("Remote version {remote} for {list} is older than local version {local}")]
    VersionRegression {
        list: ListType,
        local: i64,
        remote: i64,
    },
}

/// Summary of a run that changed the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub list: ListType,
    pub previous_version: i64,
    pub version: i64,
    pub additions: u64,
    pub removals: u64,
    pub archived: u64,
    pub skipped_lines: usize,
    pub processed_ts: i64,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Remote returned an empty diff; nothing was written
    UpToDate { list: ListType, version: i64 },
    Applied(SyncReport),
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Drives synchronization of a store from a feed.
pub struct Updater<S, F> {
    store: S,
    feed: F,
    clock: fn() -> i64,
}

impl<S: BlacklistStore, F: DiffFeed> Updater<S, F> {
    pub fn new(store: S, feed: F) -> Self {
        Self {
            store,
            feed,
            clock: unix_now,
        }
    }

    /// Replace the unix-seconds clock used for `ts_in`/`ts_out`/log stamps.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Synchronize one list.
    pub fn sync(&mut self, list: ListType) -> Result<SyncOutcome, SyncError> {
        let now = (self.clock)();

        let local_version = self.store.local_version(list)?;
        let request = DiffRequest {
            list,
            major: MAJOR_VERSION,
            local_version,
        };
        info!("[{}] requesting diff since version {}", list, local_version);
        let body = self.feed.fetch(&request)?;

        let diff = match parse_diff(&body)? {
            Some(diff) => diff,
            None => {
                info!("[{}] already at version {}", list, local_version);
                return Ok(SyncOutcome::UpToDate {
                    list,
                    version: local_version,
                });
            }
        };

        let header = &diff.header;
        if header.major != MAJOR_VERSION {
            warn!(
                "[{}] diff header reports major version {}, expected {}",
                list, header.major, MAJOR_VERSION
            );
        }
        if header.version < local_version {
            return Err(SyncError::VersionRegression {
                list,
                local: local_version,
                remote: header.version,
            });
        }

        info!(
            "[{}] applying {} changes for version {}",
            list,
            diff.changes.len(),
            header.version
        );
        let applied = self
            .store
            .apply_changes(list, header.version, &diff.changes, now)?;

        Ok(SyncOutcome::Applied(SyncReport {
            list,
            previous_version: local_version,
            version: header.version,
            additions: applied.additions,
            removals: applied.removals,
            archived: applied.archived,
            skipped_lines: diff.skipped,
            processed_ts: now,
        }))
    }

    /// Synchronize every list in turn. Each list's result is independent.
    pub fn sync_all(&mut self) -> Vec<(ListType, Result<SyncOutcome, SyncError>)> {
        self.sync_lists(&ListType::ALL)
    }

    /// Synchronize `lists` in order, logging failures and carrying on.
    pub fn sync_lists(&mut self, lists: &[ListType]) -> Vec<(ListType, Result<SyncOutcome, SyncError>)> {
        lists
            .iter()
            .map(|&list| {
                let result = self.sync(list);
                if let Err(e) = &result {
                    error!("[{}] sync failed: {}", list, e);
                }
                (list, result)
            })
            .collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> (S, F) {
        (self.store, self.feed)
    }
}
