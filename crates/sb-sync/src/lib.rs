//! sbmirror Diff Synchronization
//!
//! This crate keeps the local store in step with the remote lists by
//! fetching incremental diffs and applying them atomically.

pub mod feed;
pub mod parser;
pub mod updater;

pub use feed::{DiffFeed, DiffRequest, FeedConfig, FeedError, HttpFeed};
pub use parser::{parse_diff, parse_header, DiffError, DiffHeader, DiffUpdate, MAJOR_VERSION};
pub use updater::{SyncError, SyncOutcome, SyncReport, Updater};
