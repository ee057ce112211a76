//! sbmirror Core Library
//!
//! This crate provides the pure, storage-free half of the sbmirror blacklist
//! mirror: turning an arbitrary URL into the exact set of fingerprints the
//! remote authority publishes.
//!
//! # Architecture
//!
//! A lookup runs in three stages. The raw URL is canonicalized into a single
//! normalized string, the canonical form is expanded into a bounded set of
//! host/path candidates, and each candidate is fingerprinted. Nothing here
//! touches the network or a database.
//!
//! # Modules
//!
//! - `hash`: MD5 fingerprints in lowercase hex
//! - `url`: URL parsing, escaping and canonicalization
//! - `forms`: Lookup-form (candidate) generation
//! - `types`: Shared type definitions

pub mod forms;
pub mod hash;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use forms::{candidate_forms, CandidateForms};
pub use hash::{fingerprint, is_fingerprint};
pub use types::{ArchivedEntry, BlacklistEntry, EntryChange, ListType, SyncLogRecord, ACTIVE_TS_OUT, NEVER_SYNCED};
pub use url::{canonicalize, CanonicalUrl, CanonicalizeError};
