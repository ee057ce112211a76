//! sbmirror Blacklist Store
//!
//! Persistent mirror of the remote lists plus the read path over it.
//!
//! # Modules
//!
//! - `store`: The `BlacklistStore` trait and shared result types
//! - `sqlite`: SQLite implementation with one table triple per list
//! - `query`: URL lookups against the active tables
//! - `config`: Explicit connection settings

pub mod config;
pub mod query;
pub mod sqlite;
pub mod store;

pub use config::StoreConfig;
pub use query::QueryEngine;
pub use sqlite::SqliteStore;
pub use store::{AppliedChanges, BlacklistStore, ListStatus, StoreError};
