//! Core type definitions for sbmirror
//!
//! These types mirror the persisted schema one-to-one and are shared by the
//! store, the updater and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// `ts_out` value of an entry that is still in effect.
pub const ACTIVE_TS_OUT: i64 = -1;

/// Locally applied version when the log is empty.
pub const NEVER_SYNCED: i64 = -1;

// =============================================================================
// List Types
// =============================================================================

/// Blacklist a record or query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Phishing,
    Malware,
}

impl ListType {
    /// All lists, in the order a full sync processes them.
    pub const ALL: [ListType; 2] = [ListType::Phishing, ListType::Malware];

    /// Short name, also the base table name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Phishing => "phishing",
            Self::Malware => "malware",
        }
    }

    /// Identifier the remote authority uses for this list.
    pub const fn remote_name(self) -> &'static str {
        match self {
            Self::Phishing => "goog-black-hash",
            Self::Malware => "goog-malware-hash",
        }
    }

    /// Table holding active entries.
    pub const fn active_table(self) -> &'static str {
        self.name()
    }

    /// Table holding migrated (closed) entries.
    pub const fn archive_table(self) -> &'static str {
        match self {
            Self::Phishing => "phishing_old",
            Self::Malware => "malware_old",
        }
    }

    /// Table holding one row per applied diff.
    pub const fn log_table(self) -> &'static str {
        match self {
            Self::Phishing => "phishing_log",
            Self::Malware => "malware_log",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ListType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "phishing" => Ok(Self::Phishing),
            "malware" => Ok(Self::Malware),
            other => Err(format!("unknown list type '{}'", other)),
        }
    }
}

// =============================================================================
// Entries
// =============================================================================

/// Row of an active table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlacklistEntry {
    /// Fingerprint of the listed candidate form
    pub hash: String,
    /// Time the entry was added (unix seconds)
    pub ts_in: i64,
    /// Time the entry was removed, or `ACTIVE_TS_OUT`
    pub ts_out: i64,
}

impl BlacklistEntry {
    pub fn is_active(&self) -> bool {
        self.ts_out == ACTIVE_TS_OUT
    }
}

/// Row of an archive table. Only ever produced by migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedEntry {
    pub hash: String,
    pub ts_in: i64,
    pub ts_out: i64,
}

/// Row of a log table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncLogRecord {
    /// Remote version the run brought the list up to
    pub version_id: i64,
    /// Time the run committed (unix seconds)
    pub processed_ts: i64,
    /// Number of `+` lines applied
    pub additions: i64,
    /// Number of rows moved into the archive
    pub archived: i64,
}

// =============================================================================
// Entry Changes
// =============================================================================

/// One line of a diff, ready to be applied to an active table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryChange {
    /// Open a new active row for the hash
    Add(String),
    /// Close every active row carrying the hash
    Remove(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_type_tables() {
        assert_eq!(ListType::Phishing.active_table(), "phishing");
        assert_eq!(ListType::Phishing.archive_table(), "phishing_old");
        assert_eq!(ListType::Malware.log_table(), "malware_log");
        assert_eq!(ListType::Malware.remote_name(), "goog-malware-hash");
    }

    #[test]
    fn test_list_type_from_str() {
        assert_eq!("Phishing".parse::<ListType>(), Ok(ListType::Phishing));
        assert_eq!("malware".parse::<ListType>(), Ok(ListType::Malware));
        assert!("spam".parse::<ListType>().is_err());
    }

    #[test]
    fn test_entry_is_active() {
        let entry = BlacklistEntry {
            hash: "00386acdf6010e6472b3e34b2f8f0872".to_string(),
            ts_in: 10,
            ts_out: ACTIVE_TS_OUT,
        };
        assert!(entry.is_active());
        assert!(!BlacklistEntry { ts_out: 20, ..entry }.is_active());
    }
}
