//! SQLite-backed blacklist store
//!
//! Each list owns three tables: the active table (named after the list), an
//! `_old` archive and an append-only `_log`. Table names only ever come from
//! `ListType`, never from caller input.

use log::{debug, info};
use rusqlite::{params, Connection, Transaction};

use sb_core::{ArchivedEntry, BlacklistEntry, EntryChange, ListType, SyncLogRecord, NEVER_SYNCED};

use crate::config::StoreConfig;
use crate::store::{AppliedChanges, BlacklistStore, ListStatus, StoreError};

/// Store over a single SQLite connection. The connection closes on drop.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database described by `config` and ensure the
    /// schema exists.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(&config.path).map_err(|source| StoreError::Open {
            path: config.path.clone(),
            source,
        })?;
        conn.busy_timeout(config.busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self { conn };
        store.init_schema()?;
        debug!("Opened store at {}", config.path.display());
        Ok(store)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create the tables for every list if they are missing.
    pub fn init_schema(&self) -> Result<(), StoreError> {
        for list in ListType::ALL {
            self.conn.execute_batch(&schema_sql(list))?;
        }
        Ok(())
    }

    /// All rows of the active table, oldest first.
    pub fn active_entries(&self, list: ListType) -> Result<Vec<BlacklistEntry>, StoreError> {
        let sql = format!(
            "SELECT HASH, TS_IN, TS_OUT FROM {} ORDER BY rowid",
            list.active_table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(BlacklistEntry {
                hash: row.get(0)?,
                ts_in: row.get(1)?,
                ts_out: row.get(2)?,
            })
        })?;
        let collected = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(collected)
    }

    /// All rows of the archive table, oldest first.
    pub fn archived_entries(&self, list: ListType) -> Result<Vec<ArchivedEntry>, StoreError> {
        let sql = format!(
            "SELECT HASH, TS_IN, TS_OUT FROM {} ORDER BY rowid",
            list.archive_table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(ArchivedEntry {
                hash: row.get(0)?,
                ts_in: row.get(1)?,
                ts_out: row.get(2)?,
            })
        })?;
        let collected = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(collected)
    }

    /// All log rows, in insertion order.
    pub fn log_records(&self, list: ListType) -> Result<Vec<SyncLogRecord>, StoreError> {
        let sql = format!(
            "SELECT VERSION_ID, TS_PROCESSED, NUM_ADDITIONS, NUM_ARCHIVED FROM {} ORDER BY rowid",
            list.log_table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(SyncLogRecord {
                version_id: row.get(0)?,
                processed_ts: row.get(1)?,
                additions: row.get(2)?,
                archived: row.get(3)?,
            })
        })?;
        let collected = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(collected)
    }

    fn count_rows(&self, table: &str) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl BlacklistStore for SqliteStore {
    fn active_count(&self, list: ListType, hash: &str) -> Result<u64, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE HASH = ?1 AND TS_OUT = -1",
            list.active_table()
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let count: i64 = stmt.query_row([hash], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn local_version(&self, list: ListType) -> Result<i64, StoreError> {
        let sql = format!("SELECT MAX(VERSION_ID) FROM {}", list.log_table());
        let version: Option<i64> = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(version.unwrap_or(NEVER_SYNCED))
    }

    fn apply_changes(
        &mut self,
        list: ListType,
        version: i64,
        changes: &[EntryChange],
        now: i64,
    ) -> Result<AppliedChanges, StoreError> {
        let tx = self.conn.transaction()?;

        let mut applied = apply_entry_changes(&tx, list, changes, now)?;
        applied.archived = archive_migrate(&tx, list)?;
        insert_log_entry(&tx, list, version, now, &applied)?;

        tx.commit()?;
        info!(
            "[{}] committed version {}: {} additions, {} removals, {} archived",
            list, version, applied.additions, applied.removals, applied.archived
        );
        Ok(applied)
    }

    fn status(&self, list: ListType) -> Result<ListStatus, StoreError> {
        Ok(ListStatus {
            list,
            local_version: self.local_version(list)?,
            active: self.count_rows(list.active_table())?,
            archived: self.count_rows(list.archive_table())?,
            log_rows: self.count_rows(list.log_table())?,
        })
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

fn apply_entry_changes(
    tx: &Transaction<'_>,
    list: ListType,
    changes: &[EntryChange],
    now: i64,
) -> Result<AppliedChanges, StoreError> {
    let mut insert = tx.prepare(&format!(
        "INSERT INTO {} (HASH, TS_IN, TS_OUT) VALUES (?1, ?2, -1)",
        list.active_table()
    ))?;
    let mut close = tx.prepare(&format!(
        "UPDATE {} SET TS_OUT = ?1 WHERE HASH = ?2 AND TS_OUT = -1",
        list.active_table()
    ))?;

    let mut applied = AppliedChanges::default();
    for change in changes {
        match change {
            EntryChange::Add(hash) => {
                insert.execute(params![hash, now])?;
                applied.additions += 1;
            }
            EntryChange::Remove(hash) => {
                let closed = close.execute(params![now, hash])?;
                if closed == 0 {
                    debug!("[{}] removal of unknown hash {}", list, hash);
                }
                applied.removals += 1;
            }
        }
    }

    Ok(applied)
}

/// Copy closed rows into the archive, then drop them from the active table.
fn archive_migrate(tx: &Transaction<'_>, list: ListType) -> Result<u64, StoreError> {
    let moved = tx.execute(
        &format!(
            "INSERT INTO {} (HASH, TS_IN, TS_OUT) SELECT HASH, TS_IN, TS_OUT FROM {} WHERE TS_OUT != -1",
            list.archive_table(),
            list.active_table()
        ),
        [],
    )?;
    tx.execute(
        &format!("DELETE FROM {} WHERE TS_OUT != -1", list.active_table()),
        [],
    )?;
    Ok(moved as u64)
}

fn insert_log_entry(
    tx: &Transaction<'_>,
    list: ListType,
    version: i64,
    now: i64,
    applied: &AppliedChanges,
) -> Result<(), StoreError> {
    tx.execute(
        &format!(
            "INSERT INTO {} (VERSION_ID, TS_PROCESSED, NUM_ADDITIONS, NUM_ARCHIVED) VALUES (?1, ?2, ?3, ?4)",
            list.log_table()
        ),
        params![version, now, applied.additions as i64, applied.archived as i64],
    )?;
    Ok(())
}

fn schema_sql(list: ListType) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {active} (
          HASH TEXT NOT NULL,
          TS_IN INTEGER NOT NULL,
          TS_OUT INTEGER NOT NULL DEFAULT -1
        );
        CREATE INDEX IF NOT EXISTS idx_{active}_hash ON {active}(HASH);

        CREATE TABLE IF NOT EXISTS {archive} (
          HASH TEXT NOT NULL,
          TS_IN INTEGER NOT NULL,
          TS_OUT INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS {log} (
          VERSION_ID INTEGER NOT NULL,
          TS_PROCESSED INTEGER NOT NULL,
          NUM_ADDITIONS INTEGER NOT NULL,
          NUM_ARCHIVED INTEGER NOT NULL
        );
        "#,
        active = list.active_table(),
        archive = list.archive_table(),
        log = list.log_table(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: &str = "00386acdf6010e6472b3e34b2f8f0872";
    const H2: &str = "11111111111111111111111111111111";

    fn add(hash: &str) -> EntryChange {
        EntryChange::Add(hash.to_string())
    }

    fn remove(hash: &str) -> EntryChange {
        EntryChange::Remove(hash.to_string())
    }

    #[test]
    fn empty_store_is_never_synced() {
        let store = SqliteStore::open_in_memory().unwrap();
        for list in ListType::ALL {
            assert_eq!(store.local_version(list).unwrap(), NEVER_SYNCED);
            assert_eq!(store.active_count(list, H1).unwrap(), 0);
        }
    }

    #[test]
    fn additions_become_active() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let applied = store
            .apply_changes(ListType::Phishing, 372, &[add(H1), add(H2)], 1000)
            .unwrap();

        assert_eq!(applied, AppliedChanges { additions: 2, removals: 0, archived: 0 });
        assert_eq!(store.active_count(ListType::Phishing, H1).unwrap(), 1);
        assert_eq!(store.active_count(ListType::Malware, H1).unwrap(), 0);
        assert_eq!(store.local_version(ListType::Phishing).unwrap(), 372);

        let entries = store.active_entries(ListType::Phishing).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.is_active() && e.ts_in == 1000));
    }

    #[test]
    fn add_remove_migrate_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.apply_changes(ListType::Malware, 1, &[add(H1)], 100).unwrap();
        let applied = store.apply_changes(ListType::Malware, 2, &[remove(H1)], 200).unwrap();

        assert_eq!(applied.archived, 1);
        assert!(store.active_entries(ListType::Malware).unwrap().is_empty());
        assert_eq!(
            store.archived_entries(ListType::Malware).unwrap(),
            vec![ArchivedEntry { hash: H1.to_string(), ts_in: 100, ts_out: 200 }]
        );
    }

    #[test]
    fn removal_closes_every_duplicate() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.apply_changes(ListType::Phishing, 1, &[add(H1), add(H1), add(H2)], 10).unwrap();
        assert_eq!(store.active_count(ListType::Phishing, H1).unwrap(), 2);

        let applied = store.apply_changes(ListType::Phishing, 2, &[remove(H1)], 20).unwrap();
        assert_eq!(applied.archived, 2);
        assert_eq!(store.active_count(ListType::Phishing, H1).unwrap(), 0);
        assert_eq!(store.active_count(ListType::Phishing, H2).unwrap(), 1);
    }

    #[test]
    fn add_then_remove_in_one_diff_is_archived() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let applied = store
            .apply_changes(ListType::Phishing, 5, &[add(H1), remove(H1)], 50)
            .unwrap();
        assert_eq!(applied, AppliedChanges { additions: 1, removals: 1, archived: 1 });
        assert_eq!(store.status(ListType::Phishing).unwrap().active, 0);
    }

    #[test]
    fn log_rows_record_each_run() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.apply_changes(ListType::Phishing, 3, &[add(H1)], 30).unwrap();
        store.apply_changes(ListType::Phishing, 4, &[remove(H1)], 40).unwrap();

        assert_eq!(
            store.log_records(ListType::Phishing).unwrap(),
            vec![
                SyncLogRecord { version_id: 3, processed_ts: 30, additions: 1, archived: 0 },
                SyncLogRecord { version_id: 4, processed_ts: 40, additions: 0, archived: 1 },
            ]
        );
        assert!(store.log_records(ListType::Malware).unwrap().is_empty());
    }

    #[test]
    fn failed_run_rolls_back_everything() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.apply_changes(ListType::Phishing, 1, &[add(H1)], 10).unwrap();

        store.conn.execute_batch("DROP TABLE phishing_log;").unwrap();
        let result = store.apply_changes(ListType::Phishing, 2, &[remove(H1), add(H2)], 20);
        assert!(matches!(result, Err(StoreError::Sqlite(_))));

        assert_eq!(store.active_count(ListType::Phishing, H1).unwrap(), 1);
        assert_eq!(store.active_count(ListType::Phishing, H2).unwrap(), 0);
        assert!(store.archived_entries(ListType::Phishing).unwrap().is_empty());
    }

    #[test]
    fn status_counts_tables() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.apply_changes(ListType::Malware, 7, &[add(H1), add(H2)], 1).unwrap();
        store.apply_changes(ListType::Malware, 8, &[remove(H2)], 2).unwrap();

        let status = store.status(ListType::Malware).unwrap();
        assert_eq!(
            status,
            ListStatus {
                list: ListType::Malware,
                local_version: 8,
                active: 1,
                archived: 1,
                log_rows: 2,
            }
        );
    }

    #[test]
    fn open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("sb.sqlite3"));

        {
            let mut store = SqliteStore::open(&config).unwrap();
            store.apply_changes(ListType::Phishing, 9, &[add(H1)], 90).unwrap();
        }

        let store = SqliteStore::open(&config).unwrap();
        assert_eq!(store.local_version(ListType::Phishing).unwrap(), 9);
        assert_eq!(store.active_count(ListType::Phishing, H1).unwrap(), 1);
    }

    #[test]
    fn open_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("missing").join("sb.sqlite3"));
        assert!(matches!(SqliteStore::open(&config), Err(StoreError::Open { .. })));
    }
}
