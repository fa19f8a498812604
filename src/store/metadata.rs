//! Metadata Store Module
//!
//! SQLite-backed store of per-key lifecycle metadata, including the indexed
//! min-deadline query that drives the expiration scheduler.
//!
//! The connection is not thread-safe; the engine serializes access behind a
//! mutex and never holds it across an await point.

use std::path::Path;

use rusqlite::{named_params, Connection, OptionalExtension};
use tracing::debug;

use crate::cache::ItemMetadata;
use crate::error::Result;

/// Ordered schema migrations, applied once at open.
///
/// `PRAGMA user_version` records how many of these have run; new migrations
/// are appended, never edited.
const MIGRATIONS: &[&str] = &[
    // 1: metadata table
    "CREATE TABLE cache_metadata (
         key                  TEXT PRIMARY KEY,
         updated_at           INTEGER NOT NULL,
         time_to_live         INTEGER,
         time_before_deletion INTEGER
     )",
    // 2: expression index for deadline scans
    "CREATE INDEX idx_cache_metadata_deletion_time
         ON cache_metadata(updated_at + time_to_live + time_before_deletion)
      WHERE time_to_live IS NOT NULL
        AND time_before_deletion IS NOT NULL",
];

// == Metadata Store ==
/// Transactional store of per-key lifecycle metadata.
///
/// `NULL` duration columns mean unbounded, mirroring
/// [`ItemMetadata`](crate::cache::ItemMetadata).
#[derive(Debug)]
pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    // == Open ==
    /// Opens (creating if needed) the database at `path`, configures WAL mode
    /// and applies any pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = memory;",
        )?;

        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Applies migrations past the recorded `user_version`.
    fn migrate(&self) -> Result<()> {
        let version: i64 =
            self.conn
                .query_row("SELECT * FROM pragma_user_version", [], |row| row.get(0))?;

        for (index, migration) in MIGRATIONS.iter().enumerate().skip(version as usize) {
            debug!(migration = index + 1, "applying metadata migration");
            self.conn.execute_batch(migration)?;
            self.conn
                .pragma_update(None, "user_version", index as i64 + 1)?;
        }

        Ok(())
    }

    // == Set ==
    /// Upserts the metadata row for `key`, replacing all fields wholesale.
    pub fn set(&self, key: &str, metadata: &ItemMetadata) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO cache_metadata (key, updated_at, time_to_live, time_before_deletion)
                 VALUES (:key, :updated_at, :time_to_live, :time_before_deletion)
                 ON CONFLICT(key)
                 DO UPDATE SET updated_at = :updated_at
                             , time_to_live = :time_to_live
                             , time_before_deletion = :time_before_deletion",
            )?
            .execute(named_params! {
                ":key": key,
                ":updated_at": metadata.updated_at,
                ":time_to_live": metadata.time_to_live,
                ":time_before_deletion": metadata.time_before_deletion,
            })?;
        Ok(())
    }

    // == Get ==
    /// Reads the metadata row for `key`, or None if absent.
    pub fn get(&self, key: &str) -> Result<Option<ItemMetadata>> {
        let row = self
            .conn
            .prepare_cached(
                "SELECT updated_at, time_to_live, time_before_deletion
                   FROM cache_metadata
                  WHERE key = :key",
            )?
            .query_row(named_params! { ":key": key }, |row| {
                Ok(ItemMetadata {
                    updated_at: row.get(0)?,
                    time_to_live: row.get(1)?,
                    time_before_deletion: row.get(2)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    // == Exists ==
    /// Checks whether a metadata row exists for `key`.
    pub fn exists(&self, key: &str) -> Result<bool> {
        let exists = self
            .conn
            .prepare_cached(
                "SELECT EXISTS(SELECT 1 FROM cache_metadata WHERE key = :key)",
            )?
            .query_row(named_params! { ":key": key }, |row| row.get(0))?;
        Ok(exists)
    }

    // == Delete ==
    /// Removes the metadata row for `key`. Not an error if absent.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .prepare_cached("DELETE FROM cache_metadata WHERE key = :key")?
            .execute(named_params! { ":key": key })?;
        Ok(())
    }

    // == Clear ==
    /// Removes all metadata rows.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM cache_metadata", [])?;
        Ok(())
    }

    // == Keys ==
    /// Returns all stored keys in ascending key order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT key FROM cache_metadata ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    // == Next Deletion Time ==
    /// Returns the earliest finite deletion deadline across all rows, or None
    /// when no row has a finite deadline.
    pub fn next_deletion_time(&self) -> Result<Option<i64>> {
        let deadline = self
            .conn
            .prepare_cached(
                "SELECT updated_at + time_to_live + time_before_deletion AS deadline
                   FROM cache_metadata
                  WHERE time_to_live IS NOT NULL
                    AND time_before_deletion IS NOT NULL
                  ORDER BY deadline ASC
                  LIMIT 1",
            )?
            .query_row([], |row| row.get(0))
            .optional()?;
        Ok(deadline)
    }

    // == Take Deletable Keys ==
    /// Transactionally removes every row whose deletion deadline has passed
    /// (`deletion_time <= now`) and returns the removed keys, so the caller
    /// can delete the matching payloads.
    pub fn take_deletable_keys(&mut self, now: i64) -> Result<Vec<String>> {
        let tx = self.conn.transaction()?;

        let keys = tx
            .prepare(
                "SELECT key
                   FROM cache_metadata
                  WHERE time_to_live IS NOT NULL
                    AND time_before_deletion IS NOT NULL
                    AND updated_at + time_to_live + time_before_deletion <= :now",
            )?
            .query_map(named_params! { ":now": now }, |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        tx.execute(
            "DELETE FROM cache_metadata
              WHERE time_to_live IS NOT NULL
                AND time_before_deletion IS NOT NULL
                AND updated_at + time_to_live + time_before_deletion <= :now",
            named_params! { ":now": now },
        )?;

        tx.commit()?;
        Ok(keys)
    }

    // == Optimize ==
    /// Runs the close-time analysis pass recommended for long-lived databases.
    pub fn optimize(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA analysis_limit = 400;
             PRAGMA optimize;",
        )?;
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store(dir: &tempfile::TempDir) -> MetadataStore {
        MetadataStore::open(dir.path().join("metadata.db")).unwrap()
    }

    fn metadata(updated_at: i64, ttl: Option<i64>, grace: Option<i64>) -> ItemMetadata {
        ItemMetadata {
            updated_at,
            time_to_live: ttl,
            time_before_deletion: grace,
        }
    }

    #[test]
    fn test_migrations_are_idempotent_across_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.db");

        let store = MetadataStore::open(&path).unwrap();
        store.set("key", &metadata(1, Some(2), Some(3))).unwrap();
        drop(store);

        // Reopening must not re-run migrations over existing data
        let store = MetadataStore::open(&path).unwrap();
        assert_eq!(store.get("key").unwrap(), Some(metadata(1, Some(2), Some(3))));
    }

    #[test]
    fn test_set_and_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let meta = metadata(1000, Some(500), None);
        store.set("key", &meta).unwrap();
        assert_eq!(store.get("key").unwrap(), Some(meta));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_set_replaces_all_fields() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.set("key", &metadata(1000, Some(500), Some(100))).unwrap();
        store.set("key", &metadata(2000, None, None)).unwrap();

        assert_eq!(store.get("key").unwrap(), Some(metadata(2000, None, None)));
    }

    #[test]
    fn test_exists_and_delete() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.set("key", &metadata(1, Some(1), Some(1))).unwrap();
        assert!(store.exists("key").unwrap());

        store.delete("key").unwrap();
        assert!(!store.exists("key").unwrap());

        // Deleting an absent key is not an error
        store.delete("key").unwrap();
    }

    #[test]
    fn test_keys_are_sorted() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.set("banana", &metadata(1, None, None)).unwrap();
        store.set("apple", &metadata(1, None, None)).unwrap();

        assert_eq!(store.keys().unwrap(), vec!["apple", "banana"]);
    }

    #[test]
    fn test_next_deletion_time_picks_minimum() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.set("late", &metadata(1000, Some(500), Some(500))).unwrap();
        store.set("early", &metadata(1000, Some(100), Some(100))).unwrap();
        store.set("immortal", &metadata(1000, None, None)).unwrap();

        assert_eq!(store.next_deletion_time().unwrap(), Some(1200));
    }

    #[test]
    fn test_next_deletion_time_ignores_unbounded_rows() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.set("immortal", &metadata(1000, None, Some(0))).unwrap();
        store.set("undeletable", &metadata(1000, Some(100), None)).unwrap();

        assert_eq!(store.next_deletion_time().unwrap(), None);
    }

    #[test]
    fn test_take_deletable_keys_at_boundary() {
        let dir = tempdir().unwrap();
        let mut store = open_store(&dir);

        store.set("due", &metadata(1000, Some(100), Some(100))).unwrap();
        store.set("later", &metadata(1000, Some(100), Some(5000))).unwrap();
        store.set("undeletable", &metadata(0, Some(0), None)).unwrap();

        // Deadline of "due" is exactly 1200; <= makes it deletable at 1200
        let keys = store.take_deletable_keys(1200).unwrap();
        assert_eq!(keys, vec!["due"]);

        assert!(!store.exists("due").unwrap());
        assert!(store.exists("later").unwrap());
        assert!(store.exists("undeletable").unwrap());
    }

    #[test]
    fn test_clear_removes_everything() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.set("a", &metadata(1, Some(1), Some(1))).unwrap();
        store.set("b", &metadata(2, None, None)).unwrap();
        store.clear().unwrap();

        assert!(store.keys().unwrap().is_empty());
        assert_eq!(store.next_deletion_time().unwrap(), None);
    }
}
