//! Storage layer for aipsync.
//!
//! This module provides `SQLite`-based persistent storage for the downloaded
//! publication: one ordered table per category plus a metadata table that
//! holds the version marker and the time of the last completed sync.

pub mod migrations;
pub mod ordered;
pub mod schema;
pub mod version;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{Category, CategoryRecord, VersionDescriptor};

pub use ordered::OrderedStore;
pub use version::{MemoryVersionStore, VersionStore};

/// Metadata key of the last completed sync time.
const LAST_SYNCED_KEY: &str = "last_synced_at";

/// Storage engine for the local copy of the publication.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Write-ahead journal; one connection serves every reader and writer.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure every table exists and the schema is current.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation or migration fails.
    pub fn initialize(&self) -> Result<()> {
        migrations::initialize_schema(&self.conn)
    }

    /// The ordered store of record type `R`.
    #[must_use]
    pub const fn store<R: CategoryRecord>(&self) -> OrderedStore<'_, R> {
        OrderedStore::new(&self.conn)
    }

    /// Number of records held for a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self, category: Category) -> Result<usize> {
        ordered::count_table(&self.conn, category)
    }

    /// Empty every category in a single transaction.
    ///
    /// The version marker is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is
    /// cleared in that case.
    pub fn clear_all(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for category in Category::ALL {
            ordered::clear_table(&tx, category)?;
        }
        tx.commit()?;
        debug!("Cleared all categories");
        Ok(())
    }

    /// Time of the last completed sync, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = self.get_metadata(LAST_SYNCED_KEY)?;
        Ok(raw.and_then(|value| match DateTime::parse_from_rfc3339(&value) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => {
                warn!("Ignoring unreadable sync time '{}': {}", value, e);
                None
            }
        }))
    }

    /// Record the time a sync completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_synced(&self, at: DateTime<Utc>) -> Result<()> {
        self.set_metadata(LAST_SYNCED_KEY, &at.to_rfc3339())
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let mut counts = BTreeMap::new();
        for category in Category::ALL {
            counts.insert(category, self.count(category)?);
        }

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            counts,
            version: VersionStore::load(self)?,
            last_synced_at: self.last_synced_at()?,
            db_size_bytes,
        })
    }

    pub(crate) fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub(crate) fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            (key, value),
        )?;
        Ok(())
    }

    pub(crate) fn delete_metadata(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM metadata WHERE key = ?1", [key])?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Records held per category.
    pub counts: BTreeMap<Category, usize>,
    /// The committed version marker.
    pub version: Option<VersionDescriptor>,
    /// When the last sync completed.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

impl StorageStats {
    /// Total number of records across all categories.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AdRecord, ChartEntry, NotamRecord};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_open_in_memory() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_initialize_is_repeatable() {
        let storage = create_test_storage();
        storage.initialize().unwrap();
        storage.initialize().unwrap();
    }

    #[test]
    fn test_clear_all_keeps_version_marker() {
        let storage = create_test_storage();
        storage
            .store::<AdRecord>()
            .write(&[ChartEntry::named("AD 2").with_icao("ZBAA").into()])
            .unwrap();
        storage
            .store::<NotamRecord>()
            .write(&[NotamRecord::new("A", "a.pdf")])
            .unwrap();
        storage
            .save(&VersionDescriptor::new("AIP", "2510", 1))
            .unwrap();

        storage.clear_all().unwrap();

        for category in Category::ALL {
            assert_eq!(storage.count(category).unwrap(), 0);
        }
        assert!(VersionStore::load(&storage).unwrap().is_some());
    }

    #[test]
    fn test_last_synced_round_trip() {
        let storage = create_test_storage();
        assert!(storage.last_synced_at().unwrap().is_none());

        let now = Utc::now();
        storage.mark_synced(now).unwrap();
        let stored = storage.last_synced_at().unwrap().unwrap();
        assert_eq!(stored.timestamp(), now.timestamp());
    }

    #[test]
    fn test_last_synced_unreadable_is_none() {
        let storage = create_test_storage();
        storage.set_metadata(LAST_SYNCED_KEY, "yesterday").unwrap();
        assert!(storage.last_synced_at().unwrap().is_none());
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.counts.len(), 6);
        assert_eq!(stats.total_records(), 0);
        assert!(stats.version.is_none());
        assert!(stats.last_synced_at.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let storage = create_test_storage();
        storage
            .store::<NotamRecord>()
            .write(&[NotamRecord::new("A", "a.pdf"), NotamRecord::new("B", "b.pdf")])
            .unwrap();
        storage
            .save(&VersionDescriptor::new("AIP", "2510", 4))
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.counts[&Category::Notam], 2);
        assert_eq!(stats.total_records(), 2);
        assert_eq!(stats.version.map(|v| v.version_id), Some(4));
    }

    #[test]
    fn test_stats_serialize() {
        let stats = create_test_storage().stats().unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["counts"]["notam"], 0);
    }

    #[test]
    fn test_open_file_based() {
        let db_path =
            std::env::temp_dir().join(format!("aipsync_test_{}.db", std::process::id()));

        {
            let storage = Storage::open(&db_path).unwrap();
            storage
                .store::<NotamRecord>()
                .write(&[NotamRecord::new("A", "a.pdf")])
                .unwrap();
            assert_eq!(storage.path(), db_path);
            assert!(storage.stats().unwrap().db_size_bytes > 0);
        }

        // Reopening sees the committed data.
        let storage = Storage::open(&db_path).unwrap();
        assert_eq!(storage.count(Category::Notam).unwrap(), 1);

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("aipsync_test_{}_dirs", std::process::id()));
        let nested_path = root.join("nested/aip.db");
        let _ = std::fs::remove_dir_all(&root);

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        let _ = std::fs::remove_dir_all(&root);
    }
}
