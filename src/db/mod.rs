//! Ordered key-value storage.
//!
//! The index engine talks to storage only through [`KvStore`]: point lookups,
//! ordered prefix scans and atomic write batches. [`RedbStore`] is the one
//! backing implementation, a single redb table keyed by raw key bytes.
//!
//! redb read transactions are snapshots, so a prefix scan never sees part of
//! a batch that is being committed concurrently.
//!
//! # Example
//!
//! ```ignore
//! use music_indexer::db::{KvStore, RedbStore, WriteBatch};
//!
//! let store = RedbStore::open(&data_dir.join("library.redb"))?;
//! let mut batch = WriteBatch::new();
//! batch.set("album:by-id:abc", br#"{"id":"abc","name":"X"}"#.to_vec());
//! store.apply(batch)?;
//! let rows = store.scan_prefix(b"album:by-id:")?;
//! ```

use redb::backends::InMemoryBackend;
use redb::{Database, DatabaseError, TableDefinition};
use std::path::Path;

use crate::error::{Error, Result, ResultExt};

/// All records live in one table; key prefixes separate the indexes.
const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// A set of writes applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    sets: Vec<(Vec<u8>, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `key = value`. A later set of the same key in one batch wins.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.sets.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.sets.iter().map(|(k, _)| k.as_slice())
    }
}

/// Ordered byte-keyed store.
pub trait KvStore: Send + Sync {
    /// Value stored at `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Every entry whose key starts with `prefix`, ascending by key, read
    /// from one consistent snapshot.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply all writes of `batch` atomically: all become visible or none do.
    fn apply(&self, batch: WriteBatch) -> Result<()>;
}

/// [`KvStore`] on a redb database.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open the database at `path`, creating it if needed.
    ///
    /// redb locks the file exclusively; a second open while another handle
    /// is alive fails with [`Error::StoreLocked`].
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(format!("creating {}", parent.display()))?;
        }
        let db = match Database::create(path) {
            Ok(db) => db,
            Err(DatabaseError::DatabaseAlreadyOpen) => {
                return Err(Error::StoreLocked {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Self::init(db)
    }

    /// A store that lives only in memory. Used by tests.
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    // Reads fail on a table that was never created, so create it up front.
    fn init(db: Database) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(RECORDS)?;
        write_txn.commit()?;
        Ok(Self { db })
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        let value = table.get(key)?.map(|v| v.value().to_vec());
        Ok(value)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        let mut entries = Vec::new();
        for entry in table.range(prefix..)? {
            let (key, value) = entry?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.value().to_vec()));
        }
        Ok(entries)
    }

    fn apply(&self, batch: WriteBatch) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            for (key, value) in &batch.sets {
                table.insert(key.as_slice(), value.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}
