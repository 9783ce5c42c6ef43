use moka::sync::Cache;
use std::path::PathBuf;
use std::sync::Arc;
use chrono::Local;
use tracing::{debug, warn};

use crate::models::{LogRecord, LogTable};
use crate::storage::{LoadedTable, LogStore, StorageError, StorageResult, TableVersion};

#[derive(Clone)]
struct CachedTable {
    version: TableVersion,
    loaded: Arc<LoadedTable>,
}

/// Read cache for loaded tables, owned by one session.
///
/// Entries are keyed by table path and checked against the file's
/// modification time and size on every read. Appends made through the cache
/// drop the entry immediately.
pub struct TableCache {
    entries: Cache<PathBuf, CachedTable>,
}

impl TableCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    /// Return the cached table if the file is unchanged, else reload it
    pub fn load(&self, store: &LogStore) -> StorageResult<Arc<LoadedTable>> {
        let version = store.version()?;
        let key = store.path().to_path_buf();

        if let Some(cached) = self.entries.get(&key) {
            if cached.version == version {
                debug!(path = %key.display(), "Log table cache hit");
                return Ok(cached.loaded);
            }
        }

        let loaded = Arc::new(store.load()?);
        self.entries.insert(
            key,
            CachedTable {
                version,
                loaded: Arc::clone(&loaded),
            },
        );
        Ok(loaded)
    }

    /// Like `load`, but a table with missing columns reads as empty.
    ///
    /// A missing table is still `NotFound` so callers can tell "nothing
    /// generated yet" apart from an unusable file. The empty result is not
    /// cached; a repaired file is picked up on the next call.
    pub fn load_lenient(&self, store: &LogStore) -> StorageResult<Arc<LoadedTable>> {
        match self.load(store) {
            Err(e @ StorageError::SchemaMismatch { .. }) => {
                warn!(path = %store.path().display(), "{e}; continuing with an empty table");
                Ok(Arc::new(LoadedTable {
                    table: LogTable::default(),
                    loaded_at: Local::now().naive_local(),
                }))
            }
            other => other,
        }
    }

    /// Append through the store and invalidate the table's entry
    pub fn append(&self, store: &LogStore, records: &[LogRecord]) -> StorageResult<usize> {
        let written = store.append(records);
        self.invalidate(store);
        written
    }

    pub fn invalidate(&self, store: &LogStore) {
        self.entries.invalidate(store.path());
    }

    pub fn contains(&self, store: &LogStore) -> bool {
        self.entries.contains_key(store.path())
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;
    use tempfile::TempDir;

    #[test]
    fn test_cache_returns_same_table_until_append() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path().join("logs.csv"));
        let cache = TableCache::default();

        cache
            .append(&store, &[record("2024-01-01 00:00:00", [1, 1, 1, 1], 0.0)])
            .unwrap();

        let first = cache.load(&store).unwrap();
        let second = cache.load(&store).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache
            .append(&store, &[record("2024-01-01 00:00:05", [1, 1, 1, 1], 5.0)])
            .unwrap();
        assert!(!cache.contains(&store));

        let third = cache.load(&store).unwrap();
        assert_eq!(third.table.len(), 2);
    }

    #[test]
    fn test_cache_detects_external_append() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path().join("logs.csv"));
        let cache = TableCache::default();

        store
            .append(&[record("2024-01-01 00:00:00", [1, 1, 1, 1], 0.0)])
            .unwrap();
        assert_eq!(cache.load(&store).unwrap().table.len(), 1);

        // Bypass the cache; the size change must force a reload
        store
            .append(&[record("2024-01-01 00:00:02", [1, 1, 1, 1], 2.0)])
            .unwrap();
        assert_eq!(cache.load(&store).unwrap().table.len(), 2);
    }

    #[test]
    fn test_load_lenient_empties_renamed_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.csv");
        std::fs::write(
            &path,
            "When,IP Address,Method,Endpoint,Status,Country,Sports Activity,Device,Browser,Duration\n",
        )
        .unwrap();
        let store = LogStore::new(path.clone());
        let cache = TableCache::default();

        assert!(matches!(
            cache.load(&store),
            Err(StorageError::SchemaMismatch { .. })
        ));
        let loaded = cache.load_lenient(&store).unwrap();
        assert!(loaded.table.is_empty());
        assert!(!cache.contains(&store));
    }

    #[test]
    fn test_load_lenient_keeps_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path().join("missing.csv"));
        let cache = TableCache::default();

        assert!(matches!(
            cache.load_lenient(&store),
            Err(StorageError::NotFound(_))
        ));
    }
}
