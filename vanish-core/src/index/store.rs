use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::entry::{CacheEntry, Index};
use super::lock::IndexLock;
use crate::{Result, VanishError};

pub const INDEX_FILE: &str = "index.json";
pub const LOCK_FILE: &str = ".index.lock";

/// Reads and writes `<cache_dir>/index.json`.
///
/// `load` never takes the lock: the ledger is only ever replaced by rename,
/// so a reader sees either the old or the new file. Every read-modify-write
/// goes through [`IndexStore::update`].
#[derive(Debug, Clone)]
pub struct IndexStore {
    cache_dir: PathBuf,
    index_path: PathBuf,
    lock_path: PathBuf,
}

impl IndexStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        Self {
            index_path: cache_dir.join(INDEX_FILE),
            lock_path: cache_dir.join(LOCK_FILE),
            cache_dir,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Take the cross-process lock. Do not call while already holding it.
    pub fn lock(&self) -> Result<IndexLock> {
        IndexLock::acquire(&self.lock_path)
    }

    /// Load the ledger, or a fresh empty one if the file does not exist.
    pub fn load(&self) -> Result<Index> {
        let data = match fs::read(&self.index_path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Index::new(Utc::now()));
            }
            Err(err) => return Err(VanishError::index_io(&self.index_path, err)),
        };

        let mut index: Index =
            serde_json::from_slice(&data).map_err(|source| VanishError::IndexDecode {
                path: self.index_path.clone(),
                source,
            })?;
        index.repair_header(Utc::now());
        Ok(index)
    }

    /// Write the whole ledger. The caller must hold the lock.
    pub fn save(&self, index: &mut Index) -> Result<()> {
        index.updated = Utc::now();

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| VanishError::index_io(&self.cache_dir, e))?;

        let data = serde_json::to_vec_pretty(index).map_err(VanishError::IndexEncode)?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.index_path.with_extension("tmp");
        let write = || -> io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, &self.index_path)
        };

        if let Err(err) = write() {
            let _ = fs::remove_file(&temp_path);
            return Err(VanishError::index_io(&self.index_path, err));
        }

        tracing::debug!(
            path = %self.index_path.display(),
            items = index.items.len(),
            "index saved"
        );
        Ok(())
    }

    /// Lock, load, mutate and save. Nothing is written when `f` fails.
    pub fn update<T>(&self, f: impl FnOnce(&mut Index) -> Result<T>) -> Result<T> {
        let _lock = self.lock()?;
        let mut index = self.load()?;
        let out = f(&mut index)?;
        self.save(&mut index)?;
        Ok(out)
    }

    pub fn append(&self, entry: CacheEntry) -> Result<()> {
        self.update(|index| {
            index.items.push(entry);
            Ok(())
        })
    }

    /// Drop the entry with `id`, returning it if it was present.
    pub fn remove(&self, id: &str) -> Result<Option<CacheEntry>> {
        self.update(|index| {
            let pos = index.items.iter().position(|e| e.id == id);
            Ok(pos.map(|i| index.items.remove(i)))
        })
    }

    /// Replace the ledger with an empty one. The caller must hold the lock.
    pub fn reset_locked(&self) -> Result<()> {
        let mut index = Index::new(Utc::now());
        self.save(&mut index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use tempfile::TempDir;

    fn entry(id: &str, path: &str, at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            id: id.to_string(),
            original_path: PathBuf::from(path),
            delete_time: at,
            cache_path: PathBuf::from(format!("/cache/{id}")),
            is_directory: false,
            file_count: 0,
            size_bytes: 1,
            protected: false,
            backup_path: None,
        }
    }

    #[test]
    fn test_load_missing_gives_empty_index() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("cache"));

        let index = store.load().unwrap();
        assert!(index.is_empty());
        assert_eq!(index.version, "1.0");
        // Loading alone never creates anything
        assert!(!store.index_path().exists());
    }

    #[test]
    fn test_append_remove_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        store.append(entry("1", "/a", at)).unwrap();
        store.append(entry("2", "/b", at)).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);

        let removed = store.remove("1").unwrap();
        assert_eq!(removed.map(|e| e.original_path), Some(PathBuf::from("/a")));
        assert!(store.remove("1").unwrap().is_none());

        let index = store.load().unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.find("2").is_some());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        store
            .append(entry("1", "/a", Utc::now()))
            .unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&INDEX_FILE.to_string()));
        assert!(!names.iter().any(|n| n.ends_with(".tmp")));
    }

    #[test]
    fn test_save_stamps_updated() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        let mut index = Index::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());

        store.save(&mut index).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.created, index.created);
        assert!(loaded.updated > loaded.created);
    }

    #[test]
    fn test_corrupt_index_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        fs::write(store.index_path(), "{ not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, VanishError::IndexDecode { .. }));
        assert!(err.is_fatal());
        // Mutations refuse to run on top of it
        assert!(store.append(entry("1", "/a", Utc::now())).is_err());
        assert_eq!(fs::read_to_string(store.index_path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());
        store.append(entry("1", "/a", Utc::now())).unwrap();

        let result: Result<()> = store.update(|index| {
            index.items.clear();
            Err(VanishError::Cancelled)
        });
        assert!(result.is_err());
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .append(entry(&i.to_string(), "/x", Utc::now()))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.load().unwrap().len(), 8);
    }
}
