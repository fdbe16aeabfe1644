use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use fs2::FileExt;

use crate::{Result, VanishError};

/// Exclusive lock over the index, shared by every process using the same
/// cache directory. Released on drop.
///
/// Not reentrant: taking it twice on one thread deadlocks.
#[derive(Debug)]
pub struct IndexLock {
    file: File,
    path: PathBuf,
    // flock alone does not order threads of one process sharing a path
    _guard: MutexGuard<'static, ()>,
}

impl IndexLock {
    /// Block until the lock at `path` is held, creating the file if needed.
    pub fn acquire(path: &Path) -> Result<Self> {
        let guard = process_lock_for(path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let lock_err = |source| VanishError::Lock {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(lock_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(lock_err)?;
        FileExt::lock_exclusive(&file).map_err(lock_err)?;

        tracing::trace!(path = %path.display(), "index lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::debug!(path = %self.path.display(), error = %err, "failed to release index lock");
        }
    }
}

fn process_lock_for(path: &Path) -> &'static Mutex<()> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));

    let mut map = locks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = map.get(path) {
        return existing;
    }

    let mutex: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    map.insert(path.to_path_buf(), mutex);
    mutex
}
