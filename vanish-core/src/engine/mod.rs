//! Move-to-cache, restore and retention over one cache directory.

mod executor;
mod matching;
pub mod query;
mod target;
pub mod workflow;

pub use executor::{Executor, WorkerMessage};
pub use matching::{RestoreMatching, TieBreak, pattern_matches};
pub use query::{CacheStats, ExpiryStatus};
pub use target::FileTarget;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, Utc};

use crate::audit::{AuditRecord, AuditSink, Operation};
use crate::index::{CacheEntry, IndexStore, LOCK_FILE};
use crate::paths;
use crate::relocate::{self, Strategy};
use crate::safety::SafetyPolicy;
use crate::{Result, VanishError};

pub const DEFAULT_RETENTION_DAYS: u32 = 10;
pub const BACKUP_SUFFIX: &str = ".backup";

/// Everything the engine needs, already resolved to absolute paths.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_dir: PathBuf,
    pub retention_days: u32,
    pub policy: SafetyPolicy,
    /// Skip confirmation when no target needs it
    pub auto_confirm: bool,
    /// Keep a second copy of protected items next to the cached one
    pub backup_important: bool,
    pub restore_matching: RestoreMatching,
}

impl EngineConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            policy: SafetyPolicy::default(),
            auto_confirm: false,
            backup_important: false,
            restore_matching: RestoreMatching::default(),
        }
    }
}

pub struct CacheEngine {
    config: EngineConfig,
    store: IndexStore,
    audit: Box<dyn AuditSink>,
    strategy: Strategy,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("config", &self.config)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl CacheEngine {
    pub fn new(config: EngineConfig, audit: impl AuditSink + 'static) -> Self {
        Self {
            store: IndexStore::new(&config.cache_dir),
            config,
            audit: Box::new(audit),
            strategy: Strategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Resolve delete targets against the working directory and classify them.
    pub fn inspect_targets(&self, paths: &[PathBuf]) -> Vec<FileTarget> {
        paths
            .iter()
            .map(|raw| match paths::absolutize_target(raw) {
                Ok(abs) => FileTarget::inspect(&abs, &self.config.policy),
                Err(err) => {
                    tracing::warn!(path = %raw.display(), error = %err, "cannot resolve target");
                    FileTarget::missing(raw)
                }
            })
            .collect()
    }

    /// Index entries selected by `patterns`, see [`RestoreMatching`].
    pub fn find_restore_candidates(&self, patterns: &[String]) -> Result<Vec<CacheEntry>> {
        self.match_restore(patterns).map(|(entries, _)| entries)
    }

    /// Restore candidates plus the patterns that matched nothing, both taken
    /// from a single read of the index.
    pub fn match_restore(&self, patterns: &[String]) -> Result<(Vec<CacheEntry>, Vec<String>)> {
        let index = self.store.load()?;
        let entries = matching::select(&index.items, patterns, self.config.restore_matching);
        let unmatched = matching::unmatched(&index.items, patterns)
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok((entries, unmatched))
    }

    /// Move one inspected target into the cache and record it.
    pub fn move_to_cache(&self, target: &FileTarget) -> Result<CacheEntry> {
        let result = self.move_to_cache_inner(target);
        match &result {
            Ok(entry) => self
                .audit
                .record(AuditRecord::for_entry(Operation::Delete, entry)),
            Err(err) => self
                .audit
                .record(AuditRecord::failure(Operation::DeleteFail, &target.path, err)),
        }
        result
    }

    fn move_to_cache_inner(&self, target: &FileTarget) -> Result<CacheEntry> {
        if !target.exists || fs::symlink_metadata(&target.path).is_err() {
            return Err(VanishError::PathNotFound(target.path.clone()));
        }
        if self.overlaps_cache(&target.path) {
            return Err(VanishError::CacheOverlap(target.path.clone()));
        }

        let cache_dir = self.cache_dir();
        fs::create_dir_all(cache_dir).map_err(|e| VanishError::io(cache_dir, e))?;

        let now = Utc::now();
        let id = next_id(now).to_string();
        let cache_path = cache_dir.join(cache_name(&id, now.with_timezone(&Local), &target.name()));

        relocate::move_entry_with(&target.path, &cache_path, self.strategy)?;

        let backup_path = if self.config.backup_important && target.verdict.protected {
            self.make_backup(&cache_path)
        } else {
            None
        };

        let entry = CacheEntry {
            id,
            original_path: target.path.clone(),
            delete_time: now,
            cache_path,
            is_directory: target.is_directory,
            file_count: target.file_count(),
            size_bytes: target.size(),
            protected: target.verdict.protected,
            backup_path,
        };

        if let Err(err) = self.store.append(entry.clone()) {
            // Without a ledger entry the content would be unreachable
            self.undo_move(&entry);
            return Err(err);
        }

        tracing::info!(
            path = %entry.original_path.display(),
            cache = %entry.cache_path.display(),
            size = entry.size_bytes,
            "moved to cache"
        );
        Ok(entry)
    }

    /// Equal to, inside, or an ancestor of the cache directory.
    fn overlaps_cache(&self, path: &Path) -> bool {
        let cache = paths::normalize(self.cache_dir());
        if overlaps(&paths::normalize(path), &cache) {
            return true;
        }
        // A symlinked parent can hide the overlap from a lexical check
        match (fs::canonicalize(&cache), resolve_parent(path)) {
            (Ok(cache), Some(path)) => overlaps(&path, &cache),
            _ => false,
        }
    }

    fn make_backup(&self, cache_path: &Path) -> Option<PathBuf> {
        let mut raw = cache_path.as_os_str().to_owned();
        raw.push(BACKUP_SUFFIX);
        let backup = PathBuf::from(raw);

        match relocate::copy_entry(cache_path, &backup) {
            Ok(()) => Some(backup),
            Err(err) => {
                tracing::warn!(path = %cache_path.display(), error = %err, "backup failed");
                if let Err(cleanup) = relocate::remove_entry(&backup) {
                    tracing::debug!(path = %backup.display(), error = %cleanup, "partial backup left behind");
                }
                None
            }
        }
    }

    fn undo_move(&self, entry: &CacheEntry) {
        if let Err(err) = relocate::move_entry_with(&entry.cache_path, &entry.original_path, self.strategy) {
            tracing::error!(
                path = %entry.original_path.display(),
                cache = %entry.cache_path.display(),
                error = %err,
                "could not move content back after index failure"
            );
        }
        remove_backup(entry);
    }

    /// Move a cached entry back to its original path.
    pub fn restore(&self, entry: &CacheEntry) -> Result<()> {
        let result = self.restore_inner(entry);
        match &result {
            Ok(()) => self
                .audit
                .record(AuditRecord::for_entry(Operation::Restore, entry)),
            Err(err) => self.audit.record(AuditRecord::failure(
                Operation::RestoreFail,
                &entry.original_path,
                err,
            )),
        }
        result
    }

    fn restore_inner(&self, entry: &CacheEntry) -> Result<()> {
        if fs::symlink_metadata(&entry.cache_path).is_err() {
            return Err(VanishError::PathNotFound(entry.cache_path.clone()));
        }
        if fs::symlink_metadata(&entry.original_path).is_ok() {
            return Err(VanishError::Collision(entry.original_path.clone()));
        }
        if let Some(parent) = entry.original_path.parent() {
            fs::create_dir_all(parent).map_err(|e| VanishError::io(parent, e))?;
        }

        relocate::move_entry_with(&entry.cache_path, &entry.original_path, self.strategy)?;

        if let Err(err) = self.store.remove(&entry.id) {
            if let Err(back) =
                relocate::move_entry_with(&entry.original_path, &entry.cache_path, self.strategy)
            {
                tracing::error!(
                    path = %entry.original_path.display(),
                    error = %back,
                    "could not return restored content to cache after index failure"
                );
            }
            return Err(err);
        }

        remove_backup(entry);
        tracing::info!(path = %entry.original_path.display(), "restored");
        Ok(())
    }

    /// Drop every entry past the configured retention.
    pub fn cleanup_expired(&self) -> Result<usize> {
        self.remove_expired(self.config.retention_days, Operation::Cleanup)
    }

    /// Drop every entry deleted more than `days` days ago.
    pub fn purge(&self, days: u32) -> Result<usize> {
        self.remove_expired(days, Operation::Purge)
    }

    fn remove_expired(&self, days: u32, operation: Operation) -> Result<usize> {
        match query::cutoff(Utc::now(), days) {
            Some(cutoff) => self.remove_older_than(cutoff, operation),
            None => {
                tracing::debug!(days, operation = %operation, "window exceeds the calendar, nothing expires");
                Ok(0)
            }
        }
    }

    fn remove_older_than(&self, cutoff: DateTime<Utc>, operation: Operation) -> Result<usize> {
        let removed = self.store.update(|index| {
            let mut removed = Vec::new();
            let mut kept = Vec::with_capacity(index.items.len());
            for entry in index.items.drain(..) {
                if entry.delete_time >= cutoff {
                    kept.push(entry);
                    continue;
                }
                match relocate::remove_entry(&entry.cache_path) {
                    Ok(()) => {
                        remove_backup(&entry);
                        removed.push(entry);
                    }
                    Err(err) => {
                        tracing::warn!(
                            path = %entry.cache_path.display(),
                            error = %err,
                            "expired entry could not be removed, keeping it"
                        );
                        kept.push(entry);
                    }
                }
            }
            index.items = kept;
            Ok(removed)
        })?;

        for entry in &removed {
            self.audit.record(AuditRecord::for_entry(operation, entry));
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), operation = %operation, "expired entries removed");
        }
        Ok(removed.len())
    }

    /// Empty the cache directory and reset the index, ignoring retention.
    ///
    /// The index is reset even when some content could not be removed,
    /// leaving orphans rather than entries without content.
    pub fn clear_all(&self) -> Result<()> {
        let cache_dir = self.cache_dir();
        let _lock = self.store.lock()?;

        let mut first_err = None;
        match fs::read_dir(cache_dir) {
            Ok(entries) => {
                for dir_entry in entries.flatten() {
                    if dir_entry.file_name() == LOCK_FILE {
                        continue;
                    }
                    if let Err(err) = relocate::remove_entry(&dir_entry.path()) {
                        tracing::warn!(error = %err, "could not remove cache content");
                        first_err.get_or_insert(err);
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(VanishError::io(cache_dir, err)),
        }

        self.store.reset_locked()?;
        self.audit
            .record(AuditRecord::info(Operation::ClearAll, "Cache cleared"));

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every entry, newest deletion first.
    pub fn list(&self) -> Result<Vec<CacheEntry>> {
        let mut items = self.store.load()?.items;
        query::sort_newest_first(&mut items);
        Ok(items)
    }

    /// Entries whose original path or id matches `pattern`, newest first.
    pub fn info(&self, pattern: &str) -> Result<Vec<CacheEntry>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|e| pattern_matches(e, pattern))
            .collect())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let index = self.store.load()?;
        Ok(query::stats(
            &index.items,
            self.config.retention_days,
            Utc::now(),
        ))
    }

    pub fn is_expired(&self, entry: &CacheEntry) -> bool {
        query::is_expired(entry, self.config.retention_days, Utc::now())
    }

    pub fn days_left(&self, entry: &CacheEntry) -> i64 {
        query::days_left(entry, self.config.retention_days, Utc::now())
    }
}

fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Canonical parent joined with the base name, so a symlink target itself
/// is not followed.
fn resolve_parent(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = fs::canonicalize(path.parent()?).ok()?;
    Some(parent.join(name))
}

fn remove_backup(entry: &CacheEntry) {
    if let Some(backup) = &entry.backup_path
        && let Err(err) = relocate::remove_entry(backup)
    {
        tracing::warn!(path = %backup.display(), error = %err, "could not remove backup");
    }
}

/// `<id>-<local YYYY-MM-DD-HH-MM-SS>-<basename>`
pub fn cache_name(id: &str, at: DateTime<Local>, base_name: &str) -> String {
    format!("{id}-{}-{base_name}", at.format("%Y-%m-%d-%H-%M-%S"))
}

/// Nanosecond timestamp, strictly increasing within the process.
fn next_id(now: DateTime<Utc>) -> i64 {
    static LAST_ID: AtomicI64 = AtomicI64::new(0);

    let candidate = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000));
    let previous = LAST_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(candidate.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    candidate.max(previous + 1)
}
