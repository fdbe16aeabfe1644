use std::fs;
use std::path::Path;

use jwalk::WalkDir;

/// Size and descendant count of a filesystem entry, computed in one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Bytes of every non-directory entry (symlinks count their own length)
    pub size: u64,
    /// Number of descendants, zero for files and empty directories
    pub count: u64,
}

/// Measure a file or directory tree.
///
/// Symlinks are never followed, neither at the root nor below it. Entries
/// that cannot be read are skipped rather than failing the measurement.
pub fn measure(path: &Path) -> Totals {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(_) => return Totals::default(),
    };

    if !metadata.is_dir() {
        return Totals {
            size: metadata.len(),
            count: 0,
        };
    }

    let walker = WalkDir::new(path)
        .skip_hidden(false)
        .follow_links(false)
        .sort(false);

    let mut totals = Totals::default();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %err,
                    "skipping unreadable entry while measuring"
                );
                continue;
            }
        };

        // Root is reported at depth 0
        if entry.depth == 0 {
            continue;
        }

        totals.count += 1;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            totals.size += meta.len();
        }
    }

    totals
}
