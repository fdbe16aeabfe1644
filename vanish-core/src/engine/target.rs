use std::fs;
use std::path::{Path, PathBuf};

use crate::safety::{SafetyPolicy, Verdict};
use crate::walk::{self, Totals};

/// A path proposed for deletion, measured and classified once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    /// Absolute path
    pub path: PathBuf,
    pub exists: bool,
    pub is_directory: bool,
    pub totals: Totals,
    pub verdict: Verdict,
}

impl FileTarget {
    /// Stat and measure `path`, which must already be absolute.
    ///
    /// A symlink is a target of its own and is never resolved.
    pub fn inspect(path: &Path, policy: &SafetyPolicy) -> Self {
        let Ok(meta) = fs::symlink_metadata(path) else {
            return Self::missing(path);
        };

        let is_directory = meta.is_dir();
        let totals = if is_directory {
            walk::measure(path)
        } else {
            Totals {
                size: meta.len(),
                count: 0,
            }
        };

        Self {
            path: path.to_path_buf(),
            exists: true,
            is_directory,
            totals,
            verdict: policy.classify(path, is_directory, totals),
        }
    }

    pub fn missing(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            exists: false,
            is_directory: false,
            totals: Totals::default(),
            verdict: Verdict::default(),
        }
    }

    pub fn size(&self) -> u64 {
        self.totals.size
    }

    pub fn file_count(&self) -> u64 {
        self.totals.count
    }

    pub fn needs_confirm(&self) -> bool {
        self.verdict.needs_confirm
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_inspect_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("notes.txt");
        fs::write(&file, "0123456789").unwrap();

        let target = FileTarget::inspect(&file, &SafetyPolicy::default());
        assert!(target.exists);
        assert!(!target.is_directory);
        assert_eq!(target.size(), 10);
        assert_eq!(target.file_count(), 0);
        assert!(!target.needs_confirm());
        assert_eq!(target.name(), "notes.txt");
    }

    #[test]
    fn test_inspect_directory_and_policy() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("build");
        fs::create_dir(&dir).unwrap();
        for i in 0..3 {
            fs::write(dir.join(format!("{i}.o")), "ab").unwrap();
        }

        let policy = SafetyPolicy::default().with_large_limits(u64::MAX, 2);
        let target = FileTarget::inspect(&dir, &policy);
        assert!(target.is_directory);
        assert_eq!(target.file_count(), 3);
        assert_eq!(target.size(), 6);
        assert!(target.verdict.large);
        assert!(target.needs_confirm());
    }

    #[test]
    fn test_inspect_missing() {
        let temp = TempDir::new().unwrap();
        let target = FileTarget::inspect(&temp.path().join("gone"), &SafetyPolicy::default());
        assert!(!target.exists);
        assert!(!target.needs_confirm());
    }
}
