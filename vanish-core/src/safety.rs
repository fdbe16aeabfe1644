use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::walk::Totals;
use crate::{Result, VanishError};

/// 100 MiB
pub const DEFAULT_LARGE_SIZE_LIMIT: u64 = 100 * 1024 * 1024;
pub const DEFAULT_LARGE_COUNT_LIMIT: u64 = 1000;

/// Rules deciding which deletions need an explicit yes from the user.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    protected_paths: Vec<PathBuf>,
    confirm_patterns: Vec<Pattern>,
    /// Byte size above which an entry counts as large
    pub large_size_limit: u64,
    /// Descendant count above which a directory counts as large
    pub large_count_limit: u64,
    /// Ask for confirmation whenever an entry is large
    pub confirm_on_large: bool,
}

/// Classification of a single target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verdict {
    pub protected: bool,
    pub large: bool,
    pub needs_confirm: bool,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            protected_paths: Vec::new(),
            confirm_patterns: Vec::new(),
            large_size_limit: DEFAULT_LARGE_SIZE_LIMIT,
            large_count_limit: DEFAULT_LARGE_COUNT_LIMIT,
            confirm_on_large: true,
        }
    }
}

impl SafetyPolicy {
    /// Build a policy from absolute protected paths and base-name globs.
    pub fn new<S: AsRef<str>>(protected_paths: Vec<PathBuf>, confirm_patterns: &[S]) -> Result<Self> {
        let confirm_patterns = confirm_patterns
            .iter()
            .map(|raw| {
                let raw = raw.as_ref();
                Pattern::new(raw).map_err(|e| VanishError::InvalidPattern {
                    pattern: raw.to_string(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            protected_paths,
            confirm_patterns,
            ..Self::default()
        })
    }

    pub fn with_large_limits(mut self, size: u64, count: u64) -> Self {
        self.large_size_limit = size;
        self.large_count_limit = count;
        self
    }

    pub fn with_confirm_on_large(mut self, confirm_on_large: bool) -> Self {
        self.confirm_on_large = confirm_on_large;
        self
    }

    pub fn protected_paths(&self) -> &[PathBuf] {
        &self.protected_paths
    }

    /// Equal to or nested under a protected path, compared component-wise
    /// so that `/home2` is not under `/home`. A filesystem root only
    /// protects itself.
    pub fn is_protected(&self, path: &Path) -> bool {
        self.protected_paths.iter().any(|p| {
            if p.parent().is_none() {
                path == p
            } else {
                path.starts_with(p)
            }
        })
    }

    /// Match the base name against the confirmation globs.
    pub fn matches_confirm_pattern(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.confirm_patterns.iter().any(|p| p.matches(name))
    }

    pub fn is_large(&self, is_directory: bool, totals: Totals) -> bool {
        totals.size > self.large_size_limit
            || (is_directory && totals.count > self.large_count_limit)
    }

    /// Classify an absolute path using already measured totals.
    pub fn classify(&self, path: &Path, is_directory: bool, totals: Totals) -> Verdict {
        let protected = self.is_protected(path);
        let large = self.is_large(is_directory, totals);
        let needs_confirm = protected
            || (self.confirm_on_large && large)
            || self.matches_confirm_pattern(path);

        Verdict {
            protected,
            large,
            needs_confirm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SafetyPolicy {
        SafetyPolicy::new(
            vec![PathBuf::from("/home"), PathBuf::from("/etc")],
            &["*.env", "*.pem", "config.toml"],
        )
        .unwrap()
        .with_large_limits(1000, 10)
    }

    #[test]
    fn test_protected_prefix_is_component_wise() {
        let policy = policy();
        assert!(policy.is_protected(Path::new("/home")));
        assert!(policy.is_protected(Path::new("/home/alice/notes.txt")));
        assert!(!policy.is_protected(Path::new("/home2/alice")));
        assert!(!policy.is_protected(Path::new("/tmp/home")));
    }

    #[test]
    fn test_root_protects_only_itself() {
        let policy = SafetyPolicy::new(vec![PathBuf::from("/")], &[] as &[&str]).unwrap();
        assert!(policy.is_protected(Path::new("/")));
        assert!(!policy.is_protected(Path::new("/tmp/a.txt")));
    }

    #[test]
    fn test_confirm_patterns_match_base_name() {
        let policy = policy();
        assert!(policy.matches_confirm_pattern(Path::new("/srv/app/.env")));
        assert!(policy.matches_confirm_pattern(Path::new("/srv/app/prod.env")));
        assert!(policy.matches_confirm_pattern(Path::new("/srv/config.toml")));
        assert!(!policy.matches_confirm_pattern(Path::new("/srv/env/readme.md")));
    }

    #[test]
    fn test_large_by_size_or_count() {
        let policy = policy();
        assert!(policy.is_large(false, Totals { size: 1001, count: 0 }));
        assert!(!policy.is_large(false, Totals { size: 1000, count: 0 }));
        assert!(policy.is_large(true, Totals { size: 1, count: 11 }));
        // Count only matters for directories
        assert!(!policy.is_large(false, Totals { size: 1, count: 11 }));
    }

    #[test]
    fn test_classify_combines_rules() {
        let policy = policy();

        let plain = policy.classify(Path::new("/tmp/a.txt"), false, Totals { size: 10, count: 0 });
        assert_eq!(plain, Verdict::default());

        let protected = policy.classify(Path::new("/etc/hosts"), false, Totals::default());
        assert!(protected.protected && protected.needs_confirm);

        let large = policy.classify(Path::new("/tmp/big"), true, Totals { size: 5, count: 50 });
        assert!(large.large && large.needs_confirm && !large.protected);

        let secret = policy.classify(Path::new("/tmp/key.pem"), false, Totals::default());
        assert!(secret.needs_confirm && !secret.large);
    }

    #[test]
    fn test_large_without_confirm_on_large() {
        let policy = policy().with_confirm_on_large(false);
        let verdict = policy.classify(Path::new("/tmp/big"), false, Totals { size: 5000, count: 0 });
        assert!(verdict.large);
        assert!(!verdict.needs_confirm);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = SafetyPolicy::new(Vec::new(), &["[unclosed"]).unwrap_err();
        assert!(matches!(err, VanishError::InvalidPattern { .. }));
    }
}
