use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::index::CacheEntry;

/// Which entry wins when several share one original path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Only the most recently deleted entry is restored
    #[default]
    Newest,
    /// Every entry is queued; all but the first restored one collide
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreMatching {
    /// Queue an entry once even when several patterns match it
    pub dedupe: bool,
    pub tie_break: TieBreak,
}

impl Default for RestoreMatching {
    fn default() -> Self {
        Self {
            dedupe: true,
            tie_break: TieBreak::Newest,
        }
    }
}

/// Case-insensitive substring match on the original path, or exact id match.
pub fn pattern_matches(entry: &CacheEntry, pattern: &str) -> bool {
    if entry.id == pattern {
        return true;
    }
    entry
        .original_path
        .to_string_lossy()
        .to_lowercase()
        .contains(&pattern.to_lowercase())
}

/// Select restore candidates from `items`, in pattern-then-index order.
///
/// Blank patterns are ignored.
pub fn select(items: &[CacheEntry], patterns: &[String], rules: RestoreMatching) -> Vec<CacheEntry> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for pattern in patterns.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        for entry in items.iter().filter(|e| pattern_matches(e, pattern)) {
            if rules.dedupe && !seen.insert(entry.id.as_str()) {
                continue;
            }
            selected.push(entry.clone());
        }
    }

    if rules.tie_break == TieBreak::Newest {
        let mut newest: HashMap<PathBuf, (DateTime<Utc>, String)> = HashMap::new();
        for entry in &selected {
            let slot = newest
                .entry(entry.original_path.clone())
                .or_insert_with(|| (entry.delete_time, entry.id.clone()));
            if entry.delete_time > slot.0 {
                *slot = (entry.delete_time, entry.id.clone());
            }
        }
        selected.retain(|e| newest.get(&e.original_path).is_some_and(|(_, id)| *id == e.id));
    }

    selected
}

/// Patterns that select nothing, for per-pattern not-found reporting.
pub fn unmatched<'a>(items: &[CacheEntry], patterns: &'a [String]) -> Vec<&'a str> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .filter(|p| !items.iter().any(|e| pattern_matches(e, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, path: &str, hour: u32) -> CacheEntry {
        CacheEntry {
            id: id.to_string(),
            original_path: PathBuf::from(path),
            delete_time: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            cache_path: PathBuf::from(format!("/cache/{id}")),
            is_directory: false,
            file_count: 0,
            size_bytes: 0,
            protected: false,
            backup_path: None,
        }
    }

    fn ids(entries: &[CacheEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    fn patterns(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let e = entry("1", "/home/u/Report.PDF", 1);
        assert!(pattern_matches(&e, "report.pdf"));
        assert!(pattern_matches(&e, "U/REP"));
        assert!(!pattern_matches(&e, "invoice"));
    }

    #[test]
    fn test_id_selects_exactly() {
        let items = vec![entry("17", "/a/one", 1), entry("171", "/a/two", 2)];
        let chosen = select(&items, &patterns(&["171"]), RestoreMatching::default());
        assert_eq!(ids(&chosen), vec!["171"]);
    }

    #[test]
    fn test_dedupe_across_patterns() {
        let items = vec![entry("1", "/tmp/log.txt", 1), entry("2", "/tmp/data.csv", 2)];
        let raw = patterns(&["log", "txt", "data"]);

        let deduped = select(&items, &raw, RestoreMatching::default());
        assert_eq!(ids(&deduped), vec!["1", "2"]);

        let all = select(
            &items,
            &raw,
            RestoreMatching {
                dedupe: false,
                tie_break: TieBreak::All,
            },
        );
        assert_eq!(ids(&all), vec!["1", "1", "2"]);
    }

    #[test]
    fn test_newest_wins_per_original_path() {
        let items = vec![
            entry("1", "/tmp/a.txt", 1),
            entry("2", "/tmp/a.txt", 5),
            entry("3", "/tmp/b.txt", 3),
        ];

        let newest = select(&items, &patterns(&["tmp"]), RestoreMatching::default());
        assert_eq!(ids(&newest), vec!["2", "3"]);

        let all = select(
            &items,
            &patterns(&["tmp"]),
            RestoreMatching {
                dedupe: true,
                tie_break: TieBreak::All,
            },
        );
        assert_eq!(ids(&all), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_blank_patterns_select_nothing() {
        let items = vec![entry("1", "/tmp/a.txt", 1)];
        assert!(select(&items, &patterns(&["", "  "]), RestoreMatching::default()).is_empty());
    }

    #[test]
    fn test_unmatched_patterns() {
        let items = vec![entry("1", "/tmp/a.txt", 1)];
        let raw = patterns(&["a.txt", "zzz", ""]);
        assert_eq!(unmatched(&items, &raw), vec!["zzz"]);
    }
}
