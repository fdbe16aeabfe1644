//! Read-only views over the index.

use chrono::{DateTime, Duration, Utc};

use crate::index::CacheEntry;

/// Status shown next to each listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Expired,
    /// Two days or less left
    Expiring,
    Ok,
}

impl ExpiryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "EXPIRED",
            ExpiryStatus::Expiring => "EXPIRING",
            ExpiryStatus::Ok => "OK",
        }
    }
}

pub fn retention(days: u32) -> Duration {
    Duration::hours(i64::from(days) * 24)
}

/// Oldest deletion time still inside the window, or `None` when the window
/// reaches past the earliest representable time and nothing can expire.
pub fn cutoff(now: DateTime<Utc>, retention_days: u32) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(retention(retention_days))
}

/// `None` when the entry never expires.
pub fn expires_at(entry: &CacheEntry, retention_days: u32) -> Option<DateTime<Utc>> {
    entry
        .delete_time
        .checked_add_signed(retention(retention_days))
}

/// Strictly older than the retention window.
pub fn is_expired(entry: &CacheEntry, retention_days: u32, now: DateTime<Utc>) -> bool {
    cutoff(now, retention_days).is_some_and(|cutoff| entry.delete_time < cutoff)
}

/// Whole days until expiry, truncated toward zero (23.9 h is 0 days).
/// Saturates at `i64::MAX` for entries that never expire.
pub fn days_left(entry: &CacheEntry, retention_days: u32, now: DateTime<Utc>) -> i64 {
    match expires_at(entry, retention_days) {
        Some(at) => at.signed_duration_since(now).num_hours() / 24,
        None => i64::MAX,
    }
}

pub fn expiry_status(entry: &CacheEntry, retention_days: u32, now: DateTime<Utc>) -> ExpiryStatus {
    match days_left(entry, retention_days, now) {
        d if d <= 0 => ExpiryStatus::Expired,
        d if d <= 2 => ExpiryStatus::Expiring,
        _ => ExpiryStatus::Ok,
    }
}

/// Newest deletion first. Stable for equal timestamps.
pub fn sort_newest_first(entries: &mut [CacheEntry]) {
    entries.sort_by(|a, b| b.delete_time.cmp(&a.delete_time));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_items: usize,
    pub files: usize,
    pub directories: usize,
    pub total_size: u64,
    pub retention_days: u32,
    pub expired: usize,
}

pub fn stats(entries: &[CacheEntry], retention_days: u32, now: DateTime<Utc>) -> CacheStats {
    let mut stats = CacheStats {
        total_items: entries.len(),
        retention_days,
        ..Default::default()
    };
    for entry in entries {
        if entry.is_directory {
            stats.directories += 1;
        } else {
            stats.files += 1;
        }
        stats.total_size += entry.size_bytes;
        if is_expired(entry, retention_days, now) {
            stats.expired += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn entry_at(delete_time: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            id: "1".to_string(),
            original_path: PathBuf::from("/tmp/a"),
            delete_time,
            cache_path: PathBuf::from("/c/1-a"),
            is_directory: false,
            file_count: 0,
            size_bytes: 7,
            protected: false,
            backup_path: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_expiry_boundary() {
        let window = retention(10);
        let past = entry_at(now() - window - Duration::seconds(1));
        let edge = entry_at(now() - window);

        assert!(is_expired(&past, 10, now()));
        assert!(!is_expired(&edge, 10, now()));
    }

    #[test]
    fn test_days_left_truncates() {
        // 23.9 hours remaining
        let e = entry_at(now() - retention(10) + Duration::minutes(23 * 60 + 54));
        assert_eq!(days_left(&e, 10, now()), 0);
        assert_eq!(expiry_status(&e, 10, now()), ExpiryStatus::Expired);

        let fresh = entry_at(now());
        assert_eq!(days_left(&fresh, 10, now()), 10);
        assert_eq!(expiry_status(&fresh, 10, now()), ExpiryStatus::Ok);

        let soon = entry_at(now() - Duration::days(8));
        assert_eq!(days_left(&soon, 10, now()), 2);
        assert_eq!(expiry_status(&soon, 10, now()), ExpiryStatus::Expiring);
    }

    #[test]
    fn test_negative_days_left() {
        let old = entry_at(now() - Duration::days(15));
        assert_eq!(days_left(&old, 10, now()), -5);
        assert_eq!(expiry_status(&old, 10, now()).as_str(), "EXPIRED");
    }

    #[test]
    fn test_huge_retention_never_expires() {
        let ancient = entry_at(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(cutoff(now(), u32::MAX), None);
        assert_eq!(expires_at(&ancient, u32::MAX), None);
        assert!(!is_expired(&ancient, u32::MAX, now()));
        assert_eq!(days_left(&ancient, u32::MAX, now()), i64::MAX);
        assert_eq!(expiry_status(&ancient, u32::MAX, now()), ExpiryStatus::Ok);

        let s = stats(&[ancient], 100_000_000, now());
        assert_eq!(s.expired, 0);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut entries = vec![
            entry_at(now() - Duration::days(3)),
            entry_at(now()),
            entry_at(now() - Duration::days(1)),
        ];
        sort_newest_first(&mut entries);
        let times: Vec<_> = entries.iter().map(|e| e.delete_time).collect();
        assert!(times.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_stats_counts() {
        let mut dir = entry_at(now() - Duration::days(20));
        dir.is_directory = true;
        dir.size_bytes = 100;
        let entries = vec![entry_at(now()), dir];

        let s = stats(&entries, 10, now());
        assert_eq!(
            s,
            CacheStats {
                total_items: 2,
                files: 1,
                directories: 1,
                total_size: 107,
                retention_days: 10,
                expired: 1,
            }
        );
    }
}
