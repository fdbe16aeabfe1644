use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Schema version stamped on every index this crate writes.
pub const INDEX_VERSION: &str = "1.0";

/// One item held in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    pub original_path: PathBuf,
    #[serde(rename = "delete_date")]
    pub delete_time: DateTime<Utc>,
    pub cache_path: PathBuf,
    pub is_directory: bool,
    /// Descendant entries, directories only
    #[serde(default, skip_serializing_if = "is_zero")]
    pub file_count: u64,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "is_protected", default, skip_serializing_if = "is_false")]
    pub protected: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_path_as_none"
    )]
    pub backup_path: Option<PathBuf>,
}

impl CacheEntry {
    /// Base name of the original path, used when building cache names.
    pub fn display_name(&self) -> String {
        self.original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.original_path.to_string_lossy().into_owned())
    }
}

/// The whole ledger as stored in `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<CacheEntry>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub updated: DateTime<Utc>,
}

impl Index {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            items: Vec::new(),
            version: INDEX_VERSION.to_string(),
            created: now,
            updated: now,
        }
    }

    /// Fill in header fields older writers left empty.
    pub(crate) fn repair_header(&mut self, now: DateTime<Utc>) {
        if self.version.is_empty() {
            self.version = INDEX_VERSION.to_string();
        }
        if self.created.timestamp() <= 0 {
            self.created = now;
        }
    }

    pub fn find(&self, id: &str) -> Option<&CacheEntry> {
        self.items.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CacheEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CacheEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<PathBuf>::deserialize(deserializer)?;
    Ok(raw.filter(|p| !p.as_os_str().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> CacheEntry {
        CacheEntry {
            id: "1700000000000000000".to_string(),
            original_path: PathBuf::from("/tmp/a.txt"),
            delete_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            cache_path: PathBuf::from("/c/1700000000000000000-2024-03-01-12-00-00-a.txt"),
            is_directory: false,
            file_count: 0,
            size_bytes: 10,
            protected: false,
            backup_path: None,
        }
    }

    #[test]
    fn test_entry_wire_names() {
        let json = serde_json::to_value(entry()).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("delete_date"));
        assert_eq!(obj["size"], 10);
        // Zero / false / empty are omitted
        assert!(!obj.contains_key("file_count"));
        assert!(!obj.contains_key("is_protected"));
        assert!(!obj.contains_key("backup_path"));
    }

    #[test]
    fn test_entry_optional_fields_written_when_set() {
        let mut e = entry();
        e.is_directory = true;
        e.file_count = 3;
        e.protected = true;
        e.backup_path = Some(PathBuf::from("/c/x.backup"));

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["file_count"], 3);
        assert_eq!(json["is_protected"], true);
        assert_eq!(json["backup_path"], "/c/x.backup");
    }

    #[test]
    fn test_index_accepts_null_items_and_offsets() {
        let raw = r#"{
            "items": null,
            "version": "",
            "created": "0001-01-01T00:00:00Z",
            "updated": "2024-03-01T14:00:00+02:00"
        }"#;
        let mut index: Index = serde_json::from_str(raw).unwrap();
        assert!(index.items.is_empty());
        assert_eq!(
            index.updated,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );

        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        index.repair_header(now);
        assert_eq!(index.version, INDEX_VERSION);
        assert_eq!(index.created, now);
    }

    #[test]
    fn test_empty_backup_path_reads_as_none() {
        let raw = r#"{
            "id": "1",
            "original_path": "/tmp/a",
            "delete_date": "2024-03-01T12:00:00.123456789+01:00",
            "cache_path": "/c/1-a",
            "is_directory": false,
            "size": 0,
            "backup_path": ""
        }"#;
        let e: CacheEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(e.backup_path, None);
        assert_eq!(e.file_count, 0);
        assert!(!e.protected);
    }
}
