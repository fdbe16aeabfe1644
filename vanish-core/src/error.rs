use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VanishError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Destination already exists: {0}")]
    Collision(PathBuf),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot access index {path}: {source}")]
    IndexIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Index {path} is corrupt: {source}")]
    IndexDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode index: {0}")]
    IndexEncode(#[source] serde_json::Error),

    #[error("Could not lock index {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Refusing to move the cache into itself: {0}")]
    CacheOverlap(PathBuf),

    #[error("Invalid confirmation pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Operation was cancelled")]
    Cancelled,
}

impl VanishError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn index_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::IndexIo {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the ledger itself. These abort a whole batch,
    /// every other error only fails the item it happened on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::IndexIo { .. } | Self::IndexDecode { .. } | Self::IndexEncode(_) | Self::Lock { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::PathNotFound(_) => true,
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, VanishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let ledger = VanishError::index_io("/c/index.json", io::Error::other("disk full"));
        assert!(ledger.is_fatal());

        let item = VanishError::io("/tmp/a", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!item.is_fatal());
        assert!(!VanishError::Collision(PathBuf::from("/tmp/a")).is_fatal());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(VanishError::PathNotFound(PathBuf::from("/nope")).is_not_found());
        assert!(VanishError::io("/nope", io::Error::from(io::ErrorKind::NotFound)).is_not_found());
        assert!(!VanishError::Collision(PathBuf::from("/x")).is_not_found());
    }

    #[test]
    fn test_message_includes_path_and_os_error() {
        let err = VanishError::io("/tmp/locked", io::Error::other("permission denied"));
        let text = err.to_string();
        assert!(text.contains("/tmp/locked"));
        assert!(text.contains("permission denied"));
    }
}
