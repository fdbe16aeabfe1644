//! The JSON ledger of cached items.

mod entry;
mod lock;
mod store;

pub use entry::{CacheEntry, INDEX_VERSION, Index};
pub use lock::IndexLock;
pub use store::{INDEX_FILE, IndexStore, LOCK_FILE};
