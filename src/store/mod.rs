//! Persistent stores layered over [`KeyValueStorage`](crate::storage::KeyValueStorage).
//!
//! - `cache`: language-table snapshots with timestamp, expiry and version
//! - `version`: last synchronized manifest version per project
//!
//! Both are best-effort: reads that fail are misses and writes that fail are
//! logged and dropped.

mod cache;
mod version;

pub use cache::{CacheEntry, CacheStore, LanguageTable};
pub use version::VersionStore;
