use crate::error::StorageError;
use crate::i18n::Language;
use crate::storage::KeyValueStorage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key to localized string for one (project, language) pair.
pub type LanguageTable = HashMap<String, String>;

/// Persisted snapshot of a language table.
///
/// Serialized as `{ "data", "timestamp", "expireSeconds", "version"? }` with the
/// timestamp in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub data: LanguageTable,
    pub timestamp: i64,
    pub expire_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CacheEntry {
    /// `expire_seconds == 0` never expires; otherwise the entry is valid while
    /// no more than `expire_seconds` have elapsed since it was stored.
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        if self.expire_seconds == 0 {
            return true;
        }
        let elapsed_ms = now_millis.saturating_sub(self.timestamp);
        elapsed_ms <= (self.expire_seconds as i64).saturating_mul(1000)
    }
}

/// Language-table snapshots keyed by `loc_{project}_{language}`.
///
/// Every failure is absorbed here: unreadable or malformed entries behave as
/// misses and failed writes are only logged.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn cache_key(project: &str, language: Language) -> String {
        format!("loc_{}_{}", project, language.code())
    }

    pub fn get(&self, project: &str, language: Language, ignore_expiry: bool) -> Option<CacheEntry> {
        self.get_at(project, language, ignore_expiry, Utc::now().timestamp_millis())
    }

    /// Same as [`CacheStore::get`] with an explicit clock reading.
    pub fn get_at(
        &self,
        project: &str,
        language: Language,
        ignore_expiry: bool,
        now_millis: i64,
    ) -> Option<CacheEntry> {
        let key = Self::cache_key(project, language);

        let raw = match self.storage.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring malformed cache entry {}: {}", key, e);
                return None;
            }
        };

        if !ignore_expiry && !entry.is_valid_at(now_millis) {
            debug!(
                "Cache expired: {} ({}s old, limit {}s)",
                key,
                now_millis.saturating_sub(entry.timestamp) / 1000,
                entry.expire_seconds
            );
            return None;
        }

        Some(entry)
    }

    pub fn put(
        &self,
        project: &str,
        language: Language,
        data: &LanguageTable,
        expire_seconds: u64,
        version: Option<&str>,
    ) {
        let key = Self::cache_key(project, language);
        let entry = CacheEntry {
            data: data.clone(),
            timestamp: Utc::now().timestamp_millis(),
            expire_seconds,
            version: version.map(str::to_string),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(source) => {
                warn!("{}", StorageError::Serialize { key, source });
                return;
            }
        };

        match self.storage.set_item(&key, &raw) {
            Ok(()) => match version {
                Some(v) => debug!("Cache saved (v{}): {}", v, key),
                None => debug!("Cache saved: {}", key),
            },
            Err(e) => warn!("Cache write failed for {}: {}", key, e),
        }
    }

    /// Remove one entry, or every supported language of the project.
    pub fn clear(&self, project: &str, language: Option<Language>) {
        let languages = match language {
            Some(language) => vec![language],
            None => Language::all(),
        };

        for language in languages {
            let key = Self::cache_key(project, language);
            if let Err(e) = self.storage.remove_item(&key) {
                warn!("Cache clear failed for {}: {}", key, e);
            }
        }
    }
}
