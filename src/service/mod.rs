//! Localization service: the in-memory tables plus the loaders that fill them.
//!
//! One `LocalizationService` owns everything a running game needs: the
//! runtime state (current language, tables, initialization flag), the cache
//! and version stores, the remote source and its metrics. Consumers read text
//! through it; only its loaders replace tables.
//!
//! # Lifecycle
//!
//! 1. [`ServiceHost::activate`] builds the service (at most one active per host)
//! 2. [`LocalizationService::resolve_all`] loads the active language, marks the
//!    service initialized and loads the rest in a background task
//! 3. [`LocalizationService::destroy`] clears state and frees the host slot
//!
//! In-flight loads are never aborted; a destroyed service only stops starting
//! new background loads.

mod host;
mod loader;

pub use host::ServiceHost;
pub use loader::BulkLoad;

use crate::error::ServiceError;
use crate::i18n::{text, Language};
use crate::metrics::LoadMetrics;
use crate::storage::KeyValueStorage;
use crate::store::{CacheStore, LanguageTable, VersionStore};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Storage key of the player's chosen language.
pub const LANGUAGE_PREFERENCE_KEY: &str = "game_language";

/// Default cache lifetime in seconds (0 disables expiry).
pub const DEFAULT_CACHE_EXPIRE_SECONDS: u64 = 3600;

/// Per-project behavior of the loaders.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub project_id: String,
    pub default_language: Language,
    /// Consult and fill the cache on the simple path
    pub use_cache: bool,
    /// Serve a stale in-memory table when every other source failed
    pub use_fallback: bool,
    pub cache_expire_seconds: u64,
}

impl ServiceSettings {
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            default_language: Language::default_language(),
            use_cache: true,
            use_fallback: true,
            cache_expire_seconds: DEFAULT_CACHE_EXPIRE_SECONDS,
        }
    }

    pub fn with_default_language(mut self, language: Language) -> Self {
        self.default_language = language;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_fallback(mut self, use_fallback: bool) -> Self {
        self.use_fallback = use_fallback;
        self
    }

    pub fn with_cache_expire_seconds(mut self, seconds: u64) -> Self {
        self.cache_expire_seconds = seconds;
        self
    }
}

/// Where a load result's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Cdn,
    Cache,
    Local,
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadSource::Cdn => "cdn",
            LoadSource::Cache => "cache",
            LoadSource::Local => "local",
        })
    }
}

/// Outcome of one load. Every loader path ends in one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    pub success: bool,
    pub source: LoadSource,
    pub language: Language,
    pub key_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl LoadResult {
    fn loaded(source: LoadSource, language: Language, key_count: usize, version: Option<String>) -> Self {
        Self {
            success: true,
            source,
            language,
            key_count,
            version,
        }
    }

    fn failed(language: Language) -> Self {
        Self {
            success: false,
            source: LoadSource::Local,
            language,
            key_count: 0,
            version: None,
        }
    }
}

impl fmt::Display for LoadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.language.name(), self.language)?;
        if !self.success {
            return f.write_str(": no data available");
        }
        write!(f, ": {} ({} keys)", self.source, self.key_count)?;
        if let Some(version) = &self.version {
            write!(f, " v{}", version)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct RuntimeState {
    current_language: Language,
    tables: HashMap<Language, LanguageTable>,
    initialized: bool,
}

/// Localization tables for one project, backed by the CDN and a local cache.
pub struct LocalizationService<R> {
    settings: ServiceSettings,
    remote: R,
    storage: Arc<dyn KeyValueStorage>,
    cache: CacheStore,
    versions: VersionStore,
    state: RwLock<RuntimeState>,
    metrics: LoadMetrics,
    destroyed: AtomicBool,
    lease: Mutex<Option<host::HostLease>>,
}

impl<R> LocalizationService<R> {
    /// Build a service without registering it with a host.
    ///
    /// The current language is the saved preference when it names a supported
    /// language, otherwise the configured default.
    pub fn new(
        settings: ServiceSettings,
        remote: R,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self, ServiceError> {
        if settings.project_id.trim().is_empty() {
            return Err(ServiceError::EmptyProjectId);
        }

        let saved = match storage.get_item(LANGUAGE_PREFERENCE_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Could not read saved language: {}", e);
                None
            }
        };
        let current_language = saved
            .and_then(|code| Language::from_code(&code).ok())
            .unwrap_or(settings.default_language);

        debug!(
            "Localization service for {} starting in {}",
            settings.project_id, current_language
        );

        Ok(Self {
            cache: CacheStore::new(storage.clone()),
            versions: VersionStore::new(storage.clone()),
            settings,
            remote,
            storage,
            state: RwLock::new(RuntimeState {
                current_language,
                tables: HashMap::new(),
                initialized: false,
            }),
            metrics: LoadMetrics::new(),
            destroyed: AtomicBool::new(false),
            lease: Mutex::new(None),
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RuntimeState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RuntimeState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn project_id(&self) -> &str {
        &self.settings.project_id
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &LoadMetrics {
        &self.metrics
    }

    pub fn cache_store(&self) -> &CacheStore {
        &self.cache
    }

    pub fn version_store(&self) -> &VersionStore {
        &self.versions
    }

    pub fn current_language(&self) -> Language {
        self.read_state().current_language
    }

    pub fn is_initialized(&self) -> bool {
        self.read_state().initialized
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        Language::all()
    }

    /// Languages holding a non-empty table, in registry order.
    pub fn loaded_languages(&self) -> Vec<Language> {
        let state = self.read_state();
        Language::all()
            .into_iter()
            .filter(|language| state.tables.get(language).is_some_and(|t| !t.is_empty()))
            .collect()
    }

    /// Copy of the in-memory table for a language.
    pub fn table(&self, language: Language) -> Option<LanguageTable> {
        self.read_state().tables.get(&language).cloned()
    }

    pub fn key_count(&self, language: Language) -> usize {
        self.read_state()
            .tables
            .get(&language)
            .map(|t| t.len())
            .unwrap_or(0)
    }

    /// Localized text for a key in the current language.
    ///
    /// Returns the key itself before initialization or when it is missing.
    pub fn text(&self, key: &str) -> String {
        let state = self.read_state();
        if !state.initialized {
            warn!("Localization is not initialized yet, returning key '{}'", key);
            return key.to_string();
        }

        let key = text::normalize_key(key);
        match state
            .tables
            .get(&state.current_language)
            .and_then(|table| table.get(&key))
            .filter(|value| !value.is_empty())
        {
            Some(value) => text::unescape(value),
            None => {
                debug!("Key not found in {}: {}", state.current_language, key);
                key
            }
        }
    }

    /// [`text`](Self::text) with `{0}`, `{1}`, ... replaced by `args`.
    pub fn text_with_args<T: Display>(&self, key: &str, args: &[T]) -> String {
        text::apply_args(&self.text(key), args)
    }

    /// Switch the current language and remember the choice.
    pub fn set_language(&self, language: Language) -> Result<(), ServiceError> {
        {
            let mut state = self.write_state();
            if !state.initialized {
                return Err(ServiceError::NotInitialized);
            }
            if state.current_language == language {
                return Ok(());
            }
            if !state.tables.contains_key(&language) {
                return Err(ServiceError::LanguageNotLoaded(language.code().to_string()));
            }
            state.current_language = language;
        }

        if let Err(e) = self.storage.set_item(LANGUAGE_PREFERENCE_KEY, language.code()) {
            warn!("Could not save language preference: {}", e);
        }
        info!("Language changed: {}", language);
        Ok(())
    }

    /// Merge tables key by key into memory, e.g. bundled fallback strings.
    ///
    /// Existing keys are kept unless `overwrite` is set. Unknown language codes
    /// are skipped. Returns the number of keys written.
    pub fn merge_tables(&self, data: HashMap<String, LanguageTable>, overwrite: bool) -> usize {
        let mut state = self.write_state();
        let mut written = 0;

        for (code, incoming) in data {
            let language = match Language::from_code(&code) {
                Ok(language) => language,
                Err(e) => {
                    warn!("Skipping merged table: {}", e);
                    continue;
                }
            };

            let table = state.tables.entry(language).or_default();
            for (key, value) in incoming {
                if !overwrite && table.contains_key(&key) {
                    debug!("Key already exists, keeping current value: {}", key);
                    continue;
                }
                table.insert(key, value);
                written += 1;
            }
        }

        debug!("Merged {} keys into memory", written);
        written
    }

    /// Remove persisted cache entries for one language, or for every language
    /// together with the project's version record.
    pub fn clear_cache(&self, language: Option<Language>) {
        self.cache.clear(&self.settings.project_id, language);
        if language.is_none() {
            self.versions.clear(&self.settings.project_id);
        }
        info!(
            "Cache cleared for {} ({})",
            self.settings.project_id,
            language.map(|l| l.code()).unwrap_or("all languages")
        );
    }

    /// Tear down: drop tables, clear the initialized flag, free the host slot.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        {
            let mut state = self.write_state();
            state.initialized = false;
            state.tables.clear();
        }
        let lease = self.lease.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(lease);
        info!("Localization service for {} destroyed", self.settings.project_id);
    }

    /// Replace a language's table wholesale. Returns its key count.
    fn install_table(&self, language: Language, table: LanguageTable) -> usize {
        let key_count = table.len();
        self.write_state().tables.insert(language, table);
        key_count
    }

    fn mark_initialized(&self) {
        let mut state = self.write_state();
        state.initialized = true;

        info!(
            "Localization initialized for {} (current language: {})",
            self.settings.project_id, state.current_language
        );
        for language in Language::all() {
            let key_count = state.tables.get(&language).map(|t| t.len()).unwrap_or(0);
            debug!("  - {}: {} keys", language, key_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn table(pairs: &[(&str, &str)]) -> LanguageTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn service_with(storage: Arc<MemoryStorage>) -> LocalizationService<()> {
        LocalizationService::new(ServiceSettings::new("48Test"), (), storage)
            .expect("valid settings")
    }

    fn ready_service() -> LocalizationService<()> {
        let service = service_with(Arc::new(MemoryStorage::new()));
        service.install_table(
            Language::KOREAN,
            table(&[("title", "제목"), ("multi", "첫줄\\n둘째\\s줄"), ("greet", "{0}님 {1}")]),
        );
        service.install_table(Language::ENGLISH, table(&[("title", "Title")]));
        service.mark_initialized();
        service
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_new_rejects_empty_project_id() {
        let result =
            LocalizationService::new(ServiceSettings::new("  "), (), Arc::new(MemoryStorage::new()));
        assert!(matches!(result, Err(ServiceError::EmptyProjectId)));
    }

    #[test]
    fn test_new_uses_default_language_without_preference() {
        let service = service_with(Arc::new(MemoryStorage::new()));
        assert_eq!(service.current_language(), Language::KOREAN);
        assert!(!service.is_initialized());
    }

    #[test]
    fn test_new_uses_saved_language_preference() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(LANGUAGE_PREFERENCE_KEY, "cn").unwrap();

        assert_eq!(service_with(storage).current_language(), Language::CHINESE);
    }

    #[test]
    fn test_new_ignores_unsupported_saved_language() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(LANGUAGE_PREFERENCE_KEY, "fr").unwrap();

        assert_eq!(service_with(storage).current_language(), Language::KOREAN);
    }

    // ==================== Text Tests ====================

    #[test]
    fn test_text_before_initialization_returns_key() {
        let service = service_with(Arc::new(MemoryStorage::new()));
        service.install_table(Language::KOREAN, table(&[("title", "제목")]));

        assert_eq!(service.text("@title"), "@title");
    }

    #[test]
    fn test_text_strips_marker_and_unescapes() {
        let service = ready_service();

        assert_eq!(service.text("@title"), "제목");
        assert_eq!(service.text("multi"), "첫줄\n둘째 줄");
    }

    #[test]
    fn test_text_missing_key_returns_normalized_key() {
        let service = ready_service();
        assert_eq!(service.text("@missing"), "missing");
    }

    #[test]
    fn test_text_with_args() {
        let service = ready_service();
        assert_eq!(service.text_with_args("greet", &["용사", "환영"]), "용사님 환영");
    }

    // ==================== Language Switch Tests ====================

    #[test]
    fn test_set_language_switches_and_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let service = service_with(storage.clone());
        service.install_table(Language::ENGLISH, table(&[("title", "Title")]));
        service.mark_initialized();

        service.set_language(Language::ENGLISH).unwrap();

        assert_eq!(service.current_language(), Language::ENGLISH);
        assert_eq!(service.text("title"), "Title");
        assert_eq!(
            storage.get_item(LANGUAGE_PREFERENCE_KEY).unwrap().as_deref(),
            Some("en")
        );
    }

    #[test]
    fn test_set_language_requires_initialization() {
        let service = service_with(Arc::new(MemoryStorage::new()));
        assert_eq!(
            service.set_language(Language::ENGLISH),
            Err(ServiceError::NotInitialized)
        );
    }

    #[test]
    fn test_set_language_requires_loaded_table() {
        let service = ready_service();
        assert_eq!(
            service.set_language(Language::CHINESE),
            Err(ServiceError::LanguageNotLoaded("cn".to_string()))
        );
        assert_eq!(service.current_language(), Language::KOREAN);
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_merge_tables_respects_overwrite_flag() {
        let service = ready_service();
        let mut data = HashMap::new();
        data.insert(
            "ko".to_string(),
            table(&[("title", "새 제목"), ("extra", "추가")]),
        );
        data.insert("fr".to_string(), table(&[("title", "Titre")]));

        assert_eq!(service.merge_tables(data.clone(), false), 1);
        assert_eq!(service.text("title"), "제목");
        assert_eq!(service.text("extra"), "추가");

        assert_eq!(service.merge_tables(data, true), 2);
        assert_eq!(service.text("title"), "새 제목");
    }

    #[test]
    fn test_loaded_languages_in_registry_order() {
        let service = ready_service();
        assert_eq!(
            service.loaded_languages(),
            vec![Language::KOREAN, Language::ENGLISH]
        );
    }

    // ==================== Destroy Tests ====================

    #[test]
    fn test_destroy_clears_tables_and_initialized_flag() {
        let service = ready_service();

        service.destroy();

        assert!(service.is_destroyed());
        assert!(!service.is_initialized());
        assert!(service.loaded_languages().is_empty());
        assert_eq!(service.text("title"), "title");
    }

    #[test]
    fn test_load_result_display() {
        let ok = LoadResult::loaded(LoadSource::Cdn, Language::ENGLISH, 12, Some("1.0.1".into()));
        assert_eq!(ok.to_string(), "English (en): cdn (12 keys) v1.0.1");
        assert_eq!(
            LoadResult::failed(Language::CHINESE).to_string(),
            "Chinese (cn): no data available"
        );
    }

    #[test]
    fn test_load_result_serializes_camel_case() {
        let result = LoadResult::loaded(LoadSource::Cache, Language::KOREAN, 3, None);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["source"], "cache");
        assert_eq!(json["language"], "ko");
        assert_eq!(json["keyCount"], 3);
        assert!(json.get("version").is_none());
    }
}
