//! Loaders: the version-gated state machine and the plain cache-then-fetch path.
//!
//! Version-gated resolution of one language:
//!
//! ```text
//! START -> VERSION_CHECK -+-> (versions match, cache present) -> CACHE_HIT
//!                         +-> otherwise -> REMOTE_FETCH -> SUCCESS
//!                         |                     | failure
//!                         +-- failure ----------+--> cache (expiry ignored)
//!                                                    -> stale in-memory table
//!                                                    -> FAILURE
//! ```
//!
//! Each call issues at most one manifest request and one table request. Two
//! calls for the same language running at once are not serialized: whichever
//! finishes last owns the in-memory table and the persisted entry.

use super::{LoadResult, LoadSource, LocalizationService};
use crate::i18n::Language;
use crate::remote::RemoteSource;
use crate::retry::{with_retry, RetryConfig};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of [`LocalizationService::resolve_all`].
pub struct BulkLoad {
    /// Outcome for the active language, loaded before initialization completed
    pub active: LoadResult,
    /// Sequential loads of the remaining languages
    pub background: JoinHandle<Vec<LoadResult>>,
}

impl<R: RemoteSource> LocalizationService<R> {
    /// Version-gated load of one language.
    ///
    /// A matching manifest version proves the cached entry is fresh regardless
    /// of its age; any manifest failure skips the table request entirely.
    pub async fn resolve(&self, language: Language) -> LoadResult {
        let project = self.settings.project_id.as_str();

        self.metrics.record_version_check();
        let server_version = match self.remote.fetch_version(project).await {
            Ok(Some(version)) => version,
            Ok(None) => {
                self.metrics.record_version_check_failure();
                warn!("{} is not listed in the version manifest", project);
                return self.load_cache_or_fallback(language);
            }
            Err(e) => {
                self.metrics.record_version_check_failure();
                warn!("Version check failed ({}): {}", e.kind(), e);
                return self.load_cache_or_fallback(language);
            }
        };

        let cached_version = self.versions.get(project);
        debug!(
            "Version compare for {} - server: {}, cached: {:?}",
            language, server_version, cached_version
        );

        if cached_version.as_deref() == Some(server_version.as_str()) {
            if let Some(entry) = self.cache.get(project, language, true) {
                self.metrics.record_cache_hit();
                let key_count = self.install_table(language, entry.data);
                debug!("Cache is current for {} (v{})", language, server_version);
                return LoadResult::loaded(
                    LoadSource::Cache,
                    language,
                    key_count,
                    Some(server_version),
                );
            }
            self.metrics.record_cache_miss();
        } else {
            debug!("Version changed, fetching {} from CDN", language);
        }

        self.fetch_with_version(language, server_version).await
    }

    /// Alias of [`resolve`](Self::resolve), named after the simple path.
    pub async fn load_versioned(&self, language: Language) -> LoadResult {
        self.resolve(language).await
    }

    /// Fetch a table and record it under the manifest version it came with.
    async fn fetch_with_version(&self, language: Language, server_version: String) -> LoadResult {
        let project = self.settings.project_id.as_str();

        self.metrics.record_table_fetch();
        match self.remote.fetch_table(project, language).await {
            Ok(table) => {
                self.cache.put(
                    project,
                    language,
                    &table,
                    self.settings.cache_expire_seconds,
                    Some(&server_version),
                );
                self.versions.put(project, &server_version);
                let key_count = self.install_table(language, table);

                info!(
                    "CDN load succeeded: {} ({} keys, v{})",
                    language, key_count, server_version
                );
                LoadResult::loaded(LoadSource::Cdn, language, key_count, Some(server_version))
            }
            Err(e) => {
                self.metrics.record_table_fetch_failure();
                warn!("CDN load failed for {} ({}): {}", language, e.kind(), e);
                self.load_cache_or_fallback(language)
            }
        }
    }

    /// Network path exhausted: any cached data beats nothing.
    fn load_cache_or_fallback(&self, language: Language) -> LoadResult {
        if let Some(entry) = self
            .cache
            .get(&self.settings.project_id, language, true)
        {
            self.metrics.record_cache_hit();
            let key_count = self.install_table(language, entry.data);
            info!("Using cached table for {} ({} keys)", language, key_count);
            return LoadResult::loaded(LoadSource::Cache, language, key_count, None);
        }

        self.metrics.record_cache_miss();
        self.local_fallback(language)
    }

    /// Keep whatever table is already in memory, if fallback is allowed.
    fn local_fallback(&self, language: Language) -> LoadResult {
        if self.settings.use_fallback {
            let key_count = self.key_count(language);
            if key_count > 0 {
                self.metrics.record_local_fallback();
                info!("Using local fallback for {} ({} keys)", language, key_count);
                return LoadResult::loaded(LoadSource::Local, language, key_count, None);
            }
        }

        self.metrics.record_failed_load();
        warn!("No localization data available for {}", language);
        LoadResult::failed(language)
    }

    /// Cache-then-fetch load that ignores the version manifest.
    ///
    /// With `use_cache` an unexpired entry is served without touching the
    /// network, fresh tables are cached without a version, and on failure an
    /// expired entry is still preferred over the in-memory fallback.
    pub async fn load_simple(&self, language: Language) -> LoadResult {
        let project = self.settings.project_id.as_str();
        let use_cache = self.settings.use_cache;

        if use_cache {
            if let Some(entry) = self.cache.get(project, language, false) {
                self.metrics.record_cache_hit();
                let key_count = self.install_table(language, entry.data);
                debug!("Loaded {} from cache", language);
                return LoadResult::loaded(LoadSource::Cache, language, key_count, None);
            }
            self.metrics.record_cache_miss();
        }

        self.metrics.record_table_fetch();
        match self.remote.fetch_table(project, language).await {
            Ok(table) => {
                if use_cache {
                    self.cache.put(
                        project,
                        language,
                        &table,
                        self.settings.cache_expire_seconds,
                        None,
                    );
                }
                let key_count = self.install_table(language, table);
                info!("CDN load succeeded: {} ({} keys)", language, key_count);
                LoadResult::loaded(LoadSource::Cdn, language, key_count, None)
            }
            Err(e) => {
                self.metrics.record_table_fetch_failure();
                warn!("CDN load failed for {} ({}): {}", language, e.kind(), e);

                if use_cache {
                    if let Some(entry) = self.cache.get(project, language, true) {
                        self.metrics.record_cache_hit();
                        let key_count = self.install_table(language, entry.data);
                        info!("Using expired cache for {} ({} keys)", language, key_count);
                        return LoadResult::loaded(LoadSource::Cache, language, key_count, None);
                    }
                    self.metrics.record_cache_miss();
                }

                self.local_fallback(language)
            }
        }
    }

    /// [`load_simple`](Self::load_simple) for every supported language in order.
    pub async fn load_all_simple(&self) -> Vec<LoadResult> {
        let mut results = Vec::new();
        for language in Language::all() {
            results.push(self.load_simple(language).await);
        }
        results
    }

    /// Drop cached entries and reload through the simple path.
    pub async fn refresh(&self, language: Option<Language>) -> Vec<LoadResult> {
        self.clear_cache(language);
        match language {
            Some(language) => vec![self.load_simple(language).await],
            None => self.load_all_simple().await,
        }
    }

    /// Re-run [`resolve`](Self::resolve) until it succeeds or attempts run out.
    pub async fn resolve_with_retry(&self, language: Language, config: &RetryConfig) -> LoadResult {
        let outcome = with_retry(config, &format!("Load {}", language), move || async move {
            let result = self.resolve(language).await;
            if result.success {
                Ok(result)
            } else {
                Err(result)
            }
        })
        .await;

        match outcome {
            Ok(result) | Err(result) => result,
        }
    }

    /// Resolve every supported language except `active`, one after another, in
    /// registry order. Stops early once the service is destroyed.
    pub async fn resolve_remaining(&self, active: Language) -> Vec<LoadResult> {
        let mut results = Vec::new();
        for language in Language::all().into_iter().filter(|l| *l != active) {
            if self.is_destroyed() {
                debug!("Service destroyed, skipping remaining languages");
                break;
            }
            results.push(self.resolve(language).await);
        }

        info!("Background language loads finished ({} languages)", results.len());
        results
    }

    /// Simple-path counterpart of [`resolve_remaining`](Self::resolve_remaining).
    pub async fn load_remaining_simple(&self, active: Language) -> Vec<LoadResult> {
        let mut results = Vec::new();
        for language in Language::all().into_iter().filter(|l| *l != active) {
            if self.is_destroyed() {
                debug!("Service destroyed, skipping remaining languages");
                break;
            }
            results.push(self.load_simple(language).await);
        }
        results
    }

    /// Complete initialization with a result already obtained for the active
    /// language, then resolve the rest in a background task.
    pub fn finish_initialization(self: &Arc<Self>, active: LoadResult) -> BulkLoad
    where
        R: 'static,
    {
        self.mark_initialized();

        let service = Arc::clone(self);
        let language = active.language;
        let background = tokio::spawn(async move { service.resolve_remaining(language).await });

        BulkLoad { active, background }
    }

    /// Like [`initialize`](Self::initialize) but every load goes through
    /// [`load_simple`](Self::load_simple) and the manifest is never read.
    pub async fn initialize_simple(self: &Arc<Self>) -> BulkLoad
    where
        R: 'static,
    {
        let active = self.load_simple(self.current_language()).await;
        info!("Active language result: {}", active);
        self.mark_initialized();

        let service = Arc::clone(self);
        let language = active.language;
        let background =
            tokio::spawn(async move { service.load_remaining_simple(language).await });

        BulkLoad { active, background }
    }

    /// Resolve `active` first, mark the service initialized, then resolve the
    /// remaining languages sequentially in the background.
    pub async fn resolve_all(self: &Arc<Self>, active: Language) -> BulkLoad
    where
        R: 'static,
    {
        let result = self.resolve(active).await;
        info!("Active language result: {}", result);
        self.finish_initialization(result)
    }

    /// [`resolve_all`](Self::resolve_all) starting from the current language.
    pub async fn initialize(self: &Arc<Self>) -> BulkLoad
    where
        R: 'static,
    {
        let active = self.current_language();
        self.resolve_all(active).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::service::ServiceSettings;
    use crate::storage::{KeyValueStorage, MemoryStorage};
    use crate::store::{CacheEntry, LanguageTable};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const PROJECT: &str = "48Test";

    /// Remote double with canned answers and call counters.
    #[derive(Default)]
    struct FakeRemote {
        version: Mutex<Option<Result<Option<String>, ()>>>,
        tables: Mutex<HashMap<Language, LanguageTable>>,
        table_delay: Option<Duration>,
        version_calls: AtomicUsize,
        table_calls: AtomicUsize,
        table_requests: Mutex<Vec<Language>>,
    }

    impl FakeRemote {
        fn unreachable() -> Self {
            let remote = Self::default();
            *remote.version.lock().unwrap() = Some(Err(()));
            remote
        }

        fn with_version(version: &str) -> Self {
            let remote = Self::default();
            *remote.version.lock().unwrap() = Some(Ok(Some(version.to_string())));
            remote
        }

        fn serve(self, language: Language, table: LanguageTable) -> Self {
            self.tables.lock().unwrap().insert(language, table);
            self
        }

        fn table_calls(&self) -> usize {
            self.table_calls.load(Ordering::SeqCst)
        }

        fn version_calls(&self) -> usize {
            self.version_calls.load(Ordering::SeqCst)
        }
    }

    impl RemoteSource for FakeRemote {
        async fn fetch_table(
            &self,
            project: &str,
            language: Language,
        ) -> Result<LanguageTable, FetchError> {
            self.table_calls.fetch_add(1, Ordering::SeqCst);
            self.table_requests.lock().unwrap().push(language);
            if let Some(delay) = self.table_delay {
                tokio::time::sleep(delay).await;
            }
            let table = self.tables.lock().unwrap().get(&language).cloned();
            table.ok_or_else(|| FetchError::Http {
                url: format!("fake://{}/{}.json", project, language),
                status: 404,
            })
        }

        async fn fetch_version(&self, _project: &str) -> Result<Option<String>, FetchError> {
            self.version_calls.fetch_add(1, Ordering::SeqCst);
            match self.version.lock().unwrap().clone() {
                Some(Ok(version)) => Ok(version),
                _ => Err(FetchError::Timeout {
                    url: "fake://version.json".to_string(),
                    timeout_ms: 5000,
                }),
            }
        }
    }

    fn table(pairs: &[(&str, &str)]) -> LanguageTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn numbered_table(n: usize) -> LanguageTable {
        (0..n).map(|i| (format!("key{}", i), format!("value{}", i))).collect()
    }

    fn write_entry(
        storage: &MemoryStorage,
        language: Language,
        data: LanguageTable,
        age: Duration,
        expire_seconds: u64,
        version: Option<&str>,
    ) {
        let entry = CacheEntry {
            data,
            timestamp: Utc::now().timestamp_millis() - age.as_millis() as i64,
            expire_seconds,
            version: version.map(str::to_string),
        };
        storage
            .set_item(
                &format!("loc_{}_{}", PROJECT, language.code()),
                &serde_json::to_string(&entry).unwrap(),
            )
            .unwrap();
    }

    fn service(remote: FakeRemote, storage: Arc<MemoryStorage>) -> LocalizationService<FakeRemote> {
        LocalizationService::new(ServiceSettings::new(PROJECT), remote, storage).unwrap()
    }

    // ==================== Version-Gated Path ====================

    #[tokio::test]
    async fn test_matching_version_serves_expired_cache_without_fetch() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("loc_version_48Test", "1.0.0").unwrap();
        write_entry(
            &storage,
            Language::ENGLISH,
            table(&[("title", "Cached")]),
            Duration::from_secs(7200),
            3600,
            Some("1.0.0"),
        );
        let svc = service(
            FakeRemote::with_version("1.0.0").serve(Language::ENGLISH, table(&[("title", "Fresh")])),
            storage,
        );

        let result = svc.resolve(Language::ENGLISH).await;

        assert_eq!(
            result,
            LoadResult::loaded(LoadSource::Cache, Language::ENGLISH, 1, Some("1.0.0".into()))
        );
        assert_eq!(svc.remote.table_calls(), 0);
        assert_eq!(svc.table(Language::ENGLISH).unwrap()["title"], "Cached");
    }

    #[tokio::test]
    async fn test_version_mismatch_refetches_despite_valid_cache() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("loc_version_48Test", "1.0.0").unwrap();
        write_entry(
            &storage,
            Language::ENGLISH,
            table(&[("title", "Cached")]),
            Duration::from_secs(10),
            3600,
            Some("1.0.0"),
        );
        let svc = service(
            FakeRemote::with_version("1.0.1")
                .serve(Language::ENGLISH, table(&[("title", "Fresh"), ("new", "New")])),
            storage,
        );

        let result = svc.resolve(Language::ENGLISH).await;

        assert_eq!(result.source, LoadSource::Cdn);
        assert_eq!(result.key_count, 2);
        assert_eq!(result.version.as_deref(), Some("1.0.1"));
        assert_eq!(svc.remote.table_calls(), 1);
        assert_eq!(svc.table(Language::ENGLISH).unwrap()["title"], "Fresh");
    }

    #[tokio::test]
    async fn test_matching_version_without_cache_entry_fetches() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("loc_version_48Test", "1.0.0").unwrap();
        let svc = service(
            FakeRemote::with_version("1.0.0").serve(Language::KOREAN, table(&[("a", "가")])),
            storage,
        );

        let result = svc.resolve(Language::KOREAN).await;

        assert_eq!(result.source, LoadSource::Cdn);
        assert_eq!(svc.remote.table_calls(), 1);
    }

    #[tokio::test]
    async fn test_successful_fetch_updates_both_stores() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(
            FakeRemote::with_version("2.1.0").serve(Language::CHINESE, table(&[("a", "一")])),
            storage,
        );

        let result = svc.resolve(Language::CHINESE).await;
        assert!(result.success);

        let entry = svc
            .cache_store()
            .get(PROJECT, Language::CHINESE, true)
            .expect("cache written");
        assert_eq!(entry.data, table(&[("a", "一")]));
        assert_eq!(entry.version.as_deref(), Some("2.1.0"));
        assert_eq!(entry.expire_seconds, 3600);
        assert_eq!(svc.version_store().get(PROJECT).as_deref(), Some("2.1.0"));
    }

    #[tokio::test]
    async fn test_fetch_replaces_table_instead_of_merging() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(
            FakeRemote::with_version("1.0.1").serve(Language::ENGLISH, table(&[("new", "New")])),
            storage,
        );
        svc.install_table(Language::ENGLISH, table(&[("old", "Old")]));

        svc.resolve(Language::ENGLISH).await;

        assert_eq!(svc.table(Language::ENGLISH).unwrap(), table(&[("new", "New")]));
    }

    #[tokio::test]
    async fn test_version_check_failure_never_fetches_table() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(
            &storage,
            Language::ENGLISH,
            table(&[("a", "b")]),
            Duration::from_secs(1),
            3600,
            None,
        );
        let svc = service(
            FakeRemote::unreachable().serve(Language::ENGLISH, table(&[("x", "y")])),
            storage,
        );

        let result = svc.resolve(Language::ENGLISH).await;

        assert_eq!(result.source, LoadSource::Cache);
        assert_eq!(result.version, None);
        assert_eq!(svc.remote.table_calls(), 0);
        assert_eq!(svc.remote.version_calls(), 1);
    }

    #[tokio::test]
    async fn test_project_missing_from_manifest_falls_back() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = FakeRemote::default().serve(Language::ENGLISH, table(&[("x", "y")]));
        *remote.version.lock().unwrap() = Some(Ok(None));
        let svc = service(remote, storage);

        let result = svc.resolve(Language::ENGLISH).await;

        assert!(!result.success);
        assert_eq!(svc.remote.table_calls(), 0);
    }

    #[tokio::test]
    async fn test_table_failure_falls_back_to_expired_cache() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(
            &storage,
            Language::KOREAN,
            numbered_table(4),
            Duration::from_secs(86_400),
            60,
            Some("0.9.0"),
        );
        // Manifest reachable but the table 404s
        let svc = service(FakeRemote::with_version("1.0.0"), storage);

        let result = svc.resolve(Language::KOREAN).await;

        assert_eq!(
            result,
            LoadResult::loaded(LoadSource::Cache, Language::KOREAN, 4, None)
        );
        assert_eq!(svc.remote.table_calls(), 1);
        assert!(svc.version_store().get(PROJECT).is_none());
    }

    /// Backend that rejects every read and write.
    struct FailingStorage;

    impl KeyValueStorage for FailingStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, crate::error::StorageError> {
            Err(crate::error::StorageError::Unavailable("disk full".to_string()))
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), crate::error::StorageError> {
            Err(crate::error::StorageError::Unavailable("disk full".to_string()))
        }
        fn remove_item(&self, _key: &str) -> Result<(), crate::error::StorageError> {
            Err(crate::error::StorageError::Unavailable("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failing_storage_without_table_reports_failure() {
        let svc = LocalizationService::new(
            ServiceSettings::new(PROJECT),
            FakeRemote::with_version("1.0.0"),
            Arc::new(FailingStorage),
        )
        .unwrap();

        let result = svc.resolve(Language::ENGLISH).await;

        assert_eq!(result, LoadResult::failed(Language::ENGLISH));
        assert_eq!(svc.remote.version_calls(), 1);
        assert_eq!(svc.remote.table_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_storage_still_serves_fetched_table() {
        let svc = LocalizationService::new(
            ServiceSettings::new(PROJECT),
            FakeRemote::with_version("1.0.2").serve(Language::KOREAN, numbered_table(3)),
            Arc::new(FailingStorage),
        )
        .unwrap();

        let result = svc.resolve(Language::KOREAN).await;

        assert!(result.success);
        assert_eq!(result.source, LoadSource::Cdn);
        assert_eq!(result.key_count, 3);
        assert!(svc.version_store().get(PROJECT).is_none());
        assert_eq!(svc.key_count(Language::KOREAN), 3);
    }

    #[tokio::test]
    async fn test_fallback_ordering_local_then_failure() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(FakeRemote::unreachable(), storage);

        let failed = svc.resolve(Language::ENGLISH).await;
        assert_eq!(failed, LoadResult::failed(Language::ENGLISH));

        svc.install_table(Language::ENGLISH, numbered_table(10));
        let local = svc.resolve(Language::ENGLISH).await;
        assert_eq!(
            local,
            LoadResult::loaded(LoadSource::Local, Language::ENGLISH, 10, None)
        );
        assert_eq!(svc.table(Language::ENGLISH).unwrap(), numbered_table(10));
    }

    #[tokio::test]
    async fn test_local_fallback_disabled() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = LocalizationService::new(
            ServiceSettings::new(PROJECT).with_fallback(false),
            FakeRemote::unreachable(),
            storage,
        )
        .unwrap();
        svc.install_table(Language::ENGLISH, numbered_table(10));

        let result = svc.resolve(Language::ENGLISH).await;

        assert!(!result.success);
        assert_eq!(result.key_count, 0);
    }

    #[tokio::test]
    async fn test_empty_in_memory_table_is_not_a_fallback() {
        let svc = service(FakeRemote::unreachable(), Arc::new(MemoryStorage::new()));
        svc.install_table(Language::ENGLISH, LanguageTable::new());

        assert!(!svc.resolve(Language::ENGLISH).await.success);
    }

    #[tokio::test]
    async fn test_idempotent_when_unreachable_with_cache() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(
            &storage,
            Language::ENGLISH,
            numbered_table(3),
            Duration::from_secs(5),
            3600,
            Some("1.0.0"),
        );
        let svc = service(FakeRemote::unreachable(), storage.clone());
        let before = storage.get_item("loc_48Test_en").unwrap();

        let first = svc.resolve(Language::ENGLISH).await;
        let second = svc.resolve(Language::ENGLISH).await;

        assert_eq!(first, second);
        assert_eq!(storage.get_item("loc_48Test_en").unwrap(), before);
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_last_writer_wins() {
        let storage = Arc::new(MemoryStorage::new());
        let remote = FakeRemote {
            table_delay: Some(Duration::from_millis(20)),
            ..FakeRemote::with_version("3.0.0")
        }
        .serve(Language::ENGLISH, numbered_table(5));
        let svc = service(remote, storage);

        let (a, b) = tokio::join!(
            svc.resolve(Language::ENGLISH),
            svc.resolve(Language::ENGLISH)
        );

        // No serialization: both calls go to the network
        assert!(a.success && b.success);
        assert_eq!(svc.remote.table_calls(), 2);
        assert_eq!(svc.key_count(Language::ENGLISH), 5);
        assert_eq!(svc.version_store().get(PROJECT).as_deref(), Some("3.0.0"));
    }

    #[tokio::test]
    async fn test_metrics_track_the_path_taken() {
        let storage = Arc::new(MemoryStorage::new());
        let svc = service(
            FakeRemote::with_version("1.0.0").serve(Language::KOREAN, numbered_table(2)),
            storage,
        );

        svc.resolve(Language::KOREAN).await;
        svc.resolve(Language::KOREAN).await;

        let report = svc.metrics().report();
        assert_eq!(report.version_checks, 2);
        assert_eq!(report.table_fetches, 1);
        assert_eq!(report.cache_hits, 1);
    }

    // ==================== Simple Path ====================

    #[tokio::test]
    async fn test_simple_serves_valid_cache_without_network() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(
            &storage,
            Language::KOREAN,
            numbered_table(2),
            Duration::from_secs(60),
            3600,
            None,
        );
        let svc = service(FakeRemote::with_version("9.9.9"), storage);

        let result = svc.load_simple(Language::KOREAN).await;

        assert_eq!(result.source, LoadSource::Cache);
        assert_eq!(svc.remote.table_calls(), 0);
        assert_eq!(svc.remote.version_calls(), 0);
    }

    #[tokio::test]
    async fn test_simple_expired_cache_triggers_fetch_and_caches_without_version() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(
            &storage,
            Language::KOREAN,
            numbered_table(2),
            Duration::from_secs(7200),
            3600,
            None,
        );
        let svc = service(
            FakeRemote::default().serve(Language::KOREAN, numbered_table(6)),
            storage,
        );

        let result = svc.load_simple(Language::KOREAN).await;

        assert_eq!(result, LoadResult::loaded(LoadSource::Cdn, Language::KOREAN, 6, None));
        let entry = svc.cache_store().get(PROJECT, Language::KOREAN, false).unwrap();
        assert_eq!(entry.data.len(), 6);
        assert_eq!(entry.version, None);
        assert!(svc.version_store().get(PROJECT).is_none());
    }

    #[tokio::test]
    async fn test_simple_failure_uses_expired_cache() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(
            &storage,
            Language::CHINESE,
            numbered_table(3),
            Duration::from_secs(7200),
            3600,
            None,
        );
        let svc = service(FakeRemote::default(), storage);

        let result = svc.load_simple(Language::CHINESE).await;

        assert_eq!(result, LoadResult::loaded(LoadSource::Cache, Language::CHINESE, 3, None));
        assert_eq!(svc.remote.table_calls(), 1);
    }

    #[tokio::test]
    async fn test_simple_without_cache_skips_store() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(
            &storage,
            Language::ENGLISH,
            numbered_table(3),
            Duration::from_secs(1),
            3600,
            None,
        );
        let svc = LocalizationService::new(
            ServiceSettings::new(PROJECT).with_cache(false),
            FakeRemote::default(),
            storage,
        )
        .unwrap();

        let result = svc.load_simple(Language::ENGLISH).await;

        assert!(!result.success);
        assert_eq!(svc.remote.table_calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_clears_cache_then_fetches() {
        let storage = Arc::new(MemoryStorage::new());
        write_entry(
            &storage,
            Language::ENGLISH,
            numbered_table(1),
            Duration::from_secs(1),
            3600,
            None,
        );
        let svc = service(
            FakeRemote::default().serve(Language::ENGLISH, numbered_table(8)),
            storage,
        );

        let results = svc.refresh(Some(Language::ENGLISH)).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, LoadSource::Cdn);
        assert_eq!(results[0].key_count, 8);
    }

    #[tokio::test]
    async fn test_load_all_simple_walks_every_language() {
        let svc = service(
            FakeRemote::default()
                .serve(Language::KOREAN, numbered_table(1))
                .serve(Language::ENGLISH, numbered_table(2)),
            Arc::new(MemoryStorage::new()),
        );

        let results = svc.load_all_simple().await;

        let summary: Vec<_> = results.iter().map(|r| (r.language, r.success)).collect();
        assert_eq!(
            summary,
            vec![
                (Language::KOREAN, true),
                (Language::ENGLISH, true),
                (Language::CHINESE, false)
            ]
        );
    }

    // ==================== Bulk & Retry ====================

    #[tokio::test]
    async fn test_resolve_all_loads_active_first_then_the_rest_in_order() {
        let svc = Arc::new(service(
            FakeRemote::with_version("1.0.0")
                .serve(Language::KOREAN, numbered_table(1))
                .serve(Language::ENGLISH, numbered_table(2))
                .serve(Language::CHINESE, numbered_table(3)),
            Arc::new(MemoryStorage::new()),
        ));

        let bulk = svc.resolve_all(Language::ENGLISH).await;
        assert!(svc.is_initialized());
        assert_eq!(bulk.active.language, Language::ENGLISH);
        assert_eq!(bulk.active.key_count, 2);

        let rest = bulk.background.await.unwrap();
        let languages: Vec<_> = rest.iter().map(|r| r.language).collect();
        assert_eq!(languages, vec![Language::KOREAN, Language::CHINESE]);
        assert_eq!(
            *svc.remote.table_requests.lock().unwrap(),
            vec![Language::ENGLISH, Language::KOREAN, Language::CHINESE]
        );
    }

    #[tokio::test]
    async fn test_initialization_completes_even_when_everything_fails() {
        let svc = Arc::new(service(FakeRemote::unreachable(), Arc::new(MemoryStorage::new())));

        let bulk = svc.initialize().await;

        assert!(!bulk.active.success);
        assert!(svc.is_initialized());
        let rest = bulk.background.await.unwrap();
        assert!(rest.iter().all(|r| !r.success));
    }

    #[tokio::test]
    async fn test_initialize_simple_never_reads_manifest() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("game_language", "en").unwrap();
        let svc = Arc::new(service(
            FakeRemote::with_version("1.0.0")
                .serve(Language::ENGLISH, numbered_table(2))
                .serve(Language::KOREAN, numbered_table(3)),
            storage,
        ));

        let bulk = svc.initialize_simple().await;
        assert_eq!(bulk.active.language, Language::ENGLISH);
        assert!(svc.is_initialized());

        let rest = bulk.background.await.unwrap();
        let languages: Vec<_> = rest.iter().map(|r| r.language).collect();
        assert_eq!(languages, vec![Language::KOREAN, Language::CHINESE]);
        assert_eq!(svc.remote.version_calls(), 0);
        assert_eq!(svc.text("key0"), "value0");
    }

    #[tokio::test]
    async fn test_resolve_remaining_stops_after_destroy() {
        let svc = service(
            FakeRemote::with_version("1.0.0").serve(Language::ENGLISH, numbered_table(1)),
            Arc::new(MemoryStorage::new()),
        );
        svc.destroy();

        let results = svc.resolve_remaining(Language::KOREAN).await;

        assert!(results.is_empty());
        assert_eq!(svc.remote.version_calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_with_retry_gives_up_after_attempts() {
        let svc = service(FakeRemote::unreachable(), Arc::new(MemoryStorage::new()));
        let config = RetryConfig::new(3, Duration::from_millis(5));

        let result = svc.resolve_with_retry(Language::ENGLISH, &config).await;

        assert!(!result.success);
        assert_eq!(svc.remote.version_calls(), 3);
    }

    #[tokio::test]
    async fn test_resolve_with_retry_stops_on_first_success() {
        let svc = service(
            FakeRemote::with_version("1.0.0").serve(Language::ENGLISH, numbered_table(2)),
            Arc::new(MemoryStorage::new()),
        );
        let config = RetryConfig::new(3, Duration::from_millis(5));

        let result = svc.resolve_with_retry(Language::ENGLISH, &config).await;

        assert!(result.success);
        assert_eq!(svc.remote.version_calls(), 1);
    }
}
