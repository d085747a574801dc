//! Load metrics for one localization service.
//!
//! Counters are per service instance rather than process-wide, so two services
//! (or two tests) never see each other's numbers.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Atomic counters updated by the loader.
#[derive(Debug, Default)]
pub struct LoadMetrics {
    /// Manifest requests issued
    version_checks: AtomicUsize,

    /// Manifest requests that failed or did not list the project
    version_check_failures: AtomicUsize,

    /// Table requests issued
    table_fetches: AtomicUsize,

    /// Table requests that failed
    table_fetch_failures: AtomicUsize,

    /// Loads served from the persisted cache
    cache_hits: AtomicUsize,

    /// Cache lookups that found nothing usable
    cache_misses: AtomicUsize,

    /// Loads answered by the stale in-memory table
    local_fallbacks: AtomicUsize,

    /// Loads that ended with no data at all
    failed_loads: AtomicUsize,
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_version_check(&self) {
        self.version_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_version_check_failure(&self) {
        self.version_check_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_table_fetch(&self) {
        self.table_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_table_fetch_failure(&self) {
        self.table_fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_fallback(&self) {
        self.local_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_load(&self) {
        self.failed_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn table_fetches(&self) -> usize {
        self.table_fetches.load(Ordering::Relaxed)
    }

    pub fn version_checks(&self) -> usize {
        self.version_checks.load(Ordering::Relaxed)
    }

    /// Snapshot of all counters.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total_cache_queries = hits + misses;
        let cache_hit_rate = if total_cache_queries > 0 {
            (hits as f64 / total_cache_queries as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            version_checks: self.version_checks(),
            version_check_failures: self.version_check_failures.load(Ordering::Relaxed),
            table_fetches: self.table_fetches(),
            table_fetch_failures: self.table_fetch_failures.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            local_fallbacks: self.local_fallbacks.load(Ordering::Relaxed),
            failed_loads: self.failed_loads.load(Ordering::Relaxed),
        }
    }
}

/// Metrics report for logging or JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub version_checks: usize,
    pub version_check_failures: usize,
    pub table_fetches: usize,
    pub table_fetch_failures: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub local_fallbacks: usize,
    pub failed_loads: usize,
}
