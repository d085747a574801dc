use crate::storage::KeyValueStorage;
use std::sync::Arc;
use tracing::{debug, warn};

/// Last version string for which a CDN fetch populated the cache, one slot per
/// project under `loc_version_{project}`.
#[derive(Clone)]
pub struct VersionStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl VersionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn version_key(project: &str) -> String {
        format!("loc_version_{}", project)
    }

    pub fn get(&self, project: &str) -> Option<String> {
        let key = Self::version_key(project);
        match self.storage.get_item(&key) {
            Ok(version) => version.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Version read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub fn put(&self, project: &str, version: &str) {
        let key = Self::version_key(project);
        match self.storage.set_item(&key, version) {
            Ok(()) => debug!("Version saved: {} = {}", key, version),
            Err(e) => warn!("Version write failed for {}: {}", key, e),
        }
    }

    pub fn clear(&self, project: &str) {
        let key = Self::version_key(project);
        if let Err(e) = self.storage.remove_item(&key) {
            warn!("Version clear failed for {}: {}", key, e);
        }
    }
}
