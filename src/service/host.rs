//! Single-active-service guard.

use super::{LocalizationService, ServiceSettings};
use crate::error::ServiceError;
use crate::storage::KeyValueStorage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Owner of at most one active [`LocalizationService`].
///
/// Separate hosts are independent; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct ServiceHost {
    active: Arc<AtomicBool>,
}

impl ServiceHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a service currently holds this host's slot.
    pub fn is_occupied(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Build a service and claim the slot for it.
    ///
    /// Fails with [`ServiceError::AlreadyInitialized`] while another service
    /// from this host is alive and not destroyed. The slot is freed by
    /// [`LocalizationService::destroy`] or when the service is dropped.
    pub fn activate<R>(
        &self,
        settings: ServiceSettings,
        remote: R,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Arc<LocalizationService<R>>, ServiceError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Localization service is already active on this host");
            return Err(ServiceError::AlreadyInitialized);
        }

        let lease = HostLease {
            active: Arc::clone(&self.active),
        };

        // On error the lease drops here and frees the slot again
        let mut service = LocalizationService::new(settings, remote, storage)?;
        service.lease = Mutex::new(Some(lease));

        info!("Localization service activated for {}", service.project_id());
        Ok(Arc::new(service))
    }
}

/// Claim on a host slot, released on drop.
#[derive(Debug)]
pub(super) struct HostLease {
    active: Arc<AtomicBool>,
}

impl Drop for HostLease {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
