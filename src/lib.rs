//! CDN-hosted localization tables with a version-gated local cache.
//!
//! Tables live in a static translation repository (`{base}/{project}/{lang}.json`)
//! next to a single `version.json` manifest. A [`LocalizationService`] checks the
//! manifest first and only downloads a table when the project's version moved,
//! falling back to the persisted cache and then to whatever is already in memory.

pub mod config;
pub mod error;
pub mod i18n;
pub mod metrics;
pub mod registry;
pub mod remote;
pub mod retry;
pub mod service;
pub mod storage;
pub mod store;

pub use error::{FetchError, RegistryError, ServiceError, StorageError};
pub use i18n::Language;
pub use remote::{CdnClient, CdnEndpoints, RemoteSource};
pub use service::{BulkLoad, LoadResult, LoadSource, LocalizationService, ServiceHost, ServiceSettings};
pub use storage::{DirStorage, KeyValueStorage, MemoryStorage};
