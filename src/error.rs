//! Error taxonomy for the localization core.
//!
//! None of these escape the loader: fetch and storage errors are converted into
//! fallback steps or log lines. Only activation, explicit language switches and
//! the registry maintenance tools hand them to callers.

use thiserror::Error;

/// Failure of a single request against the CDN.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    /// Body was not the JSON shape we expected.
    #[error("failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// No complete response within the configured window.
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Transport-level failure (DNS, connection refused, reset, ...).
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Http { .. } => "http",
            FetchError::Parse { .. } => "parse",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Network { .. } => "network",
        }
    }
}

/// Failure of the persisted key/value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by service construction and explicit caller actions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("a localization service is already active for this host")]
    AlreadyInitialized,

    #[error("project id must not be empty")]
    EmptyProjectId,

    #[error("unknown or disabled language code: '{0}'")]
    UnknownLanguage(String),

    #[error("no table loaded for language '{0}'")]
    LanguageNotLoaded(String),

    #[error("localization service is not initialized yet")]
    NotInitialized,
}

/// Errors from reading or editing the project registry (version.json).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("project not found in registry: {0}")]
    UnknownProject(String),

    #[error("invalid version '{0}', expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    #[error("invalid project id '{0}', expected <number><CamelCaseName> (e.g. 52NewProject)")]
    InvalidProjectId(String),
}
