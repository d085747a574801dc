//! Remote data source: per-language tables and the shared version manifest.
//!
//! `RemoteSource` is the seam the loader depends on; `CdnClient` is the HTTP
//! implementation. Each request carries its own timeout and is attempted once.

use crate::error::FetchError;
use crate::i18n::Language;
use crate::store::LanguageTable;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CDN_BASE_URL: &str =
    "https://cdn.jsdelivr.net/gh/TinycellCorp/kakao_localization@main";
pub const DEFAULT_VERSION_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_TABLE_TIMEOUT: Duration = Duration::from_millis(10000);

/// Source of language tables and manifest versions.
pub trait RemoteSource: Send + Sync {
    /// Fetch the full table for one language of a project.
    fn fetch_table(
        &self,
        project: &str,
        language: Language,
    ) -> impl Future<Output = Result<LanguageTable, FetchError>> + Send;

    /// Fetch the manifest and return the project's version, `None` when the
    /// project is not listed.
    fn fetch_version(
        &self,
        project: &str,
    ) -> impl Future<Output = Result<Option<String>, FetchError>> + Send;
}

/// Where the translation repository is published and how long to wait for it.
#[derive(Debug, Clone)]
pub struct CdnEndpoints {
    pub base_url: String,
    pub version_url: String,
    pub version_timeout: Duration,
    pub table_timeout: Duration,
}

impl CdnEndpoints {
    /// Endpoints for a base URL, with the manifest at `{base_url}/version.json`
    /// and the default timeouts.
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            version_url: format!("{}/version.json", base_url),
            base_url,
            version_timeout: DEFAULT_VERSION_TIMEOUT,
            table_timeout: DEFAULT_TABLE_TIMEOUT,
        }
    }

    pub fn with_version_url(mut self, version_url: &str) -> Self {
        self.version_url = version_url.to_string();
        self
    }

    pub fn with_timeouts(mut self, version_timeout: Duration, table_timeout: Duration) -> Self {
        self.version_timeout = version_timeout;
        self.table_timeout = table_timeout;
        self
    }

    /// `{base_url}/{project}/{language}.json`
    pub fn table_url(&self, project: &str, language: Language) -> String {
        format!("{}/{}/{}.json", self.base_url, project, language.code())
    }
}

impl Default for CdnEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_CDN_BASE_URL)
    }
}

/// HTTP client for the CDN-hosted translation repository.
#[derive(Debug, Clone)]
pub struct CdnClient {
    client: reqwest::Client,
    endpoints: CdnEndpoints,
}

impl CdnClient {
    pub fn new(endpoints: CdnEndpoints) -> Self {
        Self::with_client(reqwest::Client::new(), endpoints)
    }

    pub fn with_client(client: reqwest::Client, endpoints: CdnEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &CdnEndpoints {
        &self.endpoints
    }

    /// GET a JSON document, classifying every failure into a `FetchError`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        timeout: Duration,
    ) -> Result<T, FetchError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = request.timeout(timeout).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify)?;

        serde_json::from_str(&body).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl RemoteSource for CdnClient {
    async fn fetch_table(
        &self,
        project: &str,
        language: Language,
    ) -> Result<LanguageTable, FetchError> {
        let url = self.endpoints.table_url(project, language);
        debug!("CDN fetch: {}", url);

        self.get_json(self.client.get(&url), &url, self.endpoints.table_timeout)
            .await
    }

    async fn fetch_version(&self, project: &str) -> Result<Option<String>, FetchError> {
        let url = &self.endpoints.version_url;
        debug!("Version check: {}", url);

        // Cache-busting parameter so intermediaries never serve a stale manifest
        let request = self
            .client
            .get(url)
            .query(&[("t", Utc::now().timestamp_millis().to_string())]);

        let manifest: serde_json::Map<String, serde_json::Value> = self
            .get_json(request, url, self.endpoints.version_timeout)
            .await?;

        let version = manifest
            .get(project)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        debug!("Server version for {}: {:?}", project, version);
        Ok(version)
    }
}
