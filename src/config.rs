use crate::i18n::Language;
use crate::remote::{CdnEndpoints, DEFAULT_CDN_BASE_URL};
use crate::service::{ServiceSettings, DEFAULT_CACHE_EXPIRE_SECONDS};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Project
    pub project_id: String,
    pub default_language: Language,

    // CDN
    pub cdn_base_url: String,
    pub cdn_version_url: Option<String>,
    pub version_timeout_ms: u64,
    pub table_timeout_ms: u64,

    // Loading
    pub use_cache: bool,
    pub use_fallback: bool,
    pub version_gated: bool,
    pub cache_expire_seconds: u64,
    pub startup_retries: u32,

    // Storage
    pub storage_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let default_language = match std::env::var("LOC_DEFAULT_LANGUAGE") {
            Ok(code) => Language::from_code(code.trim())
                .with_context(|| format!("LOC_DEFAULT_LANGUAGE is not supported: {}", code))?,
            Err(_) => Language::default_language(),
        };

        let project_id = std::env::var("LOC_PROJECT_ID").context("LOC_PROJECT_ID not set")?;
        if project_id.trim().is_empty() {
            bail!("LOC_PROJECT_ID is empty");
        }

        Ok(Self {
            project_id,
            default_language,

            // CDN
            cdn_base_url: std::env::var("LOC_CDN_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CDN_BASE_URL.to_string()),
            cdn_version_url: std::env::var("LOC_CDN_VERSION_URL").ok(),
            version_timeout_ms: parse_var("LOC_VERSION_TIMEOUT_MS")?.unwrap_or(5000),
            table_timeout_ms: parse_var("LOC_TABLE_TIMEOUT_MS")?.unwrap_or(10000),

            // Loading
            use_cache: bool_var("LOC_USE_CACHE")?.unwrap_or(true),
            use_fallback: bool_var("LOC_USE_FALLBACK")?.unwrap_or(true),
            version_gated: bool_var("LOC_VERSION_GATED")?.unwrap_or(true),
            cache_expire_seconds: parse_var("LOC_CACHE_EXPIRE_SECONDS")?
                .unwrap_or(DEFAULT_CACHE_EXPIRE_SECONDS),
            startup_retries: parse_var("LOC_STARTUP_RETRIES")?.unwrap_or(1),

            // Storage
            storage_dir: std::env::var("LOC_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".loc-cache")),
        })
    }

    pub fn endpoints(&self) -> CdnEndpoints {
        let endpoints = CdnEndpoints::new(&self.cdn_base_url).with_timeouts(
            Duration::from_millis(self.version_timeout_ms),
            Duration::from_millis(self.table_timeout_ms),
        );
        match &self.cdn_version_url {
            Some(url) => endpoints.with_version_url(url),
            None => endpoints,
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings::new(&self.project_id)
            .with_default_language(self.default_language)
            .with_cache(self.use_cache)
            .with_fallback(self.use_fallback)
            .with_cache_expire_seconds(self.cache_expire_seconds)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => {
            let parsed = value
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number, got '{}'", name, value))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}

fn bool_var(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => bail!("{} must be true or false, got '{}'", name, value),
        },
        Err(_) => Ok(None),
    }
}
