//! Language registry: Single source of truth for all supported languages.
//!
//! The CDN repository publishes exactly one table per registered language, so
//! the order of this registry is also the order in which background loads and
//! cache clears walk the languages.

use std::sync::OnceLock;

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Code used in CDN paths and cache keys (e.g., "ko", "en", "cn")
    pub code: &'static str,

    /// English name of the language (e.g., "Korean", "English")
    pub name: &'static str,

    /// Native name of the language (e.g., "한국어", "English")
    pub native_name: &'static str,

    /// Whether this is the default language when no preference is saved
    pub is_default: bool,

    /// Whether this language is enabled for use
    pub enabled: bool,
}

/// Global language registry singleton.
///
/// Initialized once on first access and immutable thereafter.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Get all enabled languages, in registry order.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get the default language configuration.
    ///
    /// # Panics
    /// Panics if the registry does not define exactly one default language
    /// (this indicates a configuration error).
    pub fn default_language(&self) -> &LanguageConfig {
        let defaults: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_default)
            .collect();

        match defaults.len() {
            0 => panic!("No default language found in registry"),
            1 => defaults[0],
            _ => panic!("Multiple default languages found in registry"),
        }
    }
}

/// Languages published by the translation repository: Korean, English and
/// Simplified Chinese (served under the `cn` code).
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "ko",
            name: "Korean",
            native_name: "한국어",
            is_default: true,
            enabled: true,
        },
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_default: false,
            enabled: true,
        },
        LanguageConfig {
            code: "cn",
            name: "Chinese",
            native_name: "中文",
            is_default: false,
            enabled: true,
        },
    ]
}
