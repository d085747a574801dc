//! Language type: validated language code.
//!
//! Every table, cache key and CDN path is addressed through a `Language`, so an
//! unsupported code is rejected once at the boundary instead of producing a
//! request for a file the repository never publishes.

use crate::error::ServiceError;
use crate::i18n::{LanguageConfig, LanguageRegistry};
use serde::{Serialize, Serializer};
use std::fmt;

/// A language that has been validated against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
}

impl Language {
    pub const KOREAN: Language = Language { code: "ko" };
    pub const ENGLISH: Language = Language { code: "en" };
    pub const CHINESE: Language = Language { code: "cn" };

    /// Create a Language from a language code string.
    ///
    /// # Returns
    /// * `Ok(Language)` if the code is registered and enabled
    /// * `Err(ServiceError::UnknownLanguage)` otherwise
    pub fn from_code(code: &str) -> Result<Language, ServiceError> {
        match LanguageRegistry::get().get_by_code(code) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            _ => Err(ServiceError::UnknownLanguage(code.to_string())),
        }
    }

    /// The language used when no saved preference applies.
    pub fn default_language() -> Language {
        Language {
            code: LanguageRegistry::get().default_language().code,
        }
    }

    /// All enabled languages in registry order.
    pub fn all() -> Vec<Language> {
        LanguageRegistry::get()
            .list_enabled()
            .iter()
            .map(|config| Language { code: config.code })
            .collect()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full language configuration from the registry.
    ///
    /// # Panics
    /// Panics if the code is missing from the registry, which cannot happen for
    /// values built through `from_code` or the constants.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}
