//! Internationalization (i18n) primitives shared by the loader and consumers.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for the languages the CDN publishes
//! - `language`: Validated `Language` type used for every table and cache key
//! - `text`: Key normalization, escape expansion and positional arguments
//!
//! # Example
//!
//! ```rust,ignore
//! use cdn_localization::i18n::{Language, LanguageRegistry};
//!
//! let english = Language::from_code("en")?;
//! let languages = LanguageRegistry::get().list_enabled();
//! ```

mod language;
mod registry;
pub mod text;

pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry};
