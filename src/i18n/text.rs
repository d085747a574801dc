//! String post-processing applied to values read from a language table.
//!
//! Translators write tables in a spreadsheet, where real line breaks are
//! awkward, so the published JSON carries the two-character escapes `\n` and
//! `\s`. Keys may be written with the `@` marker used in scene labels.

use std::fmt::Display;

/// Marker prefix that flags label text as a localization key.
pub const KEY_PREFIX: &str = "@";

/// Strip the first `@` marker from a key, if any.
pub fn normalize_key(key: &str) -> String {
    key.replacen(KEY_PREFIX, "", 1)
}

/// Expand the literal `\n` and `\s` escapes of a table value.
pub fn unescape(value: &str) -> String {
    value.replace("\\n", "\n").replace("\\s", " ")
}

/// Replace positional placeholders `{0}`, `{1}`, ... with the given arguments.
///
/// Every occurrence of a placeholder is replaced; placeholders without a
/// matching argument are left untouched.
pub fn apply_args<T: Display>(text: &str, args: &[T]) -> String {
    args.iter()
        .enumerate()
        .fold(text.to_string(), |acc, (index, arg)| {
            acc.replace(&format!("{{{}}}", index), &arg.to_string())
        })
}
