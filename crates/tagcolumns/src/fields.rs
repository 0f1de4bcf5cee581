//! Field key normalization.
//!
//! Hidden (computed) fields are stored with a `~` prefix, written with a `_`
//! prefix in scripts, and sometimes typed bare by users. All three spellings
//! resolve to the same key:
//!
//! | Input         | Normalized   |
//! |---------------|--------------|
//! | `%_bitrate%`  | `~bitrate`   |
//! | `_bitrate`    | `~bitrate`   |
//! | `~bitrate`    | `~bitrate`   |
//! | `bitrate`     | `~bitrate`   |
//! | `artist`      | `artist`     |

use once_cell::sync::Lazy;
use regex::Regex;

/// Field names recognized as hidden even when written without a prefix.
pub const HIDDEN_FIELDS: &[&str] = &[
    "bitrate",
    "bits_per_sample",
    "channels",
    "dirname",
    "extension",
    "file_created_timestamp",
    "file_modified_timestamp",
    "filename",
    "filepath",
    "filesize",
    "fingerprint",
    "format",
    "length",
    "match_quality",
    "primaryreleasetype",
    "releasecomment",
    "sample_rate",
    "totalalbumtracks",
    "video",
];

static SIMPLE_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%([A-Za-z0-9_~:]+)%$").expect("static regex"));

/// Returns `true` if `name` (without prefix) is a recognized hidden field.
pub fn is_hidden_field(name: &str) -> bool {
    HIDDEN_FIELDS.contains(&name)
}

/// Strips surrounding whitespace and one `%...%` wrapping.
pub fn unwrap_variable(raw: &str) -> &str {
    let key = raw.trim();
    match key
        .strip_prefix('%')
        .and_then(|inner| inner.strip_suffix('%'))
    {
        Some(inner) => inner.trim(),
        None => key,
    }
}

/// Normalizes a field reference to the key items are queried with.
pub fn normalize_field_key(raw: &str) -> String {
    let key = unwrap_variable(raw);
    if let Some(rest) = key.strip_prefix('_') {
        if !rest.is_empty() {
            return format!("~{rest}");
        }
    }
    if key.starts_with('~') || !is_hidden_field(key) {
        return key.to_string();
    }
    format!("~{key}")
}

/// Returns the variable name when `script` is a single bare `%var%`.
///
/// The name is returned as written (e.g. `_bitrate`); callers normalize it
/// with [`normalize_field_key`] before lookups.
pub fn simple_variable(script: &str) -> Option<&str> {
    SIMPLE_VARIABLE
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
