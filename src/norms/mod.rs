//! Norm reconciliation.
//!
//! Raw rating tables ([`NormSource`]) are read against a static registry of
//! studies ([`Study`], [`SourceSpec`]) and merged by [`canonicalize`] into one
//! [`CanonicalNormTable`] keyed by normalized word.

pub mod canonical;
pub mod source;

use unicode_normalization::UnicodeNormalization;

pub use canonical::{canonicalize, CanonicalNormTable, MergeStats};
pub use source::{ColumnMapping, ColumnPolicy, NormSource, SourceSpec, Study};

/// Cell values treated as "no rating" (compared case-insensitively after trimming).
pub const MISSING_MARKERS: [&str; 7] = ["", "na", "n/a", "nan", "#n/a", "null", "none"];

/// Normalize a word for keying: trim, NFC, lowercase, typographic apostrophe to ASCII.
///
/// Both canonical norm keys and corpus tokens go through this function, so
/// the join compares like with like.
#[must_use]
pub fn normalize_word(word: &str) -> String {
    word.trim()
        .nfc()
        .map(|c| if c == '\u{2019}' { '\'' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// Whether a raw cell carries no value.
#[must_use]
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    MISSING_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}
