//! Shared text normalization for title matching.
//! Used by the cleaner (whitespace handling) and the lexical scorer
//! (comparison form).

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Regex to collapse any run of whitespace into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Apostrophes are dropped rather than spaced so "Don't" compares equal to "Dont"
static APOSTROPHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"['`]").unwrap());

/// Anything that is not a letter, digit or whitespace after ASCII folding
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII.
/// e.g., "Beyoncé" → "beyonce", "Motörhead" → "motorhead"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    // Remaining non-ASCII (Cyrillic, Hebrew, CJK, ...) is transliterated
    any_ascii(&stripped).to_lowercase()
}

/// Straighten curly quotes and spell out ampersands.
pub fn normalize_punctuation(s: &str) -> String {
    s.replace(['\u{2018}', '\u{2019}', '\u{00B4}'], "'")
        .replace(['\u{201C}', '\u{201D}', '\u{201E}'], "\"")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace(" & ", " and ")
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    MULTI_SPACE.replace_all(s, " ").trim().to_string()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Comparison form of a string: lowercase ASCII, no punctuation,
/// single-spaced. Two strings that only differ in case, accents, quotes
/// or separators normalize to the same value.
pub fn normalize_for_comparison(s: &str) -> String {
    let folded = fold_to_ascii(&normalize_punctuation(s));
    let no_apostrophes = APOSTROPHES.replace_all(&folded, "");
    let spaced = NON_ALNUM.replace_all(&no_apostrophes, " ");
    collapse_whitespace(&spaced)
}

// ============================================================================
// TESTS
// ============================================================================
