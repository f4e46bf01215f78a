//! Title cleaning: strips decorative noise from raw video titles.
//!
//! Removes bracketed/parenthesized groups and a deny-list of decorative
//! tokens ("official video", "lyrics", "HD", ...). The deny-list is
//! configurable; [`clean`] uses [`DEFAULT_DECORATIVE_TOKENS`].

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::collapse_whitespace;

// ============================================================================
// Deny-list
// ============================================================================

/// Decorative tokens removed by the default cleaner (case-insensitive).
pub const DEFAULT_DECORATIVE_TOKENS: &[&str] = &[
    "official music video",
    "official video",
    "official audio",
    "lyric video",
    "music video",
    "full album",
    "full song",
    "lyrics",
    "audio",
    "video",
    "hd",
    "hq",
    "4k",
    "1080p",
    "720p",
    "official",
    "original",
    "explicit",
    "ft.",
    "feat.",
    "featuring",
];

// ============================================================================
// Regex Patterns
// ============================================================================

/// Innermost complete bracket group. Unterminated brackets never match.
static BRACKET_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\[\]]*\]|\([^()]*\)").unwrap());

/// Pipes and bullets used as artist/title separators
static SEPARATOR_SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[|•●]").unwrap());

/// Separators left dangling at either end after removals: "Artist - " → "Artist"
static EDGE_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s\-–—:]+|[\s\-–—:]+$").unwrap());

static DEFAULT_CLEANER: Lazy<TitleCleaner> = Lazy::new(TitleCleaner::default);

// ============================================================================
// Cleaner
// ============================================================================

/// Deny-list driven title cleaner.
#[derive(Clone, Debug)]
pub struct TitleCleaner {
    tokens: Option<Regex>,
}

impl TitleCleaner {
    /// Build a cleaner from a deny-list. Multi-word tokens match across any
    /// whitespace; longer tokens win over their substrings.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        // Leftmost-first alternation: longest token must come first
        words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
        words.dedup();

        if words.is_empty() {
            return Self { tokens: None };
        }

        let alternatives: Vec<String> = words.iter().map(|w| token_pattern(w)).collect();
        let pattern = format!("(?i)(?:{})", alternatives.join("|"));
        let tokens = match Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("decorative token list rejected, cleaning brackets only: {e}");
                None
            }
        };
        Self { tokens }
    }

    /// Clean a raw title. Runs passes until the output stops changing, so
    /// `clean(clean(s)) == clean(s)` for every input.
    pub fn clean(&self, raw: &str) -> String {
        let mut current = self.clean_pass(raw);
        loop {
            let next = self.clean_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn clean_pass(&self, input: &str) -> String {
        let mut result = input.to_string();

        // Innermost groups first so "(a [b] c)" is removed completely
        while BRACKET_GROUP.is_match(&result) {
            result = BRACKET_GROUP.replace_all(&result, " ").to_string();
        }

        if let Some(tokens) = &self.tokens {
            result = tokens.replace_all(&result, " ").to_string();
        }

        result = SEPARATOR_SYMBOLS.replace_all(&result, " - ").to_string();
        result = collapse_whitespace(&result);
        EDGE_SEPARATORS.replace_all(&result, "").trim().to_string()
    }
}

impl Default for TitleCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_DECORATIVE_TOKENS.iter().copied())
    }
}

/// Word-bounded pattern for one token. A boundary is only required on an
/// edge that is alphanumeric ("ft." has no trailing boundary).
fn token_pattern(token: &str) -> String {
    let body = token
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let starts_word = token.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = token.chars().last().is_some_and(char::is_alphanumeric);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" }
    )
}

/// Clean a raw title with the default deny-list.
pub fn clean(raw: &str) -> String {
    DEFAULT_CLEANER.clean(raw)
}

// ============================================================================
// TESTS
// ============================================================================
