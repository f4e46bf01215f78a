//! Artist/title extraction from free-form video titles.
//!
//! Separator patterns are tried in a fixed priority order; the first one
//! that yields two non-empty segments wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ParsedTitle;

/// Which side of a pattern holds the artist.
#[derive(Debug, Clone, Copy)]
enum ArtistSide {
    First,
    Second,
}

/// Separator patterns in priority order.
static TITLE_SEPARATORS: Lazy<Vec<(Regex, ArtistSide)>> = Lazy::new(|| {
    vec![
        // "Artist - Title" (hyphen, en dash or em dash between spaces)
        (Regex::new(r"(?s)^(.+?)\s+[-–—]\s+(.+)$").unwrap(), ArtistSide::First),
        // "Artist: Title"
        (Regex::new(r"(?s)^(.+?):\s+(.+)$").unwrap(), ArtistSide::First),
        // "Title by Artist"
        (Regex::new(r"(?is)^(.+?)\s+by\s+(.+)$").unwrap(), ArtistSide::Second),
        // 'Artist "Title"' with straight or curly quotes
        (Regex::new(r#"(?s)^(.+?)\s+["“”](.+?)["“”]"#).unwrap(), ArtistSide::First),
    ]
});

/// Parse an (artist, title) guess out of a raw title. Never fails; when no
/// pattern applies both fields are unset and only `raw` is kept.
pub fn parse(raw: &str) -> ParsedTitle {
    for (pattern, side) in TITLE_SEPARATORS.iter() {
        let Some(caps) = pattern.captures(raw) else {
            continue;
        };
        let first = caps.get(1).map_or("", |m| m.as_str().trim());
        let second = caps.get(2).map_or("", |m| m.as_str().trim());
        if first.is_empty() || second.is_empty() {
            continue;
        }
        let (artist, title) = match side {
            ArtistSide::First => (first, second),
            ArtistSide::Second => (second, first),
        };
        return ParsedTitle::new(raw, Some((artist.to_string(), title.to_string())));
    }
    ParsedTitle::new(raw, None)
}

// ============================================================================
// TESTS
// ============================================================================
