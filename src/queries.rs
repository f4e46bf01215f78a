//! Catalog search query plan for a raw title.
//!
//! Produces query strings ordered by specificity. Running them (and stopping
//! once enough candidates are gathered) is the driver's job.

use rustc_hash::FxHashSet;

use crate::cleaner::{self, TitleCleaner};
use crate::parser::parse;

/// Query builder bound to a specific cleaner.
#[derive(Clone, Debug, Default)]
pub struct QueryBuilder {
    cleaner: TitleCleaner,
}

impl QueryBuilder {
    pub fn new(cleaner: TitleCleaner) -> Self {
        Self { cleaner }
    }

    pub fn build(&self, raw: &str) -> Vec<String> {
        plan(raw, &self.cleaner.clean(raw))
    }
}

/// Build queries with the default cleaner.
///
/// Order:
/// 1. `"{artist} {title}"` from the parsed cleaned title
/// 2. `artist:"{artist}" track:"{title}"` advanced syntax
/// 3. the cleaned title
/// 4. the raw title unmodified
pub fn build_queries(raw: &str) -> Vec<String> {
    plan(raw, &cleaner::clean(raw))
}

fn plan(raw: &str, cleaned: &str) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::with_capacity(4);

    if let Some((artist, title)) = parse(cleaned).artist_title() {
        ordered.push(format!("{artist} {title}"));
        ordered.push(format!("artist:\"{artist}\" track:\"{title}\""));
    }
    ordered.push(cleaned.to_string());
    ordered.push(raw.to_string());

    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut queries: Vec<String> = ordered
        .into_iter()
        .filter(|q| {
            let key = q.trim();
            !key.is_empty() && seen.insert(key.to_string())
        })
        .collect();

    // Always at least the raw title, even when it is blank
    if queries.is_empty() {
        queries.push(raw.to_string());
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unique(queries: &[String]) {
        let trimmed: FxHashSet<&str> = queries.iter().map(|q| q.trim()).collect();
        assert_eq!(trimmed.len(), queries.len(), "duplicates in {queries:?}");
    }

    #[test]
    fn test_queries_with_parsed_artist() {
        let queries = build_queries("The Beatles - Hey Jude (Official Video)");
        assert_eq!(
            queries,
            vec![
                "The Beatles Hey Jude".to_string(),
                "artist:\"The Beatles\" track:\"Hey Jude\"".to_string(),
                "The Beatles - Hey Jude".to_string(),
                "The Beatles - Hey Jude (Official Video)".to_string(),
            ]
        );
    }

    #[test]
    fn test_queries_without_parsed_artist() {
        let queries = build_queries("Some Random Video Title");
        // "Video" is decorative, so cleaned and raw differ
        assert_eq!(queries, vec!["Some Random Title".to_string(), "Some Random Video Title".to_string()]);
    }

    #[test]
    fn test_queries_raw_equal_to_cleaned_is_deduplicated() {
        let queries = build_queries("Nothing Decorative Here");
        assert_eq!(queries, vec!["Nothing Decorative Here".to_string()]);
    }

    #[test]
    fn test_queries_dedup_after_trimming() {
        let queries = build_queries("  Plain Title  ");
        assert_eq!(queries, vec!["Plain Title".to_string()]);
    }

    #[test]
    fn test_queries_uniqueness() {
        for raw in ["Artist - Song", "Artist - Song [HD]", "x", "Song by Artist", "a: b"] {
            assert_unique(&build_queries(raw));
        }
    }

    #[test]
    fn test_queries_never_empty() {
        assert_eq!(build_queries(""), vec![String::new()]);
        assert_eq!(build_queries("   "), vec!["   ".to_string()]);
        assert_eq!(build_queries("[Official Video]"), vec!["[Official Video]".to_string()]);
    }

    #[test]
    fn test_query_builder_uses_custom_cleaner() {
        let builder = QueryBuilder::new(TitleCleaner::new(["remastered"]));
        let queries = builder.build("Queen - Innuendo Remastered");
        assert_eq!(queries[0], "Queen Innuendo");
        assert_eq!(queries.last().map(String::as_str), Some("Queen - Innuendo Remastered"));
    }
}
