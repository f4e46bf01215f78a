//! Core data models for title matching.
//!
//! This module contains the parsed-title, catalog-candidate and match-result
//! types shared by the pipeline, plus the batch report the driver builds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Parsed Titles
// ============================================================================

/// (artist, title) guess extracted from a raw title.
/// Either both fields are set or neither is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTitle {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub raw: String,
}

impl ParsedTitle {
    pub(crate) fn new(raw: &str, parts: Option<(String, String)>) -> Self {
        let (artist, title) = match parts {
            Some((artist, title)) => (Some(artist), Some(title)),
            None => (None, None),
        };
        Self {
            artist,
            title,
            raw: raw.to_string(),
        }
    }

    /// Both segments, when a separator pattern matched
    pub fn artist_title(&self) -> Option<(&str, &str)> {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => Some((artist.as_str(), title.as_str())),
            _ => None,
        }
    }
}

// ============================================================================
// Catalog Models
// ============================================================================

/// Catalog track returned by the search collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    pub id: String,
    pub artist: String,
    pub title: String,
    /// Catalog metadata passed through untouched (album, popularity, uri, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CatalogCandidate {
    pub fn new(id: impl Into<String>, artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            artist: artist.into(),
            title: title.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Rendering compared against raw titles: "artist - title"
    pub fn rendered(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CatalogCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

// ============================================================================
// Match Results
// ============================================================================

/// Coarse classification of a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    /// Score at or above the threshold
    High,
    /// A candidate exists but scored below the threshold
    Low,
    /// No candidates to choose from
    NotFound,
}

impl Confidence {
    /// Inclusive threshold: a score equal to the threshold is `High`.
    pub fn classify(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Confidence::High
        } else {
            Confidence::Low
        }
    }
}

/// Scoring strategy that produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Lexical,
    Semantic,
}

/// Outcome of matching one raw title against a candidate pool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    pub candidate: Option<CatalogCandidate>,
    pub score: f64,
    pub confidence: Confidence,
    pub strategy: Strategy,
}

impl MatchResult {
    /// Empty candidate pool. Nothing was scored, so no embedding was used.
    pub fn not_found() -> Self {
        Self {
            candidate: None,
            score: 0.0,
            confidence: Confidence::NotFound,
            strategy: Strategy::Lexical,
        }
    }

    /// Winning candidate, classified against `threshold`
    pub fn matched(candidate: CatalogCandidate, score: f64, threshold: f64, strategy: Strategy) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            candidate: Some(candidate),
            score,
            confidence: Confidence::classify(score, threshold),
            strategy,
        }
    }
}

// ============================================================================
// Batch Report
// ============================================================================

/// One line of the batch report.
#[derive(Clone, Debug, Serialize)]
pub struct ReportEntry {
    pub raw: String,
    pub candidate_id: Option<String>,
    pub candidate: Option<String>,
    pub score: f64,
    pub confidence: Confidence,
    pub strategy: Strategy,
}

/// Aggregated HIGH/LOW/NOT_FOUND counts for a batch of titles.
#[derive(Default, Debug, Clone, Serialize)]
pub struct MatchReport {
    pub high: usize,
    pub low: usize,
    pub not_found: usize,
    pub semantic_scored: usize,
    pub entries: Vec<ReportEntry>,
    pub elapsed_seconds: f64,
}

impl MatchReport {
    /// Record one result
    pub fn record(&mut self, raw: &str, result: &MatchResult) {
        match result.confidence {
            Confidence::High => self.high += 1,
            Confidence::Low => self.low += 1,
            Confidence::NotFound => self.not_found += 1,
        }
        if result.candidate.is_some() && result.strategy == Strategy::Semantic {
            self.semantic_scored += 1;
        }
        self.entries.push(ReportEntry {
            raw: raw.to_string(),
            candidate_id: result.candidate.as_ref().map(|c| c.id.clone()),
            candidate: result.candidate.as_ref().map(CatalogCandidate::rendered),
            score: result.score,
            confidence: result.confidence,
            strategy: result.strategy,
        });
    }

    pub fn total(&self) -> usize {
        self.high + self.low + self.not_found
    }

    /// Share of titles with any candidate, as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            100.0 * (self.high + self.low) as f64 / self.total() as f64
        }
    }

    /// Log the summary block to stderr
    pub fn log_summary(&self) {
        eprintln!("{:=<60}", "");
        eprintln!("MATCHING SUMMARY:");
        eprintln!("  High confidence matches: {}", self.high);
        eprintln!("  Low confidence matches:  {}", self.low);
        eprintln!("  Not found:               {}", self.not_found);
        eprintln!("  Total:                   {}", self.total());
        eprintln!("  Match rate:              {:.1}%", self.match_rate());
        eprintln!("{:=<60}", "");
    }

    /// Write the report to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_boundary_is_inclusive() {
        assert_eq!(Confidence::classify(0.6, 0.6), Confidence::High);
        assert_eq!(Confidence::classify(0.6 - 1e-9, 0.6), Confidence::Low);
        assert_eq!(Confidence::classify(1.0, 0.6), Confidence::High);
        assert_eq!(Confidence::classify(0.0, 0.0), Confidence::High);
    }

    #[test]
    fn test_not_found_has_no_candidate() {
        let result = MatchResult::not_found();
        assert!(result.candidate.is_none());
        assert_eq!(result.strategy, Strategy::Lexical);
        assert_eq!(result.confidence, Confidence::NotFound);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_matched_clamps_score() {
        let c = CatalogCandidate::new("1", "A", "B");
        assert_eq!(MatchResult::matched(c.clone(), 1.5, 0.6, Strategy::Lexical).score, 1.0);
        assert_eq!(MatchResult::matched(c.clone(), -0.2, 0.6, Strategy::Lexical).score, 0.0);
        let nan = MatchResult::matched(c, f64::NAN, 0.6, Strategy::Semantic);
        assert_eq!(nan.score, 0.0);
        assert_eq!(nan.confidence, Confidence::Low);
    }

    #[test]
    fn test_candidate_rendering() {
        let c = CatalogCandidate::new("id", "The Beatles", "Hey Jude");
        assert_eq!(c.rendered(), "The Beatles - Hey Jude");
    }

    #[test]
    fn test_candidate_deserializes_extra_metadata() {
        let json = r#"{"id":"x1","artist":"Queen","title":"Bohemian Rhapsody","extra":{"popularity":83}}"#;
        let c: CatalogCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(c.extra.get("popularity"), Some(&serde_json::json!(83)));

        let bare: CatalogCandidate =
            serde_json::from_str(r#"{"id":"x2","artist":"Queen","title":"Innuendo"}"#).unwrap();
        assert!(bare.extra.is_empty());
    }

    #[test]
    fn test_report_counts_and_rate() {
        let mut report = MatchReport::default();
        let c = CatalogCandidate::new("1", "A", "B");
        report.record("a", &MatchResult::matched(c.clone(), 0.9, 0.6, Strategy::Semantic));
        report.record("b", &MatchResult::matched(c, 0.2, 0.6, Strategy::Lexical));
        report.record("c", &MatchResult::not_found());
        report.record("d", &MatchResult::not_found());

        assert_eq!((report.high, report.low, report.not_found), (1, 1, 2));
        assert_eq!(report.total(), 4);
        assert_eq!(report.semantic_scored, 1);
        assert!((report.match_rate() - 50.0).abs() < 1e-9);
        assert_eq!(report.entries[0].candidate.as_deref(), Some("A - B"));
        assert_eq!(report.entries[2].candidate_id, None);
    }

    #[test]
    fn test_empty_report_rate() {
        assert_eq!(MatchReport::default().match_rate(), 0.0);
    }

    #[test]
    fn test_report_serializes_confidence_labels() {
        let mut report = MatchReport::default();
        report.record("x", &MatchResult::not_found());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"NOT_FOUND\""));
        assert!(json.contains("\"LEXICAL\""));
    }
}
