//! Matches free-form video titles to catalog tracks.
//!
//! Pipeline: [`cleaner`] and [`parser`] feed [`queries`]; the caller's
//! catalog search returns candidates; [`matcher`] ranks them with a
//! [`scoring::Scorer`] and assigns a confidence.

pub mod cleaner;
pub mod config;
pub mod driver;
pub mod embedding;
#[cfg(feature = "semantic")]
pub mod fastembed_embedder;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod progress;
pub mod queries;
pub mod safety;
pub mod scoring;

pub use cleaner::{clean, TitleCleaner};
pub use config::MatchConfig;
pub use driver::{match_batch, CatalogSearch, Pipeline};
pub use embedding::{Embedder, EmbeddingError, EmbeddingModel};
pub use matcher::{match_title, CandidateMatcher};
pub use models::{CatalogCandidate, Confidence, MatchReport, MatchResult, ParsedTitle, Strategy};
pub use parser::parse;
pub use queries::build_queries;
pub use scoring::{similarity, Scorer, SimilarityScorer};
