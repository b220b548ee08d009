//! lexnorm - psycholinguistic norm reconciliation and document aggregation
//!
//! Merges published word-norm tables (concreteness, age of acquisition,
//! prevalence, frequency, imagery, socialness, ...) into one canonical table,
//! joins it against an annotated corpus and summarizes every document with
//! and without stopwords.
//!
//! # Features
//!
//! - Static per-study column registry with namespaced canonical columns
//! - Duplicate-flag aware merging that refuses to guess on conflicting values
//! - Left join of tokens against a caller-chosen metric selection
//! - Coverage-aware per-document means, with coverage warnings
//! - CSV and JSON exports

/// Per-document summaries
pub mod aggregate;
/// Annotation and sentiment collaborators
pub mod annotate;
/// Configuration management
pub mod config;
/// Documents and the token store
pub mod corpus;
/// Error types
pub mod error;
/// Table exports
pub mod export;
/// Token/norm join
pub mod join;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Norm sources and canonicalization
pub mod norms;
/// Stage orchestration
pub mod pipeline;
/// Stopword lists
pub mod stopwords;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use aggregate::{Aggregator, DocumentSummary, SummaryTable, Variant};
pub use config::AppConfig;
pub use corpus::{CorpusTokenStore, Document};
pub use error::{LexnormError, Result};
pub use join::{join_norms, JoinedCorpus, MetricSelection};
pub use norms::{canonicalize, CanonicalNormTable, NormSource, Study};
pub use pipeline::{Pipeline, PipelineOutput};
pub use stopwords::StopwordList;
