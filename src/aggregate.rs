//! Per-document aggregation of joined tokens.
//!
//! Two variants are produced from the same joined corpus: one over all word
//! tokens, one with stopwords removed as well. Punctuation and numerals are
//! never eligible. Sentiment is only merged into the full variant; it is
//! scored on whole sentences and removing stopwords (negators, intensifiers)
//! changes what those sentences mean, so it is not recomputed for the other.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annotate::DocumentSentiment;
use crate::corpus::Token;
use crate::error::{LexnormError, Result};
use crate::join::JoinedCorpus;

/// Default coverage at or below which a warning is raised.
pub const DEFAULT_COVERAGE_WARNING_THRESHOLD: f64 = 0.05;

/// Which tokens count as eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// All tokens except punctuation and numerals
    WithStopwords,
    /// Additionally excludes stopwords
    WithoutStopwords,
}

impl Variant {
    /// Name used in file names and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WithStopwords => "with_stopwords",
            Self::WithoutStopwords => "without_stopwords",
        }
    }

    /// Whether a token takes part in this variant's statistics.
    #[must_use]
    pub fn is_eligible(self, token: &Token) -> bool {
        !token.is_excluded() && (self == Self::WithStopwords || !token.is_stopword)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mean and coverage of one metric in one document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Mean over eligible tokens with a value; `None` when there are none
    pub mean: Option<f64>,
    /// Share of eligible tokens with a value; `None` without eligible tokens
    pub coverage: Option<f64>,
    /// Eligible tokens with a value
    pub rated: usize,
}

/// Sentiment merged from the sentiment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentSummary {
    /// Mean sentence sentiment
    pub mean: f64,
    /// Sample standard deviation of sentence sentiment
    pub sd: Option<f64>,
}

/// One row of a summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    /// Document id
    pub document_id: String,
    /// Grouping value
    pub group: Option<String>,
    /// Eligible tokens in the document
    pub word_count: usize,
    /// Mean eligible tokens per sentence, over sentences with at least one
    pub sentence_words_mean: Option<f64>,
    /// Mean characters per eligible token
    pub word_length_mean: Option<f64>,
    /// Mean syllables per eligible token
    pub syllables_mean: Option<f64>,
    /// One entry per selected metric
    pub metrics: Vec<MetricSummary>,
    /// Only ever set in the with-stopwords variant
    pub sentiment: Option<SentimentSummary>,
}

/// Advisory notice that little of a document was normed for a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageWarning {
    /// Document id
    pub document_id: String,
    /// Metric name
    pub metric: String,
    /// Observed coverage
    pub coverage: f64,
    /// Variant the coverage was computed in
    pub variant: Variant,
}

/// One summary row per document for one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    variant: Variant,
    metrics: Vec<String>,
    rows: Vec<DocumentSummary>,
    warnings: Vec<CoverageWarning>,
}

impl SummaryTable {
    /// Variant of the table.
    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    /// Metric names, aligned with each row's `metrics`.
    #[must_use]
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Rows in document order.
    #[must_use]
    pub fn rows(&self) -> &[DocumentSummary] {
        &self.rows
    }

    /// Low-coverage notices.
    #[must_use]
    pub fn warnings(&self) -> &[CoverageWarning] {
        &self.warnings
    }

    /// Row for a document.
    #[must_use]
    pub fn get(&self, document_id: &str) -> Option<&DocumentSummary> {
        self.rows.iter().find(|r| r.document_id == document_id)
    }

    /// Whether sentiment columns belong to this table.
    #[must_use]
    pub fn has_sentiment(&self) -> bool {
        self.variant == Variant::WithStopwords
    }
}

#[derive(Default)]
struct Accumulator {
    eligible: usize,
    sentences: BTreeMap<usize, usize>,
    lengths: Vec<f64>,
    syllables: Vec<f64>,
    sums: Vec<f64>,
    rated: Vec<usize>,
}

/// Builds summary tables from a joined corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregator {
    coverage_warning_threshold: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_COVERAGE_WARNING_THRESHOLD)
    }
}

impl Aggregator {
    /// Aggregator warning at or below the given coverage.
    #[must_use]
    pub const fn new(coverage_warning_threshold: f64) -> Self {
        Self {
            coverage_warning_threshold,
        }
    }

    /// Coverage at or below which warnings are raised.
    #[must_use]
    pub const fn coverage_warning_threshold(&self) -> f64 {
        self.coverage_warning_threshold
    }

    /// With-stopwords table, with sentiment left-joined by document id.
    ///
    /// Documents missing from `sentiments` keep `None`. Two sentiment rows
    /// for the same document are a schema error.
    pub fn summarize_full(
        &self,
        joined: &JoinedCorpus,
        sentiments: &[DocumentSentiment],
    ) -> Result<SummaryTable> {
        let mut by_document: HashMap<&str, &DocumentSentiment> = HashMap::new();
        for sentiment in sentiments {
            if by_document
                .insert(sentiment.document_id.as_str(), sentiment)
                .is_some()
            {
                return Err(LexnormError::schema(format!(
                    "sentiment for document `{}` given twice",
                    sentiment.document_id
                )));
            }
        }

        let mut table = self.summarize(joined, Variant::WithStopwords);
        let mut merged = 0;
        for row in &mut table.rows {
            if let Some(sentiment) = by_document.remove(row.document_id.as_str()) {
                row.sentiment = Some(SentimentSummary {
                    mean: sentiment.mean,
                    sd: sentiment.sd,
                });
                merged += 1;
            }
        }
        if !by_document.is_empty() {
            debug!(
                unknown = by_document.len(),
                "Ignoring sentiment rows for unknown documents"
            );
        }
        info!(
            documents = table.rows.len(),
            with_sentiment = merged,
            "Merged document sentiment"
        );
        Ok(table)
    }

    /// Without-stopwords table. Never carries sentiment.
    #[must_use]
    pub fn summarize_content(&self, joined: &JoinedCorpus) -> SummaryTable {
        self.summarize(joined, Variant::WithoutStopwords)
    }

    /// Table for one variant, without sentiment.
    #[must_use]
    pub fn summarize(&self, joined: &JoinedCorpus, variant: Variant) -> SummaryTable {
        let metric_count = joined.metrics().len();
        let index: HashMap<&str, usize> = joined
            .documents()
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.as_str(), i))
            .collect();
        let mut accumulators: Vec<Accumulator> = joined
            .documents()
            .iter()
            .map(|_| Accumulator {
                sums: vec![0.0; metric_count],
                rated: vec![0; metric_count],
                ..Accumulator::default()
            })
            .collect();

        for joined_token in joined.tokens() {
            let token = &joined_token.token;
            if !variant.is_eligible(token) {
                continue;
            }
            let Some(&doc) = index.get(token.document_id.as_str()) else {
                continue;
            };
            let acc = &mut accumulators[doc];
            acc.eligible += 1;
            *acc.sentences.entry(token.sentence_id).or_default() += 1;
            if let Some(length) = token.char_length {
                acc.lengths.push(length as f64);
            }
            if let Some(syllables) = token.syllables {
                acc.syllables.push(syllables as f64);
            }
            for (m, value) in joined_token.metrics.iter().enumerate() {
                if let Some(value) = value {
                    acc.sums[m] += value;
                    acc.rated[m] += 1;
                }
            }
        }

        let mut rows = Vec::with_capacity(accumulators.len());
        let mut warnings = Vec::new();
        for (meta, acc) in joined.documents().iter().zip(accumulators) {
            let metrics: Vec<MetricSummary> = acc
                .sums
                .iter()
                .zip(&acc.rated)
                .map(|(&sum, &rated)| MetricSummary {
                    mean: (rated > 0).then(|| sum / rated as f64),
                    coverage: (acc.eligible > 0).then(|| rated as f64 / acc.eligible as f64),
                    rated,
                })
                .collect();

            for (name, summary) in joined.metrics().iter().zip(&metrics) {
                if let Some(coverage) = summary.coverage {
                    if coverage <= self.coverage_warning_threshold {
                        warn!(
                            document = %meta.id,
                            metric = %name,
                            coverage,
                            variant = %variant,
                            "Low norm coverage"
                        );
                        warnings.push(CoverageWarning {
                            document_id: meta.id.clone(),
                            metric: name.clone(),
                            coverage,
                            variant,
                        });
                    }
                }
            }

            let sentence_counts: Vec<f64> = acc.sentences.values().map(|&n| n as f64).collect();
            rows.push(DocumentSummary {
                document_id: meta.id.clone(),
                group: meta.group.clone(),
                word_count: acc.eligible,
                sentence_words_mean: mean(&sentence_counts),
                word_length_mean: mean(&acc.lengths),
                syllables_mean: mean(&acc.syllables),
                metrics,
                sentiment: None,
            });
        }

        info!(
            variant = %variant,
            documents = rows.len(),
            warnings = warnings.len(),
            "Summarized documents"
        );
        SummaryTable {
            variant,
            metrics: joined.metrics().to_vec(),
            rows,
            warnings,
        }
    }
}

/// Arithmetic mean; `None` for no values.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1); `None` for fewer than two values.
#[must_use]
pub fn sample_sd(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((squares / (values.len() - 1) as f64).sqrt())
}
