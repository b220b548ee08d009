//! End-to-end run: canonicalize norms, annotate, join, aggregate.

use tracing::info;

use crate::aggregate::{Aggregator, SummaryTable};
use crate::annotate::{Annotator, LexiconSentiment, RuleAnnotator, SentimentScorer};
use crate::config::AppConfig;
use crate::corpus::{CorpusTokenStore, Document, SkippedDocument};
use crate::error::Result;
use crate::join::{join_norms, JoinedCorpus, MetricSelection};
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::norms::{canonicalize, CanonicalNormTable, NormSource};
use crate::stopwords::StopwordList;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Token-level join, one row per token
    pub joined: JoinedCorpus,
    /// Summary over all word tokens, with sentiment
    pub with_stopwords: SummaryTable,
    /// Summary with stopwords removed, without sentiment
    pub without_stopwords: SummaryTable,
}

/// Runs the stages in order with the configured collaborators.
pub struct Pipeline {
    annotator: Box<dyn Annotator>,
    sentiment: Box<dyn SentimentScorer>,
    stopwords: StopwordList,
    aggregator: Aggregator,
    metrics: MetricsCollector,
}

impl Pipeline {
    /// Pipeline with explicit collaborators.
    pub fn new(
        annotator: Box<dyn Annotator>,
        sentiment: Box<dyn SentimentScorer>,
        stopwords: StopwordList,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            annotator,
            sentiment,
            stopwords,
            aggregator,
            metrics: MetricsCollector::new(),
        }
    }

    /// Pipeline with the built-in rule annotator and lexicon sentiment.
    pub fn with_defaults(stopwords: StopwordList, aggregator: Aggregator) -> Result<Self> {
        Ok(Self::new(
            Box::new(RuleAnnotator::new()?),
            Box::new(LexiconSentiment::new()?),
            stopwords,
            aggregator,
        ))
    }

    /// Pipeline built from the stopword and aggregation settings.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::with_defaults(
            config.stopwords.build()?,
            Aggregator::new(config.aggregation.coverage_warning_threshold),
        )
    }

    /// Run tallies.
    #[must_use]
    pub const fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Stopword list in use.
    #[must_use]
    pub const fn stopwords(&self) -> &StopwordList {
        &self.stopwords
    }

    /// Merge raw norm tables into the canonical table.
    pub fn load_norms(&self, sources: &[NormSource]) -> Result<CanonicalNormTable> {
        for source in sources {
            self.metrics.record_norm_rows(source.study().name(), source.len());
        }
        self.timed("canonicalize", || canonicalize(sources))
    }

    /// Count documents dropped at load time.
    pub fn record_skipped(&self, skipped: &[SkippedDocument]) {
        if !skipped.is_empty() {
            self.metrics.record_skipped_documents(skipped.len());
        }
    }

    /// Annotate `documents`, join them against `table` on the named metrics
    /// and summarize both variants.
    ///
    /// The metric selection is resolved before any annotation work, so an
    /// unknown metric fails fast.
    pub fn run<S: AsRef<str>>(
        &self,
        table: &CanonicalNormTable,
        documents: &[Document],
        metrics: &[S],
    ) -> Result<PipelineOutput> {
        let selection = MetricSelection::new(table, metrics)?;

        let annotated = self.timed("annotate", || self.annotator.annotate(documents))?;
        let store = CorpusTokenStore::build(documents, annotated, &self.stopwords)?;

        let joined = self.timed("join", || join_norms(&store, table, &selection));
        self.metrics
            .record_tokens_joined(joined.tokens().len(), joined.matched_count());

        let sentiments = self.timed("sentiment", || self.sentiment.score(documents))?;

        let with_stopwords =
            self.timed("aggregate", || self.aggregator.summarize_full(&joined, &sentiments))?;
        let without_stopwords =
            self.timed("aggregate", || self.aggregator.summarize_content(&joined));

        for summary in [&with_stopwords, &without_stopwords] {
            self.metrics.record_summary(
                summary.variant().name(),
                summary.rows().len(),
                summary.warnings().len(),
            );
        }

        info!(
            documents = documents.len(),
            tokens = joined.tokens().len(),
            metrics = selection.len(),
            "Pipeline finished"
        );
        Ok(PipelineOutput {
            joined,
            with_stopwords,
            without_stopwords,
        })
    }

    fn timed<T>(&self, stage: &str, f: impl FnOnce() -> T) -> T {
        let timer = OperationTimer::new(stage);
        let result = f();
        self.metrics.record_stage(stage, timer.finish());
        result
    }
}
