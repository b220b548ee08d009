use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, histogram};
use tracing::info;

/// Norm rows read from raw sources
pub const NORM_ROWS_TOTAL: &str = "lexnorm_norm_rows_total";
/// Tokens passed through the join
pub const TOKENS_JOINED_TOTAL: &str = "lexnorm_tokens_joined_total";
/// Summary rows produced, labelled by variant
pub const DOCUMENTS_SUMMARIZED_TOTAL: &str = "lexnorm_documents_summarized_total";
/// Coverage warnings raised
pub const COVERAGE_WARNINGS_TOTAL: &str = "lexnorm_coverage_warnings_total";
/// Documents skipped because of encoding errors
pub const DOCUMENTS_SKIPPED_TOTAL: &str = "lexnorm_documents_skipped_total";
/// Per-stage duration
pub const STAGE_DURATION_SECONDS: &str = "lexnorm_stage_duration_seconds";

/// Records run metrics through the `metrics` facade and keeps local tallies
/// for the end-of-run summary.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    norm_rows: AtomicU64,
    tokens_joined: AtomicU64,
    documents_summarized: AtomicU64,
    coverage_warnings: AtomicU64,
    documents_skipped: AtomicU64,
}

/// Snapshot of the local tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunTally {
    /// Norm rows read
    pub norm_rows: u64,
    /// Tokens joined
    pub tokens_joined: u64,
    /// Summary rows over both variants
    pub documents_summarized: u64,
    /// Coverage warnings over both variants
    pub coverage_warnings: u64,
    /// Skipped documents
    pub documents_skipped: u64,
}

impl MetricsCollector {
    /// Fresh collector with zeroed tallies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record norm rows read from one study.
    pub fn record_norm_rows(&self, study: &str, rows: usize) {
        counter!(NORM_ROWS_TOTAL, "study" => study.to_string()).increment(rows as u64);
        self.norm_rows.fetch_add(rows as u64, Ordering::Relaxed);
    }

    /// Record tokens passed through the join.
    pub fn record_tokens_joined(&self, tokens: usize, matched: usize) {
        counter!(TOKENS_JOINED_TOTAL, "matched" => "true").increment(matched as u64);
        counter!(TOKENS_JOINED_TOTAL, "matched" => "false")
            .increment(tokens.saturating_sub(matched) as u64);
        self.tokens_joined.fetch_add(tokens as u64, Ordering::Relaxed);
    }

    /// Record one summary table.
    pub fn record_summary(&self, variant: &str, documents: usize, warnings: usize) {
        counter!(DOCUMENTS_SUMMARIZED_TOTAL, "variant" => variant.to_string())
            .increment(documents as u64);
        counter!(COVERAGE_WARNINGS_TOTAL, "variant" => variant.to_string())
            .increment(warnings as u64);
        self.documents_summarized
            .fetch_add(documents as u64, Ordering::Relaxed);
        self.coverage_warnings
            .fetch_add(warnings as u64, Ordering::Relaxed);
    }

    /// Record documents skipped at load time.
    pub fn record_skipped_documents(&self, documents: usize) {
        counter!(DOCUMENTS_SKIPPED_TOTAL).increment(documents as u64);
        self.documents_skipped
            .fetch_add(documents as u64, Ordering::Relaxed);
    }

    /// Record how long a stage took.
    pub fn record_stage(&self, stage: &str, duration: Duration) {
        histogram!(STAGE_DURATION_SECONDS, "stage" => stage.to_string())
            .record(duration.as_secs_f64());
    }

    /// Current local tallies.
    #[must_use]
    pub fn tally(&self) -> RunTally {
        RunTally {
            norm_rows: self.norm_rows.load(Ordering::Relaxed),
            tokens_joined: self.tokens_joined.load(Ordering::Relaxed),
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            coverage_warnings: self.coverage_warnings.load(Ordering::Relaxed),
            documents_skipped: self.documents_skipped.load(Ordering::Relaxed),
        }
    }

    /// Log the tallies at the end of a run.
    pub fn log_summary(&self) {
        let tally = self.tally();
        info!(
            norm_rows = tally.norm_rows,
            tokens_joined = tally.tokens_joined,
            documents_summarized = tally.documents_summarized,
            coverage_warnings = tally.coverage_warnings,
            documents_skipped = tally.documents_skipped,
            "Run totals"
        );
    }
}
