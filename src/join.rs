//! Left join of corpus tokens against the canonical norm table.

use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use crate::corpus::{CorpusTokenStore, DocumentMeta, Token};
use crate::error::{LexnormError, Result};
use crate::norms::{normalize_word, CanonicalNormTable};

/// Explicit list of metric columns carried from the norm table into the join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelection {
    names: Vec<String>,
    indices: Vec<usize>,
}

impl MetricSelection {
    /// Resolve metric names against a table.
    ///
    /// An empty list, a repeated name or a name the table does not have is a
    /// schema error.
    pub fn new<S: AsRef<str>>(table: &CanonicalNormTable, names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(LexnormError::schema("no metrics selected"));
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(names.len());
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if !seen.insert(name) {
                return Err(LexnormError::schema(format!("metric `{name}` selected twice")));
            }
            let index = table.column_index(name).ok_or_else(|| {
                LexnormError::schema(format!(
                    "metric `{name}` is not in the norm table (available: {:?})",
                    table.columns()
                ))
            })?;
            resolved.push(name.to_string());
            indices.push(index);
        }

        Ok(Self {
            names: resolved,
            indices,
        })
    }

    /// Selected metric names, in selection order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of selected metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed selection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A token with the values of the selected metrics (`None` when unmatched or
/// not rated).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedToken {
    /// The corpus token
    #[serde(flatten)]
    pub token: Token,
    /// Whether the token's normalized form has a norm entry
    pub matched: bool,
    /// Metric values aligned with the selection
    pub metrics: Vec<Option<f64>>,
}

/// Output of the join: every token once, plus the documents and metric names
/// the aggregator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedCorpus {
    metrics: Vec<String>,
    documents: Vec<DocumentMeta>,
    tokens: Vec<JoinedToken>,
}

impl JoinedCorpus {
    /// Assemble a joined corpus from parts. Every token's metric vector must
    /// match the metric list and every token must belong to a listed document.
    pub fn from_parts(
        metrics: Vec<String>,
        documents: Vec<DocumentMeta>,
        tokens: Vec<JoinedToken>,
    ) -> Result<Self> {
        let ids: HashSet<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        for token in &tokens {
            if token.metrics.len() != metrics.len() {
                return Err(LexnormError::schema(format!(
                    "token `{}` carries {} metric values, expected {}",
                    token.token.surface,
                    token.metrics.len(),
                    metrics.len()
                )));
            }
            if !ids.contains(token.token.document_id.as_str()) {
                return Err(LexnormError::schema(format!(
                    "token `{}` references unknown document `{}`",
                    token.token.surface, token.token.document_id
                )));
            }
        }
        Ok(Self {
            metrics,
            documents,
            tokens,
        })
    }

    /// Selected metric names.
    #[must_use]
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Documents in input order.
    #[must_use]
    pub fn documents(&self) -> &[DocumentMeta] {
        &self.documents
    }

    /// Joined tokens, in store order.
    #[must_use]
    pub fn tokens(&self) -> &[JoinedToken] {
        &self.tokens
    }

    /// Number of tokens with a norm entry.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.matched).count()
    }
}

/// Attach the selected norm values to every token.
///
/// Left join on the normalized surface form: tokens without an entry keep
/// `None` for every metric. Punctuation and numerals are looked up like any
/// other token; excluding them is the aggregator's job.
#[must_use]
pub fn join_norms(
    store: &CorpusTokenStore,
    table: &CanonicalNormTable,
    selection: &MetricSelection,
) -> JoinedCorpus {
    let tokens: Vec<JoinedToken> = store
        .tokens()
        .iter()
        .map(|token| {
            let entry = table.get_normalized(&normalize_word(&token.surface));
            JoinedToken {
                token: token.clone(),
                matched: entry.is_some(),
                metrics: selection
                    .indices
                    .iter()
                    .map(|&i| entry.and_then(|values| values[i]))
                    .collect(),
            }
        })
        .collect();

    let corpus = JoinedCorpus {
        metrics: selection.names.clone(),
        documents: store.documents().to_vec(),
        tokens,
    };
    info!(
        tokens = corpus.tokens.len(),
        matched = corpus.matched_count(),
        metrics = ?corpus.metrics,
        "Joined tokens against norms"
    );
    corpus
}
