//! Annotation and sentiment collaborators.
//!
//! The pipeline only depends on the [`Annotator`] and [`SentimentScorer`]
//! traits; a POS tagger or an external sentiment service can be plugged in
//! behind them. [`RuleAnnotator`] and [`LexiconSentiment`] are lightweight
//! defaults so the CLI runs without one.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::aggregate::{mean, sample_sd};
use crate::corpus::{AnnotatedToken, Document, PosTag};
use crate::error::{LexnormError, Result};
use crate::validation::InputValidator;

/// Splits documents into sentences and tagged tokens.
pub trait Annotator {
    /// Tokens of every document, in document order.
    fn annotate(&self, documents: &[Document]) -> Result<Vec<AnnotatedToken>>;
}

/// Scores documents by sentence-level sentiment.
pub trait SentimentScorer {
    /// One row per document with at least one word; empty documents are left out.
    fn score(&self, documents: &[Document]) -> Result<Vec<DocumentSentiment>>;
}

/// Per-document sentiment produced by a [`SentimentScorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSentiment {
    /// Document id
    pub document_id: String,
    /// Mean sentence sentiment
    pub mean: f64,
    /// Sample standard deviation of sentence sentiment; `None` for one sentence
    pub sd: Option<f64>,
    /// Words the scorer considered
    pub word_count: usize,
}

/// Tag for tokens the rule annotator recognises as words.
pub const WORD_TAG: &str = "X";

/// Regex tokenizer: sentences end at terminal punctuation followed by
/// whitespace, tokens are words, numbers or single punctuation marks.
pub struct RuleAnnotator {
    boundary_regex: Regex,
    token_regex: Regex,
}

impl RuleAnnotator {
    /// Compile the tokenizer.
    pub fn new() -> Result<Self> {
        let boundary_regex = Regex::new(r#"[.!?\u{2026}]+["')\]\u{201d}\u{2019}]*(?:\s+|$)"#)
            .map_err(|e| LexnormError::Collaborator(format!("Failed to compile sentence regex: {e}")))?;
        let token_regex = Regex::new(r"\p{L}[\p{L}\p{M}'\u{2019}\-]*|\p{N}+(?:[.,]\p{N}+)*|[^\s\p{L}\p{N}]")
            .map_err(|e| LexnormError::Collaborator(format!("Failed to compile token regex: {e}")))?;
        Ok(Self {
            boundary_regex,
            token_regex,
        })
    }

    /// Split text into trimmed, non-empty sentences.
    #[must_use]
    pub fn sentences<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut sentences = Vec::new();
        let mut start = 0;
        for boundary in self.boundary_regex.find_iter(text) {
            let sentence = text[start..boundary.end()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = boundary.end();
        }
        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }
        sentences
    }

    /// Tokens of one sentence with their tags.
    #[must_use]
    pub fn tokenize(&self, sentence: &str) -> Vec<(String, &'static str)> {
        self.token_regex
            .find_iter(sentence)
            .map(|m| {
                let token = m.as_str();
                let tag = match token.chars().next() {
                    Some(c) if c.is_alphabetic() => WORD_TAG,
                    Some(c) if c.is_numeric() => PosTag::NUM,
                    _ => PosTag::PUNCT,
                };
                (token.to_string(), tag)
            })
            .collect()
    }

    /// Lowercased words of a sentence, punctuation and numbers left out.
    fn words(&self, sentence: &str) -> Vec<String> {
        self.tokenize(sentence)
            .into_iter()
            .filter(|(_, tag)| *tag == WORD_TAG)
            .map(|(token, _)| token.to_lowercase())
            .collect()
    }
}

fn prepare(text: &str) -> String {
    InputValidator::sanitize_text(text).nfc().collect()
}

impl Annotator for RuleAnnotator {
    fn annotate(&self, documents: &[Document]) -> Result<Vec<AnnotatedToken>> {
        let mut tokens = Vec::new();
        for document in documents {
            let text = prepare(&document.text);
            for (index, sentence) in self.sentences(&text).into_iter().enumerate() {
                tokens.extend(self.tokenize(sentence).into_iter().map(|(token, tag)| {
                    AnnotatedToken::new(document.id.clone(), index + 1, token, tag)
                }));
            }
        }
        Ok(tokens)
    }
}

const POLARITY: &[(&str, f64)] = &[
    ("good", 0.5),
    ("great", 0.75),
    ("excellent", 1.0),
    ("amazing", 1.0),
    ("wonderful", 0.9),
    ("fantastic", 0.9),
    ("happy", 0.6),
    ("joy", 0.75),
    ("love", 1.0),
    ("like", 0.5),
    ("best", 0.75),
    ("better", 0.6),
    ("beautiful", 0.75),
    ("perfect", 1.0),
    ("brilliant", 0.9),
    ("delightful", 0.75),
    ("pleased", 0.6),
    ("grateful", 0.75),
    ("hope", 0.5),
    ("kind", 0.5),
    ("bad", -0.5),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("worst", -1.0),
    ("hate", -1.0),
    ("poor", -0.6),
    ("sad", -0.6),
    ("angry", -0.75),
    ("upset", -0.6),
    ("afraid", -0.6),
    ("fear", -0.75),
    ("cruel", -0.9),
    ("miserable", -0.9),
    ("hopeless", -0.9),
    ("worried", -0.6),
    ("pain", -0.6),
    ("grief", -0.9),
    ("dark", -0.25),
    ("death", -0.75),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5),
    ("extremely", 2.0),
    ("incredibly", 2.0),
    ("absolutely", 2.0),
    ("completely", 1.8),
    ("really", 1.3),
    ("so", 1.2),
    ("quite", 1.2),
    ("rather", 1.1),
    ("somewhat", 0.8),
    ("slightly", 0.7),
    ("barely", 0.5),
    ("hardly", 0.5),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "nobody", "nowhere", "neither", "nor", "isn't",
    "wasn't", "don't", "doesn't", "didn't", "can't", "won't",
];

/// Lexicon scorer: each sentence scores the sum of its polarized words,
/// scaled by intensifiers and flipped by a negation within the two preceding
/// words, divided by the square root of the sentence's word count.
pub struct LexiconSentiment {
    annotator: RuleAnnotator,
    polarity: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
}

impl LexiconSentiment {
    /// Build the scorer with the built-in lexicon.
    pub fn new() -> Result<Self> {
        Ok(Self {
            annotator: RuleAnnotator::new()?,
            polarity: POLARITY.iter().copied().collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
            negations: NEGATIONS.iter().copied().collect(),
        })
    }

    /// Sentiment of one sentence given its lowercased words.
    #[must_use]
    pub fn score_words(&self, words: &[String]) -> f64 {
        if words.is_empty() {
            return 0.0;
        }
        let mut total = 0.0;
        for (i, word) in words.iter().enumerate() {
            let Some(&weight) = self.polarity.get(word.as_str()) else {
                continue;
            };
            let mut score = weight;
            if let Some(&intensity) = i
                .checked_sub(1)
                .and_then(|p| self.intensifiers.get(words[p].as_str()))
            {
                score *= intensity;
            }
            let negated = words[i.saturating_sub(2)..i]
                .iter()
                .any(|w| self.negations.contains(w.as_str()));
            if negated {
                score = -score * 0.8;
            }
            total += score;
        }
        total / (words.len() as f64).sqrt()
    }

    /// Sentiment of each sentence of a text; sentences without words are skipped.
    #[must_use]
    pub fn sentence_scores(&self, text: &str) -> (Vec<f64>, usize) {
        let text = prepare(text);
        let mut scores = Vec::new();
        let mut word_count = 0;
        for sentence in self.annotator.sentences(&text) {
            let words = self.annotator.words(sentence);
            if words.is_empty() {
                continue;
            }
            word_count += words.len();
            scores.push(self.score_words(&words));
        }
        (scores, word_count)
    }
}

impl SentimentScorer for LexiconSentiment {
    fn score(&self, documents: &[Document]) -> Result<Vec<DocumentSentiment>> {
        Ok(documents
            .iter()
            .filter_map(|document| {
                let (scores, word_count) = self.sentence_scores(&document.text);
                Some(DocumentSentiment {
                    document_id: document.id.clone(),
                    mean: mean(&scores)?,
                    sd: sample_sd(&scores),
                    word_count,
                })
            })
            .collect())
    }
}
