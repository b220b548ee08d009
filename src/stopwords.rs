//! Named, swappable stopword lists.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};

use stop_words::{get, LANGUAGE};

use crate::error::Result;
use crate::norms::normalize_word;

/// A named set of stopwords, stored in the same normalized form as join keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopwordList {
    name: String,
    words: HashSet<String>,
}

impl StopwordList {
    /// The English list shipped with the `stop-words` crate.
    #[must_use]
    pub fn english() -> Self {
        Self::from_words("english", get(LANGUAGE::English).iter())
    }

    /// A list with no words; every token counts as a content word.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            name: "none".to_string(),
            words: HashSet::new(),
        }
    }

    /// Build a list from arbitrary words; they go through [`normalize_word`].
    pub fn from_words<I, S>(name: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            words: words
                .into_iter()
                .map(|w| normalize_word(w.as_ref()))
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Read one word per line; blank lines and `#` comments are ignored.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut words = Vec::new();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let word = line.split('#').next().unwrap_or_default().trim();
            if !word.is_empty() {
                words.push(word.to_string());
            }
        }
        Ok(Self::from_words(name, words))
    }

    /// Add more words to the list.
    #[must_use]
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.words.extend(
            extra
                .into_iter()
                .map(|w| normalize_word(w.as_ref()))
                .filter(|w| !w.is_empty()),
        );
        self
    }

    /// Name of the list, for logs and reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Membership of the normalized word, so case, composition and
    /// typographic apostrophes do not matter.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&normalize_word(word))
    }

    /// Number of words in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the list has no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
