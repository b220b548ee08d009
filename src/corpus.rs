//! Documents and the annotated token store.
//!
//! Documents are read from a delimited table with a `text` column. Rows whose
//! text is not valid UTF-8 are skipped and reported rather than failing the
//! run. Tokens produced by an [`Annotator`](crate::annotate::Annotator) are
//! attached to their document, flagged as stopwords or not, and given a
//! character length and syllable count when they are words.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CorpusConfig;
use crate::error::{LexnormError, Result};
use crate::stopwords::StopwordList;

/// A document to annotate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id, unique within a corpus
    pub id: String,
    /// Value of the grouping variable (e.g. author), if one is configured
    pub group: Option<String>,
    /// Raw text
    pub text: String,
    /// Every other input column
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Document without group or metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: None,
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the grouping value.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Decode raw text, failing with an encoding error on invalid UTF-8.
    pub fn from_bytes(id: impl Into<String>, text: &[u8]) -> Result<Self> {
        let id = id.into();
        let text = std::str::from_utf8(text).map_err(|e| LexnormError::Encoding {
            document: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(id, text))
    }
}

/// A document row that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    /// 1-based data row number
    pub row: usize,
    /// Document id as far as it could be read
    pub document: String,
    /// Why the row was skipped
    pub reason: String,
}

/// Result of reading a document table.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoad {
    /// Decoded documents, in input order
    pub documents: Vec<Document>,
    /// Rows skipped because of encoding errors
    pub skipped: Vec<SkippedDocument>,
}

/// Read documents from a delimited table.
///
/// The text column (and the id/group columns when configured) must exist,
/// otherwise this fails with a schema error. Without an id column the 1-based
/// row number is the document id. Repeated ids are a schema error.
pub fn load_documents<R: Read>(reader: R, config: &CorpusConfig) -> Result<DocumentLoad> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter_byte())
        .from_reader(reader);

    let headers = csv_reader
        .byte_headers()?
        .iter()
        .map(|h| {
            std::str::from_utf8(h)
                .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
                .map_err(|_| LexnormError::schema("document table header is not valid UTF-8"))
        })
        .collect::<Result<Vec<_>>>()?;

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                LexnormError::schema(format!(
                    "document table has no `{name}` column (found: {headers:?})"
                ))
            })
    };
    let text_index = find(&config.text_column)?;
    let id_index = config.id_column.as_deref().map(find).transpose()?;
    let group_index = config.group_column.as_deref().map(find).transpose()?;

    let mut load = DocumentLoad::default();
    let mut seen = HashSet::new();

    for (line, record) in csv_reader.byte_records().enumerate() {
        let record = record?;
        let row = line + 1;
        let cell = |i: usize| record.get(i).unwrap_or_default();

        let id = match id_index {
            Some(i) => match std::str::from_utf8(cell(i)) {
                Ok(id) => id.trim().to_string(),
                Err(e) => {
                    load.skipped.push(SkippedDocument {
                        row,
                        document: String::from_utf8_lossy(cell(i)).into_owned(),
                        reason: format!("document id: {e}"),
                    });
                    continue;
                }
            },
            None => row.to_string(),
        };
        if id.is_empty() {
            return Err(LexnormError::schema(format!("row {row} has an empty document id")));
        }
        if !seen.insert(id.clone()) {
            return Err(LexnormError::schema(format!("document id `{id}` is repeated")));
        }

        let mut document = match Document::from_bytes(id.clone(), cell(text_index)) {
            Ok(document) => document,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(row, document = %id, error = %err, "Skipping undecodable document");
                load.skipped.push(SkippedDocument {
                    row,
                    document: id,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        for (i, header) in headers.iter().enumerate() {
            if i == text_index || Some(i) == id_index {
                continue;
            }
            let value = String::from_utf8_lossy(cell(i)).into_owned();
            if Some(i) == group_index {
                document.group = Some(value.clone());
            }
            document.metadata.insert(header.clone(), value);
        }

        load.documents.push(document);
    }

    info!(
        documents = load.documents.len(),
        skipped = load.skipped.len(),
        "Loaded document table"
    );
    Ok(load)
}

/// Grammatical tag assigned by the annotator (Universal POS tags expected).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PosTag(String);

impl PosTag {
    /// Punctuation tag
    pub const PUNCT: &'static str = "PUNCT";
    /// Numeral tag
    pub const NUM: &'static str = "NUM";

    /// Wrap a tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag as given by the annotator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is punctuation.
    #[must_use]
    pub fn is_punctuation(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::PUNCT)
    }

    /// Whether the token is a numeral.
    #[must_use]
    pub fn is_numeral(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::NUM)
    }

    /// Punctuation and numerals never take part in semantic aggregation.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.is_punctuation() || self.is_numeral()
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token record produced by an annotator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedToken {
    /// Owning document
    pub document_id: String,
    /// Sentence number within the document
    pub sentence_id: usize,
    /// Surface form
    pub token: String,
    /// Grammatical tag
    pub tag: PosTag,
}

impl AnnotatedToken {
    /// Convenience constructor.
    pub fn new(
        document_id: impl Into<String>,
        sentence_id: usize,
        token: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            sentence_id,
            token: token.into(),
            tag: PosTag::new(tag),
        }
    }
}

/// Id and grouping value of a document in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMeta {
    /// Document id
    pub id: String,
    /// Grouping value
    pub group: Option<String>,
}

/// One token of the corpus with its derived attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// Owning document
    pub document_id: String,
    /// Grouping value of the owning document
    pub group: Option<String>,
    /// Sentence number within the document
    pub sentence_id: usize,
    /// 0-based position within the document
    pub position: usize,
    /// Surface form as annotated
    pub surface: String,
    /// Grammatical tag
    pub tag: PosTag,
    /// Member of the configured stopword list
    pub is_stopword: bool,
    /// Characters in the surface form; `None` for punctuation and numerals
    pub char_length: Option<usize>,
    /// Estimated syllables; `None` for punctuation, numerals and letterless tokens
    pub syllables: Option<usize>,
}

impl Token {
    /// Whether the token is punctuation or a numeral.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.tag.is_excluded()
    }
}

/// Annotated tokens attached to their documents.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusTokenStore {
    documents: Vec<DocumentMeta>,
    tokens: Vec<Token>,
    stopword_list: String,
}

impl CorpusTokenStore {
    /// Attach annotator output to the documents it came from.
    ///
    /// Every document is kept, including those without tokens. A token whose
    /// document id is not among `documents` means the annotator and the
    /// document table are out of step, and fails with a schema error.
    pub fn build(
        documents: &[Document],
        annotated: Vec<AnnotatedToken>,
        stopwords: &StopwordList,
    ) -> Result<Self> {
        let metas: Vec<DocumentMeta> = documents
            .iter()
            .map(|d| DocumentMeta {
                id: d.id.clone(),
                group: d.group.clone(),
            })
            .collect();
        let index: HashMap<&str, usize> = metas
            .iter()
            .enumerate()
            .map(|(i, meta)| (meta.id.as_str(), i))
            .collect();

        let mut positions = vec![0usize; metas.len()];
        let mut tokens = Vec::with_capacity(annotated.len());

        for token in annotated {
            let Some(&doc) = index.get(token.document_id.as_str()) else {
                return Err(LexnormError::schema(format!(
                    "token `{}` references unknown document `{}`",
                    token.token, token.document_id
                )));
            };

            let position = positions[doc];
            positions[doc] += 1;

            let excluded = token.tag.is_excluded();
            let char_length = (!excluded).then(|| token.token.chars().count());
            let syllables = if excluded {
                None
            } else {
                count_syllables(&token.token)
            };

            tokens.push(Token {
                is_stopword: stopwords.contains(&token.token),
                group: metas[doc].group.clone(),
                document_id: token.document_id,
                sentence_id: token.sentence_id,
                position,
                surface: token.token,
                tag: token.tag,
                char_length,
                syllables,
            });
        }

        info!(
            documents = metas.len(),
            tokens = tokens.len(),
            stopwords = stopwords.name(),
            "Built corpus token store"
        );
        Ok(Self {
            documents: metas,
            tokens,
            stopword_list: stopwords.name().to_string(),
        })
    }

    /// Documents in input order.
    #[must_use]
    pub fn documents(&self) -> &[DocumentMeta] {
        &self.documents
    }

    /// Tokens in annotator order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens of one document.
    pub fn tokens_for<'a>(&'a self, document_id: &'a str) -> impl Iterator<Item = &'a Token> + 'a {
        self.tokens
            .iter()
            .filter(move |t| t.document_id == document_id)
    }

    /// Name of the stopword list used for the flags.
    #[must_use]
    pub fn stopword_list(&self) -> &str {
        &self.stopword_list
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the store holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn is_vowel(c: char) -> bool {
    matches!(
        c,
        'a' | 'e' | 'i' | 'o' | 'u' | 'y' | 'à' | 'á' | 'â' | 'ä' | 'è' | 'é' | 'ê' | 'ë' | 'ì'
            | 'í' | 'î' | 'ï' | 'ò' | 'ó' | 'ô' | 'ö' | 'ù' | 'ú' | 'û' | 'ü'
    )
}

/// Estimate English syllables by counting vowel groups, dropping a silent
/// final `e` (but not the `-le` of "table"). Returns `None` for tokens
/// without letters.
#[must_use]
pub fn count_syllables(word: &str) -> Option<usize> {
    let letters: Vec<char> = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }

    let mut groups = 0;
    let mut previous_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            groups += 1;
        }
        previous_vowel = vowel;
    }

    let n = letters.len();
    if groups > 1 && n > 2 && letters[n - 1] == 'e' && !is_vowel(letters[n - 2]) {
        let consonant_le = letters[n - 2] == 'l' && !is_vowel(letters[n - 3]);
        if !consonant_le {
            groups -= 1;
        }
    }

    Some(groups.max(1))
}
