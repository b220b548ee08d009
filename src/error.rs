//! Error types for the lexnorm library.
//!
//! Structural failures (`Schema`, `DataIntegrity`) abort a run: a canonical
//! norm table that is partially wrong is worse than no table at all.
//! `Encoding` failures are raised per document and collected by the corpus
//! loader into a skip report so the rest of the corpus still gets processed.

use thiserror::Error;

/// Errors that can occur while reconciling norms or aggregating a corpus.
#[derive(Error, Debug)]
pub enum LexnormError {
    /// A required key or column is missing, or a token references an unknown document
    #[error("Schema error: {0}")]
    Schema(String),

    /// A merged norm cell could not be cast, or a row carried conflicting keys
    #[error("Data integrity error in column `{column}` for word `{word}`: {reason}")]
    DataIntegrity {
        /// Canonical word the offending cell belongs to
        word: String,
        /// Column (canonical name where known) holding the offending value
        column: String,
        /// What went wrong
        reason: String,
    },

    /// Document text is not valid UTF-8
    #[error("Encoding error in document {document}: {reason}")]
    Encoding {
        /// Document id, or row number when the id itself is unreadable
        document: String,
        /// Decoder message
        reason: String,
    },

    /// CSV reading or writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An annotator or sentiment collaborator failed
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

/// Convenience type alias for Result with `LexnormError`
pub type Result<T> = std::result::Result<T, LexnormError>;

impl LexnormError {
    /// Shorthand for a [`LexnormError::Schema`] error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Shorthand for a [`LexnormError::DataIntegrity`] error.
    pub fn integrity(
        word: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::DataIntegrity {
            word: word.into(),
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the whole pipeline.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Encoding { .. })
    }
}

impl From<config::ConfigError> for LexnormError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl From<serde_yaml::Error> for LexnormError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_message_names_word_and_column() {
        let err = LexnormError::integrity("cat", "cp_aoa", "cannot parse `3 5` as a number");
        let message = err.to_string();
        assert!(message.contains("cat"));
        assert!(message.contains("cp_aoa"));
    }

    #[test]
    fn test_only_encoding_is_recoverable() {
        assert!(LexnormError::schema("missing column").is_fatal());
        assert!(!LexnormError::Encoding {
            document: "3".to_string(),
            reason: "invalid utf-8".to_string()
        }
        .is_fatal());
    }
}
