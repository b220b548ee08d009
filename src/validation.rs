use std::collections::HashSet;
use std::path::Path;

use crate::error::{LexnormError, Result};

fn invalid(message: impl Into<String>) -> LexnormError {
    LexnormError::InvalidConfig(message.into())
}

/// Validation utilities for configuration and command-line input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the list of metrics to carry into the join.
    ///
    /// Only the shape of the list is checked here. Whether each name is a
    /// column of the norm table is only known once the table is loaded.
    pub fn validate_metric_selection<S: AsRef<str>>(metrics: &[S]) -> Result<()> {
        if metrics.is_empty() {
            return Err(invalid("At least one metric must be selected"));
        }

        let mut seen = HashSet::new();
        for metric in metrics {
            let metric = metric.as_ref().trim();
            if metric.is_empty() {
                return Err(invalid("Metric name cannot be empty"));
            }
            if !seen.insert(metric) {
                return Err(invalid(format!("Metric selected more than once: {metric}")));
            }
        }

        Ok(())
    }

    /// Validate the coverage warning threshold
    pub fn validate_threshold(threshold: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(format!(
                "Coverage warning threshold must be within [0, 1], got {threshold}"
            )));
        }

        Ok(())
    }

    /// Validate a single-character delimiter
    pub fn validate_delimiter(delimiter: &str) -> Result<u8> {
        match delimiter {
            "\\t" | "tab" => Ok(b'\t'),
            d if d.len() == 1 && d.is_ascii() => Ok(d.as_bytes()[0]),
            d => Err(invalid(format!(
                "Delimiter must be a single ASCII character, got {d:?}"
            ))),
        }
    }

    /// Validate file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.trim().is_empty() {
            return Err(invalid("File path cannot be empty"));
        }

        if path_str.contains('\0') {
            return Err(invalid("File path contains a NUL byte"));
        }

        // Check path length
        if path_str.len() > 4096 {
            return Err(invalid("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate that an input file exists
    pub fn validate_input_file(path: &Path) -> Result<()> {
        Self::validate_file_path(path)?;

        if !path.is_file() {
            return Err(invalid(format!("Input file does not exist: {}", path.display())));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
