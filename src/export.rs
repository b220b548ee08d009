//! Table exports.
//!
//! Every table is written as a flat grid of cells: CSV with a header row and
//! the configured missing marker for absent values, or JSON as an array of
//! objects with `null` for absent values. The writers take any
//! [`io::Write`](std::io::Write) so tables can be rendered in memory.

use std::fmt;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use csv::Writer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::aggregate::{CoverageWarning, SummaryTable};
use crate::config::ExportConfig;
use crate::corpus::SkippedDocument;
use crate::error::{LexnormError, Result};
use crate::join::JoinedCorpus;
use crate::norms::CanonicalNormTable;
use crate::pipeline::PipelineOutput;

/// Directory name format for timestamped runs.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Serialization used for exported tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Pretty-printed JSON array of row objects
    Json,
}

impl ExportFormat {
    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = LexnormError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(LexnormError::InvalidConfig(format!(
                "Invalid export format: {other}. Must be one of: [\"csv\", \"json\"]"
            ))),
        }
    }
}

/// A header row plus rows of cells; `Value::Null` marks a missing value.
struct Grid {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

fn number(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_string()))
}

/// Writes tables in one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exporter {
    format: ExportFormat,
    missing_marker: String,
}

impl Exporter {
    /// Exporter writing `format`, using `missing_marker` for absent CSV cells.
    pub fn new(format: ExportFormat, missing_marker: impl Into<String>) -> Self {
        Self {
            format,
            missing_marker: missing_marker.into(),
        }
    }

    /// Exporter for the configured format and marker.
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        Ok(Self::new(
            config.format.parse()?,
            config.missing_marker.clone(),
        ))
    }

    /// Format written by this exporter.
    #[must_use]
    pub const fn format(&self) -> ExportFormat {
        self.format
    }

    /// One row per token, with every joined metric.
    pub fn write_tokens<W: Write>(&self, writer: W, joined: &JoinedCorpus) -> Result<()> {
        let mut headers: Vec<String> = [
            "document_id",
            "group",
            "sentence_id",
            "position",
            "token",
            "tag",
            "is_stopword",
            "char_length",
            "syllables",
            "matched",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        headers.extend(joined.metrics().iter().cloned());

        let rows = joined
            .tokens()
            .iter()
            .map(|joined_token| {
                let token = &joined_token.token;
                let mut row = vec![
                    Value::String(token.document_id.clone()),
                    text(token.group.as_deref()),
                    Value::from(token.sentence_id),
                    Value::from(token.position),
                    Value::String(token.surface.clone()),
                    Value::String(token.tag.to_string()),
                    Value::Bool(token.is_stopword),
                    token.char_length.map_or(Value::Null, Value::from),
                    token.syllables.map_or(Value::Null, Value::from),
                    Value::Bool(joined_token.matched),
                ];
                row.extend(joined_token.metrics.iter().map(|v| number(*v)));
                row
            })
            .collect();

        self.write_grid(writer, &Grid { headers, rows })
    }

    /// One row per document. Each metric gets `<metric>_mean` and
    /// `<metric>_coverage` columns; sentiment columns only appear in the
    /// with-stopwords table.
    pub fn write_summary<W: Write>(&self, writer: W, table: &SummaryTable) -> Result<()> {
        let mut headers: Vec<String> = [
            "document_id",
            "group",
            "word_count",
            "sentence_words_mean",
            "word_length_mean",
            "syllables_mean",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        for metric in table.metrics() {
            headers.push(format!("{metric}_mean"));
            headers.push(format!("{metric}_coverage"));
        }
        let with_sentiment = table.has_sentiment();
        if with_sentiment {
            headers.push("sentiment_mean".to_string());
            headers.push("sentiment_sd".to_string());
        }

        let rows = table
            .rows()
            .iter()
            .map(|summary| {
                let mut row = vec![
                    Value::String(summary.document_id.clone()),
                    text(summary.group.as_deref()),
                    Value::from(summary.word_count),
                    number(summary.sentence_words_mean),
                    number(summary.word_length_mean),
                    number(summary.syllables_mean),
                ];
                for metric in &summary.metrics {
                    row.push(number(metric.mean));
                    row.push(number(metric.coverage));
                }
                if with_sentiment {
                    row.push(number(summary.sentiment.map(|s| s.mean)));
                    row.push(number(summary.sentiment.and_then(|s| s.sd)));
                }
                row
            })
            .collect();

        self.write_grid(writer, &Grid { headers, rows })
    }

    /// The canonical norm table: `word` plus every canonical column.
    pub fn write_canonical<W: Write>(&self, writer: W, table: &CanonicalNormTable) -> Result<()> {
        let mut headers = vec!["word".to_string()];
        headers.extend(table.columns().iter().cloned());

        let rows = table
            .iter()
            .map(|(word, values)| {
                std::iter::once(Value::String(word.to_string()))
                    .chain(values.iter().map(|v| number(*v)))
                    .collect()
            })
            .collect();

        self.write_grid(writer, &Grid { headers, rows })
    }

    /// Documents skipped at load time and why.
    pub fn write_skipped<W: Write>(&self, writer: W, skipped: &[SkippedDocument]) -> Result<()> {
        let rows = skipped
            .iter()
            .map(|s| {
                vec![
                    Value::from(s.row),
                    Value::String(s.document.clone()),
                    Value::String(s.reason.clone()),
                ]
            })
            .collect();

        self.write_grid(
            writer,
            &Grid {
                headers: vec!["row".into(), "document".into(), "reason".into()],
                rows,
            },
        )
    }

    /// Coverage warnings of one or more summary tables.
    pub fn write_warnings<W: Write>(&self, writer: W, warnings: &[CoverageWarning]) -> Result<()> {
        let rows = warnings
            .iter()
            .map(|w| {
                vec![
                    Value::String(w.document_id.clone()),
                    Value::String(w.metric.clone()),
                    Value::from(w.coverage),
                    Value::String(w.variant.to_string()),
                ]
            })
            .collect();

        self.write_grid(
            writer,
            &Grid {
                headers: vec![
                    "document_id".into(),
                    "metric".into(),
                    "coverage".into(),
                    "variant".into(),
                ],
                rows,
            },
        )
    }

    /// Write the canonical table to `<directory>/canonical_norms.<ext>`.
    pub fn export_canonical(&self, directory: &Path, table: &CanonicalNormTable) -> Result<PathBuf> {
        self.write_file(directory, "canonical_norms", |w| self.write_canonical(w, table))
    }

    /// Write every table of a run into `directory`.
    ///
    /// The skipped-documents report is only written when documents were
    /// skipped; everything else is always written.
    pub fn export_run(
        &self,
        directory: &Path,
        table: &CanonicalNormTable,
        output: &PipelineOutput,
        skipped: &[SkippedDocument],
    ) -> Result<Vec<PathBuf>> {
        create_dir_all(directory)?;
        let mut files = vec![
            self.write_file(directory, "tokens", |w| self.write_tokens(w, &output.joined))?,
            self.write_file(directory, "summary_with_stopwords", |w| {
                self.write_summary(w, &output.with_stopwords)
            })?,
            self.write_file(directory, "summary_without_stopwords", |w| {
                self.write_summary(w, &output.without_stopwords)
            })?,
            self.export_canonical(directory, table)?,
        ];

        let warnings: Vec<CoverageWarning> = output
            .with_stopwords
            .warnings()
            .iter()
            .chain(output.without_stopwords.warnings())
            .cloned()
            .collect();
        files.push(self.write_file(directory, "coverage_warnings", |w| {
            self.write_warnings(w, &warnings)
        })?);

        if !skipped.is_empty() {
            files.push(self.write_file(directory, "skipped_documents", |w| {
                self.write_skipped(w, skipped)
            })?);
        }

        info!(
            directory = %directory.display(),
            files = files.len(),
            format = %self.format,
            "Exported run"
        );
        Ok(files)
    }

    fn write_file<F>(&self, directory: &Path, stem: &str, write: F) -> Result<PathBuf>
    where
        F: FnOnce(BufWriter<File>) -> Result<()>,
    {
        create_dir_all(directory)?;
        let path = directory.join(format!("{stem}.{}", self.format.extension()));
        write(BufWriter::new(File::create(&path)?))?;
        Ok(path)
    }

    fn write_grid<W: Write>(&self, writer: W, grid: &Grid) -> Result<()> {
        match self.format {
            ExportFormat::Csv => self.write_csv(writer, grid),
            ExportFormat::Json => write_json(writer, grid),
        }
    }

    fn write_csv<W: Write>(&self, writer: W, grid: &Grid) -> Result<()> {
        let mut writer = Writer::from_writer(writer);
        writer.write_record(&grid.headers)?;
        for row in &grid.rows {
            writer.write_record(row.iter().map(|cell| match cell {
                Value::Null => self.missing_marker.clone(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn write_json<W: Write>(mut writer: W, grid: &Grid) -> Result<()> {
    let objects: Vec<Value> = grid
        .rows
        .iter()
        .map(|row| {
            Value::Object(
                grid.headers
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>(),
            )
        })
        .collect();

    serde_json::to_writer_pretty(&mut writer, &objects)?;
    writer.flush()?;
    Ok(())
}

/// Directory for this run's outputs, created if needed.
///
/// With `timestamped` set the run gets its own `YYYY-MM-DD_HH-MM-SS`
/// subdirectory under the output directory.
pub fn run_directory(config: &ExportConfig) -> Result<PathBuf> {
    let base = PathBuf::from(&config.output_directory);
    let directory = if config.timestamped {
        base.join(Local::now().format(TIMESTAMP_FORMAT).to_string())
    } else {
        base
    };
    create_dir_all(&directory)?;
    Ok(directory)
}
