use std::fs::File as StdFile;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{LexnormError, Result};
use crate::norms::{NormSource, Study};
use crate::stopwords::StopwordList;
use crate::validation::InputValidator;

/// Application configuration structure
///
/// Every section falls back to its defaults, so a file or environment overlay
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub norms: NormsConfig,
    pub corpus: CorpusConfig,
    pub stopwords: StopwordsConfig,
    pub aggregation: AggregationConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

/// Where norms come from: raw study tables, or a previously exported
/// canonical table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormsConfig {
    pub sources: Vec<NormFileConfig>,
    pub canonical_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormFileConfig {
    pub study: String,
    pub path: String,
    #[serde(default)]
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: Option<String>,
    pub text_column: String,
    pub id_column: Option<String>,
    pub group_column: Option<String>,
    pub delimiter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopwordsConfig {
    pub list: String, // "english", "file" or "none"
    pub path: Option<String>,
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub metrics: Vec<String>,
    pub coverage_warning_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_directory: String,
    pub format: String, // "csv" or "json"
    pub timestamped: bool,
    pub missing_marker: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: None,
            text_column: "text".to_string(),
            id_column: None,
            group_column: None,
            delimiter: ",".to_string(),
        }
    }
}

impl Default for StopwordsConfig {
    fn default() -> Self {
        Self {
            list: "english".to_string(),
            path: None,
            extra: Vec::new(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            metrics: vec![
                "conc_mean".to_string(),
                "aoa_mean".to_string(),
                "prev_prevalence".to_string(),
                "soc_mean".to_string(),
                "freq_zipf".to_string(),
            ],
            coverage_warning_threshold: crate::aggregate::DEFAULT_COVERAGE_WARNING_THRESHOLD,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_directory: "./output".to_string(),
            format: "csv".to_string(),
            timestamped: true,
            missing_marker: "NA".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// defaults, `config/default`, `config/local`, `explicit`, then
    /// `LEXNORM__SECTION__KEY` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Add environment variables with prefix
            .add_source(
                Environment::with_prefix("LEXNORM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("aggregation.metrics")
                    .with_list_parse_key("stopwords.extra")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(LexnormError::InvalidConfig(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(LexnormError::InvalidConfig(format!(
                "Invalid log format: {}. Must be one of: {valid_formats:?}",
                self.logging.format
            )));
        }

        // Validate norm sources
        for source in &self.norms.sources {
            Study::from_str(&source.study)?;
            InputValidator::validate_file_path(Path::new(&source.path))?;
            if let Some(delimiter) = &source.delimiter {
                InputValidator::validate_delimiter(delimiter)?;
            }
        }

        // Validate corpus config
        if self.corpus.text_column.trim().is_empty() {
            return Err(LexnormError::InvalidConfig(
                "corpus.text_column cannot be empty".to_string(),
            ));
        }
        InputValidator::validate_delimiter(&self.corpus.delimiter)?;

        // Validate stopwords config
        match self.stopwords.list.as_str() {
            "english" | "none" => {}
            "file" => {
                let path = self.stopwords.path.as_deref().ok_or_else(|| {
                    LexnormError::InvalidConfig(
                        "stopwords.list = \"file\" requires stopwords.path".to_string(),
                    )
                })?;
                InputValidator::validate_file_path(Path::new(path))?;
            }
            other => {
                return Err(LexnormError::InvalidConfig(format!(
                    "Invalid stopword list: {other}. Must be one of: [\"english\", \"file\", \"none\"]"
                )))
            }
        }

        // Validate aggregation config
        InputValidator::validate_metric_selection(&self.aggregation.metrics)?;
        InputValidator::validate_threshold(self.aggregation.coverage_warning_threshold)?;

        // Validate export config
        let valid_formats = ["csv", "json"];
        if !valid_formats.contains(&self.export.format.as_str()) {
            return Err(LexnormError::InvalidConfig(format!(
                "Invalid export format: {}. Must be one of: {valid_formats:?}",
                self.export.format
            )));
        }
        InputValidator::validate_file_path(Path::new(&self.export.output_directory))?;

        Ok(())
    }

    /// Effective configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl NormsConfig {
    /// Read every configured norm table.
    ///
    /// A configured `canonical_path` takes precedence over raw sources and is
    /// read through the passthrough `canonical` study.
    pub fn load_sources(&self) -> Result<Vec<NormSource>> {
        if let Some(path) = &self.canonical_path {
            return Ok(vec![NormSource::from_path(
                Study::Canonical,
                Path::new(path),
                None,
            )?]);
        }

        if self.sources.is_empty() {
            return Err(LexnormError::InvalidConfig(
                "No norm sources configured (set norms.sources or norms.canonical_path)"
                    .to_string(),
            ));
        }

        self.sources
            .iter()
            .map(|source| {
                let study = Study::from_str(&source.study)?;
                let delimiter = source
                    .delimiter
                    .as_deref()
                    .map(InputValidator::validate_delimiter)
                    .transpose()?;
                NormSource::from_path(study, Path::new(&source.path), delimiter)
            })
            .collect()
    }
}

impl CorpusConfig {
    /// Field delimiter as a byte; falls back to a comma when unset or invalid.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        InputValidator::validate_delimiter(&self.delimiter).unwrap_or(b',')
    }

    /// Configured document table path
    pub fn path(&self) -> Result<PathBuf> {
        self.path
            .as_deref()
            .map(PathBuf::from)
            .ok_or_else(|| LexnormError::InvalidConfig("corpus.path is not set".to_string()))
    }
}

impl StopwordsConfig {
    /// Build the configured stopword list, including extras.
    pub fn build(&self) -> Result<StopwordList> {
        let list = match self.list.as_str() {
            "english" => StopwordList::english(),
            "none" => StopwordList::empty(),
            "file" => {
                let path = self.path.as_deref().ok_or_else(|| {
                    LexnormError::InvalidConfig("stopwords.path is not set".to_string())
                })?;
                StopwordList::from_reader(path, StdFile::open(path)?)?
            }
            other => {
                return Err(LexnormError::InvalidConfig(format!(
                    "Invalid stopword list: {other}"
                )))
            }
        };
        Ok(list.with_extra(&self.extra))
    }
}
