//! Comprehensive unit tests for config.rs module

use std::io::Write;

use lexnorm::config::{AppConfig, CorpusConfig, NormFileConfig, StopwordsConfig};
use lexnorm::error::LexnormError;
use tempfile::NamedTempFile;

#[test]
fn test_default_logging_config() {
    let config = AppConfig::default();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_path, None);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_default_corpus_config() {
    let config = AppConfig::default();

    assert_eq!(config.corpus.text_column, "text");
    assert_eq!(config.corpus.id_column, None);
    assert_eq!(config.corpus.group_column, None);
    assert_eq!(config.corpus.delimiter_byte(), b',');
}

#[test]
fn test_default_export_config() {
    let config = AppConfig::default();

    assert_eq!(config.export.output_directory, "./output");
    assert_eq!(config.export.format, "csv");
    assert!(config.export.timestamped);
    assert_eq!(config.export.missing_marker, "NA");
}

#[test]
fn test_default_config_is_valid() {
    assert!(AppConfig::default().validate().is_ok());
}

#[test]
fn test_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "verbose".to_string();
    assert!(matches!(config.validate(), Err(LexnormError::InvalidConfig(_))));
}

#[test]
fn test_invalid_log_format() {
    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_export_format() {
    let mut config = AppConfig::default();
    config.export.format = "parquet".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_empty_metric_list() {
    let mut config = AppConfig::default();
    config.aggregation.metrics.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_duplicate_metrics() {
    let mut config = AppConfig::default();
    config.aggregation.metrics = vec!["conc_mean".to_string(), "conc_mean".to_string()];
    assert!(config.validate().is_err());
}

#[test]
fn test_threshold_bounds() {
    let mut config = AppConfig::default();
    config.aggregation.coverage_warning_threshold = 0.0;
    assert!(config.validate().is_ok());
    config.aggregation.coverage_warning_threshold = 1.0;
    assert!(config.validate().is_ok());
    config.aggregation.coverage_warning_threshold = -0.1;
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_study() {
    let mut config = AppConfig::default();
    config.norms.sources.push(NormFileConfig {
        study: "valence".to_string(),
        path: "norms/valence.csv".to_string(),
        delimiter: None,
    });
    assert!(config.validate().is_err());
}

#[test]
fn test_study_names_accept_dashes() {
    let mut config = AppConfig::default();
    config.norms.sources.push(NormFileConfig {
        study: "Clark-Paivio".to_string(),
        path: "norms/cp.csv".to_string(),
        delimiter: Some("\\t".to_string()),
    });
    assert!(config.validate().is_ok());
}

#[test]
fn test_bad_corpus_delimiter() {
    let mut config = AppConfig::default();
    config.corpus = CorpusConfig {
        delimiter: "||".to_string(),
        ..CorpusConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_stopword_file_requires_path() {
    let mut config = AppConfig::default();
    config.stopwords.list = "file".to_string();
    assert!(config.validate().is_err());
    config.stopwords.path = Some("stopwords.txt".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_build_stopwords_from_file() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "# custom list\nlike\num").expect("write");
    let config = StopwordsConfig {
        list: "file".to_string(),
        path: Some(file.path().to_string_lossy().into_owned()),
        extra: vec!["Uh".to_string()],
    };

    let list = config.build().expect("builds");
    assert!(list.contains("like"));
    assert!(list.contains("uh"));
    assert!(!list.contains("the"));
}

#[test]
fn test_build_empty_stopwords() {
    let config = StopwordsConfig {
        list: "none".to_string(),
        path: None,
        extra: Vec::new(),
    };
    assert!(config.build().expect("builds").is_empty());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        "logging:\n  level: debug\ncorpus:\n  path: corpus.csv\n  group_column: author\nnorms:\n  sources:\n    - study: concreteness\n      path: norms/conc.csv\nexport:\n  format: json\n  timestamped: false"
    )
    .expect("write");

    let config = AppConfig::load(Some(file.path())).expect("loads");

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.corpus.group_column.as_deref(), Some("author"));
    assert_eq!(config.corpus.text_column, "text");
    assert_eq!(config.norms.sources.len(), 1);
    assert_eq!(config.norms.sources[0].delimiter, None);
    assert_eq!(config.export.format, "json");
    assert!(!config.export.timestamped);
}

#[test]
fn test_load_rejects_invalid_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("temp file");
    writeln!(file, "aggregation:\n  coverage_warning_threshold: 2.0").expect("write");

    assert!(AppConfig::load(Some(file.path())).is_err());
}

#[test]
fn test_load_missing_explicit_file() {
    assert!(AppConfig::load(Some(std::path::Path::new("does/not/exist.yaml"))).is_err());
}

#[test]
fn test_yaml_rendering() {
    let yaml = AppConfig::default().to_yaml().expect("renders");
    assert!(yaml.contains("coverage_warning_threshold"));
    assert!(yaml.contains("conc_mean"));
}

#[test]
fn test_load_without_file_uses_defaults() {
    let config = AppConfig::load(None).expect("defaults load");
    assert_eq!(config.stopwords.list, "english");
    assert!(config.stopwords.extra.is_empty());
    assert!(config.norms.sources.is_empty());
    assert_eq!(config.corpus.path, None);
}

#[test]
fn test_load_partial_section() {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("temp file");
    writeln!(file, "stopwords:\n  list: none\naggregation:\n  metrics: [conc_mean]").expect("write");

    let config = AppConfig::load(Some(file.path())).expect("loads");

    assert_eq!(config.stopwords.list, "none");
    assert!(config.stopwords.extra.is_empty());
    assert_eq!(config.aggregation.metrics, vec!["conc_mean".to_string()]);
    assert!((config.aggregation.coverage_warning_threshold - 0.05).abs() < f64::EPSILON);
    assert_eq!(config.export.missing_marker, "NA");
}

#[test]
fn test_imported_column_names_pass_validation() {
    let mut config = AppConfig::default();
    config.aggregation.metrics = vec!["cp_vividness.m".to_string()];
    assert!(config.validate().is_ok());
}
