use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use lexnorm::config::AppConfig;
use lexnorm::corpus::load_documents;
use lexnorm::export::{run_directory, Exporter};
use lexnorm::logging::{init_logging, OperationTimer};
use lexnorm::validation::InputValidator;
use lexnorm::{CanonicalNormTable, Pipeline};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, layered over config/default and config/local
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize norms, annotate the corpus and export every table
    Run {
        /// Document table (overrides corpus.path)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Output directory (overrides export.output_directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Comma-separated metrics (overrides aggregation.metrics)
        #[arg(short, long, value_delimiter = ',')]
        metrics: Option<Vec<String>>,
    },
    /// Merge the configured norm tables and export the canonical table
    Canonicalize {
        /// Output directory (overrides export.output_directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// List the metric columns available in the canonical table
    ListMetrics,
    /// Print the effective configuration as YAML
    ShowConfig,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    let _guard = init_logging(
        Some(config.logging.level.as_str()),
        &config.logging.format,
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting lexnorm");

    match cli.command {
        Commands::Run {
            corpus,
            output_dir,
            metrics,
        } => {
            if let Some(corpus) = corpus {
                config.corpus.path = Some(corpus.to_string_lossy().into_owned());
            }
            if let Some(output_dir) = output_dir {
                config.export.output_directory = output_dir.to_string_lossy().into_owned();
            }
            if let Some(metrics) = metrics {
                config.aggregation.metrics = metrics.into_iter().map(|m| m.trim().to_string()).collect();
            }
            config.validate().context("Invalid command-line overrides")?;
            run(&config)?;
        }
        Commands::Canonicalize { output_dir } => {
            if let Some(output_dir) = output_dir {
                config.export.output_directory = output_dir.to_string_lossy().into_owned();
            }
            canonicalize_only(&config)?;
        }
        Commands::ListMetrics => list_metrics(&config)?,
        Commands::ShowConfig => {
            let yaml = config.to_yaml()?;
            std::io::stdout()
                .write_all(yaml.as_bytes())
                .context("Failed to write configuration")?;
        }
    }

    Ok(())
}

fn load_canonical(config: &AppConfig, pipeline: &Pipeline) -> Result<CanonicalNormTable> {
    let sources = config
        .norms
        .load_sources()
        .context("Failed to read norm tables")?;
    let table = pipeline
        .load_norms(&sources)
        .context("Failed to canonicalize norm tables")?;
    let stats = table.stats();
    info!(
        words = table.len(),
        columns = table.columns().len(),
        rows_read = stats.rows_read,
        rows_skipped = stats.rows_skipped,
        rows_nulled = stats.rows_nulled,
        "Canonical norm table ready"
    );
    Ok(table)
}

/// Full pipeline plus all exports
fn run(config: &AppConfig) -> Result<()> {
    let timer = OperationTimer::new("run");
    let pipeline = Pipeline::from_config(config)?;
    let table = load_canonical(config, &pipeline)?;

    let corpus_path = config.corpus.path()?;
    InputValidator::validate_input_file(&corpus_path)?;
    let file = File::open(&corpus_path)
        .with_context(|| format!("Failed to open corpus {}", corpus_path.display()))?;
    let load = load_documents(file, &config.corpus).context("Failed to read corpus")?;
    pipeline.record_skipped(&load.skipped);
    for skipped in &load.skipped {
        warn!(row = skipped.row, document = %skipped.document, reason = %skipped.reason, "Skipped document");
    }

    let output = pipeline.run(&table, &load.documents, &config.aggregation.metrics)?;

    let exporter = Exporter::from_config(&config.export)?;
    let directory = run_directory(&config.export)?;
    let files = exporter
        .export_run(&directory, &table, &output, &load.skipped)
        .context("Failed to export results")?;
    for file in &files {
        info!(path = %file.display(), "Wrote");
    }

    pipeline.metrics().log_summary();
    timer.finish();
    Ok(())
}

/// Canonical table only
fn canonicalize_only(config: &AppConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let table = load_canonical(config, &pipeline)?;
    let exporter = Exporter::from_config(&config.export)?;
    let directory = run_directory(&config.export)?;
    let path = exporter.export_canonical(&directory, &table)?;
    info!(path = %path.display(), "Wrote canonical norm table");
    Ok(())
}

fn list_metrics(config: &AppConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let table = load_canonical(config, &pipeline)?;
    for (index, column) in table.columns().iter().enumerate() {
        let rated = table
            .iter()
            .filter(|(_, values)| values[index].is_some())
            .count();
        let selected = config.aggregation.metrics.contains(column);
        info!(metric = %column, rated_words = rated, selected, "Available metric");
    }
    Ok(())
}
