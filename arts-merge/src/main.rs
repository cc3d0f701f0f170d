//! arts-merge - RTS contribution merger
//!
//! **Usage:**
//! ```bash
//! arts-merge scan <BATCH>                       # write overlapping features for review
//! arts-merge run <BATCH> [--classification F]   # check, reconcile and merge
//! arts-merge split <INPUT> --output F --subset train=0.8 --subset validation=0.1 --subset test=0.1
//! ```

use anyhow::{Context, Result};
use arts_common::config::{resolve_path, TomlConfig, MAIN_DATASET_ENV_VAR, OUTPUT_DIR_ENV_VAR};
use arts_merge::io::{read_feature_file, write_feature_file, FeatureFile, InputFormat};
use arts_merge::split::{split_with_buffer, SubsetSpec};
use arts_merge::workflow::{OutputMode, Pipeline, PipelineConfig};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Column written by `split`
const SUBSET_COLUMN: &str = "TrainingSubset";

#[derive(Parser, Debug)]
#[command(name = "arts-merge")]
#[command(about = "Merge RTS polygon contributions into the main dataset")]
#[command(version)]
struct Cli {
    /// Configuration file (overrides ARTS_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dry run: write nothing, never fail on incomplete classifications
    #[arg(long, global = true)]
    demo: bool,

    /// Column naming of input files (geojson or shapefile)
    #[arg(long, global = true, value_name = "FORMAT")]
    format: Option<InputFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest and scan a batch, writing overlapping features for review
    Scan {
        /// New batch file
        batch: PathBuf,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Scan, check classifications, reconcile and write the merged result
    Run {
        /// New batch file
        batch: PathBuf,

        #[command(flatten)]
        paths: PathArgs,

        /// Reviewed classification file (default: the review file in the output directory)
        #[arg(long, value_name = "FILE")]
        classification: Option<PathBuf>,

        /// standalone: write the formatted batch; main: append to the main dataset
        #[arg(long, default_value = "standalone")]
        mode: OutputMode,

        /// Drop main-dataset negatives flagged as false negatives
        #[arg(long)]
        prune_false_negatives: bool,
    },

    /// Split features into training subsets without tile leakage
    Split {
        /// Feature file to split
        input: PathBuf,

        /// Output file with the subset column added
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Subset as name=weight (repeatable; weights sum to 1)
        #[arg(long = "subset", value_name = "NAME=WEIGHT", required = true)]
        subsets: Vec<SubsetSpec>,

        /// Training tile edge length, in dataset CRS units
        #[arg(long)]
        tile_size: f64,

        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

#[derive(clap::Args, Debug)]
struct PathArgs {
    /// Main dataset file
    #[arg(long = "main", value_name = "FILE")]
    main_dataset: Option<PathBuf>,

    /// Directory for review, side and output files
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    // Read before tracing starts: the file sets the default log level
    let config_path = TomlConfig::locate(cli.config.as_deref());
    let toml = match &config_path {
        Some(path) => TomlConfig::from_file(path).context("Failed to load configuration")?,
        None => TomlConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&toml.logging.level)),
        )
        .init();

    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No config file found, using built-in defaults"),
    }

    info!(
        "Starting arts-merge v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let format = match (cli.format, toml.input_format.as_deref()) {
        (Some(format), _) => format,
        (None, Some(name)) => name.parse().context("Invalid input_format in configuration")?,
        (None, None) => InputFormat::default(),
    };
    let demo = cli.demo || toml.demo;

    match cli.command {
        Command::Scan { batch, paths } => {
            let config = pipeline_config(&toml, &paths, format, demo);
            let report = Pipeline::new(config).scan_file(&batch)?;

            println!(
                "Scanned: {} main-dataset overlap(s), {} self overlap(s), {} feature(s) need review",
                report.cross.features_with_overlaps,
                report.self_scan.features_with_overlaps,
                report.overlapping
            );
            if let Some(path) = report.review_file {
                println!("Review file: {}", path.display());
            }
        }

        Command::Run {
            batch,
            paths,
            classification,
            mode,
            prune_false_negatives,
        } => {
            let mut config = pipeline_config(&toml, &paths, format, demo);
            config.output_mode = mode;
            config.prune_false_negatives |= prune_false_negatives;

            let outcome = Pipeline::new(config).run(&batch, classification.as_deref())?;

            if outcome.completeness.is_complete() {
                println!("Intersection information is complete.");
            } else {
                println!(
                    "Intersection information is incomplete for {} feature(s):",
                    outcome.completeness.violations.len()
                );
                for v in &outcome.completeness.violations {
                    println!("  [{}] {} unclassified: {}", v.index, v.uid, v.unclassified);
                }
            }
            println!(
                "State: {}, accepted {} feature(s), pruned {}",
                outcome.state, outcome.accepted, outcome.pruned
            );
            if let Some(path) = outcome.output {
                println!("Output: {}", path.display());
            }
        }

        Command::Split {
            input,
            output,
            subsets,
            tile_size,
            seed,
        } => split(&input, &output, format, &subsets, tile_size, seed, demo)?,
    }

    Ok(())
}

fn pipeline_config(toml: &TomlConfig, paths: &PathArgs, format: InputFormat, demo: bool) -> PipelineConfig {
    let defaults = PipelineConfig::default();

    PipelineConfig {
        main_dataset: resolve_path(
            paths.main_dataset.as_deref(),
            MAIN_DATASET_ENV_VAR,
            toml.main_dataset.as_deref(),
            &defaults.main_dataset,
        ),
        output_dir: resolve_path(
            paths.output_dir.as_deref(),
            OUTPUT_DIR_ENV_VAR,
            toml.output_dir.as_deref(),
            &defaults.output_dir,
        ),
        input_format: format,
        declared_columns: toml.declared_columns.clone(),
        demo,
        prune_false_negatives: toml.prune_false_negatives,
        review_file: toml.files.review.clone(),
        incomplete_file: toml.files.incomplete.clone(),
        output_file: toml.files.output.clone(),
        ..defaults
    }
}

fn split(
    input: &Path,
    output: &Path,
    format: InputFormat,
    subsets: &[SubsetSpec],
    tile_size: f64,
    seed: u64,
    demo: bool,
) -> Result<()> {
    let file = read_feature_file(input, format)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let result = split_with_buffer(&file.features, subsets, tile_size, seed)?;

    for (name, count) in &result.counts {
        println!(
            "{}: {} feature(s) (target {})",
            name,
            count,
            result.targets.get(name).copied().unwrap_or(0)
        );
    }

    if demo {
        info!("Demo mode: split output not written");
        return Ok(());
    }

    let features = file
        .features
        .iter()
        .cloned()
        .zip(result.assignments)
        .map(|(mut feature, subset)| {
            feature.extra.insert(SUBSET_COLUMN.to_string(), Value::String(subset));
            feature
        })
        .collect();
    write_feature_file(output, &FeatureFile::with_features(&file, features))?;
    println!("Output: {}", output.display());
    Ok(())
}
