//! Facelabel: hierarchical face and animal region labels.
//!
//! Facelabel reads and writes `.lst` label files, where each image carries a
//! tree of rectangular and elliptical regions (faces, profiles, eyes, whole
//! animals...) with multi-valued attributes and free-text categories. It
//! normalizes labels against their images and scores detector output
//! against a baseline by region overlap.
//!
//! # Modules
//!
//! - [`model`]: Features, attributes, the annotation tree and its grammar
//! - [`difference`]: Overlap matching and scoring of annotation lists
//! - [`validation`]: List-file validation and error reporting
//! - [`normalize`]: Extend/clip normalization against image frames
//! - [`stats`]: Label statistics
//! - [`error`]: Error types for facelabel operations

pub mod difference;
pub mod error;
pub mod model;
pub mod normalize;
pub mod stats;
pub mod validation;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

pub use error::FacelabelError;
use model::io_lst::{self, ImageSizes, ListFile};
use model::Schemas;

/// The facelabel CLI application.
#[derive(Parser)]
#[command(name = "facelabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory of attribute schema definitions overriding the built-in ones.
    #[arg(long, global = true, env = "FACELABEL_SCHEMAS")]
    schemas: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Validate a list file for errors and warnings.
    Validate(ValidateArgs),
    /// Extend and clip annotations to their images, then drop undersized ones.
    Normalize(NormalizeArgs),
    /// Score candidate list files against a baseline.
    Score(ScoreArgs),
    /// Show label statistics for list files.
    Stats(StatsArgs),
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// List file to validate.
    input: PathBuf,

    /// Image directory; enables the image frame checks.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the normalize subcommand.
#[derive(clap::Args)]
struct NormalizeArgs {
    /// List file to normalize.
    input: PathBuf,

    /// Output list file.
    #[arg(short, long)]
    output: PathBuf,

    /// Image directory the list refers to.
    #[arg(long)]
    images: PathBuf,

    /// Keep annotations that break the size rules after clipping.
    #[arg(long)]
    keep_small: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    report: String,
}

/// Arguments for the score subcommand.
#[derive(clap::Args)]
struct ScoreArgs {
    /// Baseline list file.
    baseline: PathBuf,

    /// Candidate list files.
    #[arg(required = true)]
    candidates: Vec<PathBuf>,

    /// Minimum overlap for a match, between 0 and 1.
    #[arg(long, env = "FACELABEL_MIN_OVERLAP", default_value_t = difference::DEFAULT_MIN_OVERLAP)]
    threshold: f64,

    /// Output format ('text', 'json' or 'csv').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the stats subcommand.
#[derive(clap::Args)]
struct StatsArgs {
    /// List files, or directories searched for `.lst` files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of categories and breeds to show.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the facelabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), FacelabelError> {
    let cli = Cli::parse();
    let schemas = load_schemas(cli.schemas.as_deref())?;

    match cli.command {
        Some(Commands::Validate(args)) => run_validate(args, &schemas),
        Some(Commands::Normalize(args)) => run_normalize(args, &schemas),
        Some(Commands::Score(args)) => run_score(args, &schemas),
        Some(Commands::Stats(args)) => run_stats(args, &schemas),
        None => {
            println!("facelabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Hierarchical face and animal region labels.");
            println!();
            println!("Run 'facelabel --help' for usage information.");
            Ok(())
        }
    }
}

fn load_schemas(dir: Option<&Path>) -> Result<Arc<Schemas>, FacelabelError> {
    match dir {
        Some(dir) => {
            log::info!("loading attribute schemas from {}", dir.display());
            Ok(Arc::new(Schemas::load_dir(dir)?))
        }
        None => Ok(Schemas::builtin()),
    }
}

fn scan_images(dir: Option<&Path>) -> Result<ImageSizes, FacelabelError> {
    match dir {
        Some(dir) => {
            let sizes = ImageSizes::scan(dir)?;
            log::info!("found {} image size entries under {}", sizes.len(), dir.display());
            Ok(sizes)
        }
        None => Ok(ImageSizes::default()),
    }
}

fn unsupported(value: &str, supported: &str) -> FacelabelError {
    FacelabelError::UnsupportedFormat(format!("'{}' (supported: {})", value, supported))
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs, schemas: &Arc<Schemas>) -> Result<(), FacelabelError> {
    if !matches!(args.output.as_str(), "text" | "json") {
        return Err(unsupported(&args.output, "text, json"));
    }
    let text = std::fs::read_to_string(&args.input)?;
    let opts = validation::ValidateOptions {
        strict: args.strict,
        image_sizes: scan_images(args.images.as_deref())?,
    };
    let report = validation::validate_list(&text, schemas, &opts);

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report.to_json())?),
        _ => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(FacelabelError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the normalize subcommand.
fn run_normalize(args: NormalizeArgs, schemas: &Arc<Schemas>) -> Result<(), FacelabelError> {
    if !matches!(args.report.as_str(), "text" | "json") {
        return Err(unsupported(&args.report, "text, json"));
    }
    let mut list = io_lst::read_lst(&args.input, schemas)?;
    let opts = normalize::NormalizeOptions {
        image_sizes: scan_images(Some(&args.images))?,
        drop_too_small: !args.keep_small,
    };
    let report = normalize::normalize_list(&mut list, &opts)?;
    io_lst::write_lst(&args.output, &list)?;

    match args.report.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            println!(
                "Normalized {} -> {}",
                args.input.display(),
                args.output.display()
            );
            print!("{}", report);
        }
    }
    Ok(())
}

/// Execute the score subcommand.
fn run_score(args: ScoreArgs, schemas: &Arc<Schemas>) -> Result<(), FacelabelError> {
    if !(0.0..=1.0).contains(&args.threshold) {
        return Err(FacelabelError::InvalidArgument(format!(
            "threshold {} is outside 0..=1",
            args.threshold
        )));
    }
    if !matches!(args.output.as_str(), "text" | "json" | "csv") {
        return Err(unsupported(&args.output, "text, json, csv"));
    }

    let baseline = io_lst::read_lst(&args.baseline, schemas)?;
    let mut candidates: Vec<(String, ListFile)> = Vec::with_capacity(args.candidates.len());
    for path in &args.candidates {
        candidates.push((path.display().to_string(), io_lst::read_lst(path, schemas)?));
    }
    let named: Vec<(String, &ListFile)> = candidates
        .iter()
        .map(|(name, list)| (name.clone(), list))
        .collect();

    let opts = difference::ScoreOptions {
        min_overlap: args.threshold,
    };
    let report = difference::score_lists(&baseline, &named, &opts);

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "csv" => report.write_csv(io::stdout().lock())?,
        _ => print!("{}", report),
    }
    Ok(())
}

/// Execute the stats subcommand.
fn run_stats(args: StatsArgs, schemas: &Arc<Schemas>) -> Result<(), FacelabelError> {
    if !matches!(args.output.as_str(), "text" | "json") {
        return Err(unsupported(&args.output, "text, json"));
    }
    let mut lists = Vec::new();
    for input in &args.inputs {
        for path in io_lst::collect_list_files(input)? {
            lists.push(io_lst::read_lst(&path, schemas)?);
        }
    }
    let refs: Vec<&ListFile> = lists.iter().collect();
    let opts = stats::StatsOptions {
        top_categories: args.top,
        ..Default::default()
    };
    let report = stats::stats_lists(&refs, schemas, &opts);

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", report),
    }
    Ok(())
}
