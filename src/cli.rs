use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};
use tracing::info;

use crate::assigner::FoldAssigner;
use crate::config::{DegeneratePolicy, FoldConfig, RecombineConfig};
use crate::constants::folds::{DEFAULT_FOLD_COUNT, DEFAULT_SEED, MIN_FOLD_COUNT};
use crate::constants::predictions::DEFAULT_TAG;
use crate::labels::LabelMap;
use crate::metrics::ClassificationSummary;
use crate::predictions::FoldPredictionTable;
use crate::recombine::PredictionRecombiner;
use crate::report::FoldReport;
use crate::splits::RoleColumns;
use crate::transport::fs::{augmented_output_path, read_dataset, write_dataset, write_json};
use crate::tta::collapse_tta_table;

#[derive(Debug, Parser)]
#[command(
    name = "assign_folds",
    disable_help_subcommand = true,
    about = "Assign grouped, label-stratified cross-validation folds",
    long_about = "Compute train/val/test roles per fold for every group of a CSV dataset and write the dataset back with one role column per fold.",
    after_help = "Set RUST_LOG=info (or debug) for progress logging."
)]
/// CLI for `assign_folds`.
///
/// Common usage:
/// - `--csv-path data.csv --target-col taxon --group-col individual`
/// - Add `--allow-degenerate` when some labels have fewer records than folds
struct AssignFoldsCli {
    #[arg(long = "csv-path", value_name = "PATH", help = "Input dataset CSV")]
    csv_path: PathBuf,
    #[arg(long = "target-col", help = "Label column used for stratification")]
    target_col: String,
    #[arg(long = "group-col", help = "Group column; groups never straddle roles")]
    group_col: String,
    #[arg(
        long = "n-splits",
        default_value_t = DEFAULT_FOLD_COUNT,
        value_parser = parse_fold_count,
        help = "Number of folds"
    )]
    n_splits: usize,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Seed for the group shuffle")]
    seed: u64,
    #[arg(
        long = "out-folder",
        value_name = "DIR",
        default_value = ".",
        help = "Directory for the augmented CSV when --output is not given"
    )]
    out_folder: PathBuf,
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with = "out_folder",
        help = "Explicit path for the augmented CSV"
    )]
    output: Option<PathBuf>,
    #[arg(
        long = "allow-degenerate",
        help = "Warn instead of failing when a label has fewer records than folds"
    )]
    allow_degenerate: bool,
    #[arg(long, help = "Compute validation splits of all folds in parallel")]
    parallel: bool,
    #[arg(
        long = "report-json",
        value_name = "PATH",
        help = "Optional path for a JSON per-fold label report"
    )]
    report_json: Option<PathBuf>,
    #[arg(long, help = "Do not print the per-fold label report")]
    quiet: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "combine_predictions",
    disable_help_subcommand = true,
    about = "Recombine per-fold predictions into original row order",
    long_about = "Read one prediction CSV per fold from <model-folder>/f<k>/ and merge them into a single table ordered like the reference dataset."
)]
struct CombinePredictionsCli {
    #[arg(long = "model-folder", value_name = "DIR", help = "Folder holding f0..f<N-1>")]
    model_folder: PathBuf,
    #[arg(
        long = "reference-csv",
        value_name = "PATH",
        help = "Dataset CSV with one role column per fold"
    )]
    reference_csv: PathBuf,
    #[arg(long = "n-splits", value_parser = parse_positive_usize, help = "Number of folds")]
    n_splits: usize,
    #[arg(long, default_value = DEFAULT_TAG, help = "Tag used in the default output name")]
    tag: String,
    #[arg(
        long = "file-filter",
        help = "Only consider prediction files whose name contains this text"
    )]
    file_filter: Option<String>,
    #[arg(long, value_name = "PATH", help = "Explicit path for the unified CSV")]
    output: Option<PathBuf>,
    #[arg(
        long = "class-map",
        value_name = "PATH",
        help = "Class map (one label per line) checked against every fold"
    )]
    class_map: Option<PathBuf>,
}

#[derive(Debug, Parser)]
#[command(
    name = "aggregate_tta",
    disable_help_subcommand = true,
    about = "Collapse test-time-augmentation passes by majority vote"
)]
struct AggregateTtaCli {
    #[arg(long, value_name = "PATH", help = "Pass-major TTA prediction CSV")]
    input: PathBuf,
    #[arg(long, value_parser = parse_positive_usize, help = "Number of TTA passes")]
    passes: usize,
    #[arg(long, value_name = "PATH", help = "Output CSV with one row per sample")]
    output: PathBuf,
}

/// Run `assign_folds` with the given arguments (program name excluded).
pub fn run_assign_folds<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) = parse_cli::<AssignFoldsCli, _>(
        std::iter::once("assign_folds".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let config = FoldConfig {
        label_column: cli.target_col,
        group_column: cli.group_col,
        fold_count: cli.n_splits,
        seed: cli.seed,
        degenerate: if cli.allow_degenerate {
            DegeneratePolicy::Warn
        } else {
            DegeneratePolicy::Reject
        },
        parallel: cli.parallel,
    };
    let dataset = read_dataset(&cli.csv_path)?;
    let assigner = FoldAssigner::new(config)?;
    let (assignment, augmented) = assigner.assign_and_augment(&dataset)?;

    let config = assigner.config();
    let output = cli.output.unwrap_or_else(|| {
        augmented_output_path(
            &cli.csv_path,
            &cli.out_folder,
            config.fold_count,
            &config.label_column,
        )
    });
    write_dataset(&output, &augmented)?;
    info!(path = %output.display(), "wrote augmented dataset");

    let records = dataset.records(&config.label_column, &config.group_column)?;
    let report = FoldReport::build(&assignment, &records, &config.label_column);
    if let Some(path) = &cli.report_json {
        write_json(path, &report)?;
    }
    if !cli.quiet {
        print!("{report}");
        println!("augmented dataset: {}", output.display());
    }
    Ok(())
}

/// Run `combine_predictions` with the given arguments (program name excluded).
pub fn run_combine_predictions<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) = parse_cli::<CombinePredictionsCli, _>(
        std::iter::once("combine_predictions".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let recombiner = PredictionRecombiner::new(RecombineConfig {
        fold_count: cli.n_splits,
        file_filter: cli.file_filter,
        tag: cli.tag,
    })?;
    let reference = read_dataset(&cli.reference_csv)?;
    let roles = RoleColumns::new(&reference, cli.n_splits)?;
    let tables = recombiner.load_fold_tables(&cli.model_folder)?;
    if let Some(path) = &cli.class_map {
        let labels = LabelMap::from_class_map_file(path)?;
        for (fold, table) in tables.iter().enumerate() {
            table
                .check_classes(&labels)
                .map_err(|err| format!("fold {fold}: {err}"))?;
        }
    }
    let unified = recombiner.recombine(&roles, tables)?;

    let output = cli
        .output
        .unwrap_or_else(|| recombiner.default_output_path(&cli.model_folder));
    write_dataset(&output, &unified.to_table()?)?;

    println!("unified predictions: {} rows -> {}", unified.len(), output.display());
    if let Some(summary) = ClassificationSummary::from_table(&unified) {
        info!(
            samples = summary.samples,
            accuracy = summary.accuracy,
            weighted_f1 = summary.weighted_f1,
            "classification summary"
        );
        println!(
            "accuracy={:.4} weighted_f1={:.4} samples={}",
            summary.accuracy, summary.weighted_f1, summary.samples
        );
    }
    Ok(())
}

/// Run `aggregate_tta` with the given arguments (program name excluded).
pub fn run_aggregate_tta<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) = parse_cli::<AggregateTtaCli, _>(
        std::iter::once("aggregate_tta".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let raw = read_dataset(&cli.input)?;
    let table = FoldPredictionTable::from_table(&raw, &cli.input)?;
    let collapsed = collapse_tta_table(&table, cli.passes)?;
    write_dataset(&cli.output, &collapsed.to_table()?)?;
    info!(
        passes = cli.passes,
        samples = collapsed.len(),
        path = %cli.output.display(),
        "wrote collapsed tta predictions"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn parse_fold_count(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse --n-splits value '{raw}' as an integer"))?;
    if parsed < MIN_FOLD_COUNT {
        return Err(format!("--n-splits must be at least {MIN_FOLD_COUNT}"));
    }
    Ok(parsed)
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{raw}' as a positive integer"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
