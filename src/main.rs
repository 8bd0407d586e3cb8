use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{LevelFilter, error, info};
use posterior_tree_distances::pipeline::{kf_matrix, rf_matrix, weighted_rf_matrix};
use posterior_tree_distances::{
    Burnin, DistanceOptions, ErrorKind, Metric, PairwiseResult, TreeDistError, load_collection,
    write_matrix_tsv,
};

/// Compute pairwise tree distances from BEAST/MrBayes tree-sample files
/// and write a labeled distance matrix (TSV) where row/column names are tree names.
#[derive(Parser, Debug)]
#[command(name = "posterior-tree-distances", version, about = "Pairwise RF / weighted RF / KF distance matrix for posterior tree samples")]
struct Args {
    /// Path(s) to .trees (NEXUS) files, optionally gzip-compressed
    #[arg(short = 'i', long = "input", required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Burn-in by number of trees (drop first N trees of each file)
    #[arg(short = 't', long = "burnin-trees", default_value_t = 0)]
    burnin_trees: usize,

    /// Burn-in by state (keep trees with STATE >= value)
    #[arg(short = 's', long = "burnin-states", default_value_t = 0)]
    burnin_states: u64,

    /// Output path for TSV distance matrix ('-' for stdout, '.gz' to compress)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Use TRANSLATE block to map taxon IDs to labels when available
    #[arg(long = "use-real-taxa", default_value_t = false)]
    use_real_taxa: bool,

    /// Distance metric to compute: rf | weighted | kf
    #[arg(long = "metric", value_enum, default_value_t = MetricArg::Rf)]
    metric: MetricArg,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long = "threads", default_value_t = 0)]
    threads: usize,

    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode: per-file details are logged
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MetricArg {
    Rf,
    Weighted,
    Kf,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Rf => Metric::Rf,
            MetricArg::Weighted => Metric::Weighted,
            MetricArg::Kf => Metric::Kf,
        }
    }
}

fn exit_code(e: &TreeDistError) -> ExitCode {
    ExitCode::from(match e.kind() {
        ErrorKind::Range => 2,
        ErrorKind::Input => 3,
        ErrorKind::Parse => 4,
        ErrorKind::Validation => 5,
        ErrorKind::EmptyResult => 6,
    })
}

fn write_result<T: std::fmt::Display>(output: &Path, result: &PairwiseResult<T>) -> std::io::Result<()> {
    let t = Instant::now();
    write_matrix_tsv(output, &result.names, &result.matrix)?;
    let target = if output.as_os_str() == "-" { "stdout" } else { "output" };
    info!("Writing to {target} {:.3}s", t.elapsed().as_secs_f64());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.quiet {
        LevelFilter::Warn
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if args.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
        {
            error!("Failed to configure {} threads: {e}", args.threads);
            return ExitCode::FAILURE;
        }
    }

    let options = DistanceOptions {
        burnin: Burnin::new(args.burnin_trees, args.burnin_states),
        use_real_taxa: args.use_real_taxa,
    };

    let collection = match load_collection(args.input.as_slice(), &options) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return exit_code(&e);
        }
    };

    let metric = Metric::from(args.metric);
    info!(
        "Determining distances using {} for {} combinations",
        metric.label(),
        collection.len() * collection.len().saturating_sub(1) / 2
    );

    let written = match metric {
        Metric::Rf => write_result(&args.output, &rf_matrix(collection)),
        Metric::Weighted => write_result(&args.output, &weighted_rf_matrix(collection)),
        Metric::Kf => write_result(&args.output, &kf_matrix(collection)),
    };

    if let Err(e) = written {
        error!("Failed to write output {:?}: {e}", args.output);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
