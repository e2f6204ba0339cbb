use clap::Parser;
use dataset_dl::{
    Config, DatasetDownloader, ExecutionStrategy, IndicatifWriter, JobRunner, ProgressDisplay,
    RunSummary,
};
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Download the configured datasets and unpack every archive they contain
#[derive(Parser, Debug)]
#[command(name = "dataset-dl", version, about)]
struct Args {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the datasets are written to
    #[arg(long)]
    datasets_dir: Option<PathBuf>,

    /// Run jobs one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Maximum number of jobs running at once in parallel mode
    #[arg(long, conflicts_with = "sequential")]
    max_workers: Option<usize>,

    /// Wipe the datasets directory before downloading
    #[arg(long)]
    truncate: bool,

    /// Keep archives after they have been extracted
    #[arg(long)]
    keep_archives: bool,

    /// In sequential mode, stop after the first failed job
    #[arg(long)]
    fail_fast: bool,

    /// Hide all progress bars
    #[arg(long)]
    no_progress: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let multi = MultiProgress::new();
    if args.no_progress || !std::io::stderr().is_terminal() {
        multi.set_draw_target(ProgressDrawTarget::hidden());
    }

    if let Err(e) = init_tracing(args.verbose, multi.clone()) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args, multi).await {
        Ok(summary) if summary.is_success() => {
            info!(
                jobs = summary.reports.len(),
                elapsed = ?summary.elapsed,
                "all datasets downloaded successfully"
            );
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            if let Some((job, e)) = summary.first_error() {
                error!(
                    failed = summary.failed_count(),
                    jobs = summary.reports.len(),
                    first_failed_job = job,
                    error = %e,
                    "an error occurred while downloading datasets"
                );
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, code = e.error_code(), "an error occurred while downloading datasets");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, multi: MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = log_filter(verbose, rust_log.as_deref())?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(IndicatifWriter::new(multi));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Build the log filter; a non-empty `RUST_LOG` replaces the `-v` level entirely
fn log_filter(
    verbose: u8,
    rust_log: Option<&str>,
) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::WARN.into());

    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        return Ok(builder.parse(directives)?);
    }

    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    Ok(builder
        .parse("")?
        .add_directive(format!("dataset_dl={}", level).parse()?))
}

fn load_config(args: &Args) -> dataset_dl::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(dir) = &args.datasets_dir {
        config.datasets_dir = dir.clone();
    }
    if args.sequential {
        config.execution.strategy = ExecutionStrategy::Sequential;
    } else if let Some(max_workers) = args.max_workers {
        config.execution.strategy = ExecutionStrategy::Parallel {
            max_workers: Some(max_workers),
        };
    }
    if args.truncate {
        config.download.truncate_existing = true;
    }
    if args.keep_archives {
        config.download.cleanup_archives = false;
    }
    if args.fail_fast {
        config.execution.fail_fast = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: Args, multi: MultiProgress) -> dataset_dl::Result<RunSummary> {
    let config = load_config(&args)?;
    if config.execution.fail_fast && config.execution.strategy != ExecutionStrategy::Sequential {
        warn!("--fail-fast only applies to sequential runs, parallel jobs always run to completion");
    }

    let jobs = config.jobs()?;
    info!(
        datasets_dir = ?config.datasets_dir,
        jobs = jobs.len(),
        "downloading datasets"
    );

    let downloader = Arc::new(DatasetDownloader::new(&config)?);
    let display = ProgressDisplay::new(multi, &jobs).spawn(downloader.subscribe());

    let runner = JobRunner::new(downloader, &config.execution);
    let summary = runner.run(jobs).await;

    // Dropping the last sender closes the event channel and stops the display
    drop(runner);
    if let Err(e) = display.await {
        warn!(error = %e, "progress display task failed");
    }

    Ok(summary)
}
