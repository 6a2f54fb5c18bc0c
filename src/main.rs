//! motion-sense CLI
//!
//! Gesture, heart-rate and tremor analysis of XR motion recordings.
//! Results go to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use motion_sense::{
    batch::{collect_inputs, BatchRunner},
    config::Config,
    core::{GesturePipeline, HeartRateEstimator, NearestCentroid, ReportBuilder, SessionAnalyzer, TremorDetector},
    ingest::{load_recording, MotionTable, TrackedPoint},
    stats::{ProcessingStats, SharedStats},
    VERSION,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "motion-sense")]
#[command(version = VERSION)]
#[command(about = "Gesture, heart-rate and tremor analysis of XR motion telemetry", long_about = None)]
struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the gesture performed in a motion recording
    Classify {
        /// Motion recording (JSON)
        #[arg(long, short)]
        input: PathBuf,

        /// Nearest-centroid model (JSON)
        #[arg(long, short)]
        model: PathBuf,

        /// Window length in seconds
        #[arg(long)]
        window_length: Option<f64>,

        /// Window overlap in seconds
        #[arg(long)]
        overlap: Option<f64>,
    },

    /// Estimate heart rate per second from headset velocity
    HeartRate {
        /// Velocity log (CSV) or motion recording (JSON)
        #[arg(long, short)]
        input: PathBuf,

        /// Assumed sampling rate in Hz
        #[arg(long)]
        sampling_rate: Option<f64>,
    },

    /// Screen a positional trace for tremor
    Tremor {
        /// Motion recording (JSON)
        #[arg(long, short)]
        input: PathBuf,

        /// Tracked point to analyse (head, left_hand, right_hand, left_wrist, right_wrist)
        #[arg(long)]
        source: Option<TrackedPoint>,

        /// Assumed sampling rate in Hz
        #[arg(long)]
        sampling_rate: Option<f64>,
    },

    /// Run every applicable analysis and export a session report
    Report {
        /// Motion recording (JSON)
        #[arg(long, short)]
        input: PathBuf,

        /// Nearest-centroid model; gesture classification is skipped without one
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Separate velocity log (CSV) for heart rate
        #[arg(long)]
        velocity: Option<PathBuf>,

        /// Output file (defaults to the configured export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Analyse every recording in a directory and export one report each
    Batch {
        /// Directory holding recordings (.json, .csv)
        #[arg(long, short)]
        input_dir: PathBuf,

        /// Nearest-centroid model; gesture classification is skipped without one
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Worker threads (defaults to the number of cores)
        #[arg(long)]
        workers: Option<usize>,

        /// Report directory (defaults to the configured export directory)
        #[arg(long, short)]
        output_dir: Option<PathBuf>,
    },

    /// Show cumulative processing statistics
    Stats {
        /// Reset all counters to zero
        #[arg(long)]
        reset: bool,
    },

    /// Show configuration
    Config {
        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e:#}");
            std::process::exit(1);
        }
    };
    let stats: SharedStats = Arc::new(ProcessingStats::with_persistence(config.stats_path()));

    let result = match cli.command {
        Commands::Classify {
            input,
            model,
            window_length,
            overlap,
        } => cmd_classify(config, &stats, &input, &model, window_length, overlap),
        Commands::HeartRate {
            input,
            sampling_rate,
        } => cmd_heart_rate(config, &stats, &input, sampling_rate),
        Commands::Tremor {
            input,
            source,
            sampling_rate,
        } => cmd_tremor(config, &stats, &input, source, sampling_rate),
        Commands::Report {
            input,
            model,
            velocity,
            output,
        } => cmd_report(config, &stats, &input, model.as_deref(), velocity.as_deref(), output),
        Commands::Batch {
            input_dir,
            model,
            workers,
            output_dir,
        } => cmd_batch(config, &stats, &input_dir, model.as_deref(), workers, output_dir),
        Commands::Stats { reset } => cmd_stats(&stats, reset),
        Commands::Config { init } => cmd_config(&config, cli.config.as_deref(), init),
    };

    if let Err(e) = stats.save() {
        tracing::warn!(error = %e, "Could not save processing stats");
    }

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr));
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install logger: {e}");
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path).with_context(|| format!("reading {}", path.display())),
        None => Ok(Config::load()?),
    }
}

fn load_table(path: &Path) -> Result<MotionTable> {
    load_recording(path).with_context(|| format!("reading {}", path.display()))
}

fn load_model(path: &Path) -> Result<NearestCentroid> {
    NearestCentroid::from_path(path).with_context(|| format!("loading model {}", path.display()))
}

/// Build an analyzer, with the gesture path only when a model is given.
fn build_analyzer(config: &Config, stats: &SharedStats, model: Option<&Path>) -> Result<SessionAnalyzer> {
    let mut analyzer = SessionAnalyzer::new(config)?.with_stats(Arc::clone(stats));
    if let Some(path) = model {
        analyzer = analyzer.with_classifier(Arc::new(load_model(path)?));
    }
    Ok(analyzer)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_classify(
    mut config: Config,
    stats: &SharedStats,
    input: &Path,
    model: &Path,
    window_length: Option<f64>,
    overlap: Option<f64>,
) -> Result<()> {
    if let Some(length) = window_length {
        config.gesture.window_length_secs = length;
    }
    if let Some(overlap) = overlap {
        config.gesture.overlap_secs = overlap;
    }

    let table = load_table(input)?;
    let model = load_model(model)?;
    let pipeline = GesturePipeline::new(&config.gesture)?.with_stats(Arc::clone(stats));

    let result = pipeline.run(&table, &model)?;
    print_json(&result)
}

fn cmd_heart_rate(mut config: Config, stats: &SharedStats, input: &Path, sampling_rate: Option<f64>) -> Result<()> {
    if let Some(rate) = sampling_rate {
        config.heart_rate.sampling_rate = rate;
    }

    let table = load_table(input)?;
    let estimator = HeartRateEstimator::new(config.heart_rate)?;
    let series = estimator.estimate(&table);

    stats.record_session();
    let estimated = series.valid().count();
    stats.record_seconds(estimated as u64, (series.len() - estimated) as u64);

    print_json(&serde_json::json!({
        "mean_bpm": series.mean_bpm(),
        "estimates": series.estimates,
    }))
}

fn cmd_tremor(
    mut config: Config,
    stats: &SharedStats,
    input: &Path,
    source: Option<TrackedPoint>,
    sampling_rate: Option<f64>,
) -> Result<()> {
    if let Some(source) = source {
        config.tremor.source = source;
    }
    if let Some(rate) = sampling_rate {
        config.tremor.sampling_rate = rate;
    }

    let table = load_table(input)?;
    let detector = TremorDetector::new(config.tremor)?;
    let assessment = detector.detect(&table);

    stats.record_session();
    stats.record_tremor_screen();
    if assessment.is_none() {
        tracing::warn!(source = ?config.tremor.source, "Trace too short for tremor screening");
    }

    print_json(&assessment)
}

fn cmd_report(
    config: Config,
    stats: &SharedStats,
    input: &Path,
    model: Option<&Path>,
    velocity: Option<&Path>,
    output: Option<PathBuf>,
) -> Result<()> {
    config.ensure_directories().context("creating output directories")?;
    let table = load_table(input)?;
    let velocity_table = velocity.map(load_table).transpose()?;

    let analysis = build_analyzer(&config, stats, model)?.analyze(&table, velocity_table.as_ref())?;
    let report = ReportBuilder::new()
        .with_analysis(analysis)
        .with_meta("input", input.display().to_string())
        .build(&table);

    let path = output.unwrap_or_else(|| config.export_path.join(report.file_name()));
    report
        .write_to(&path)
        .with_context(|| format!("writing report to {}", path.display()))?;
    tracing::info!(path = %path.display(), "Report exported");

    print_json(&report)
}

fn cmd_batch(
    mut config: Config,
    stats: &SharedStats,
    input_dir: &Path,
    model: Option<&Path>,
    workers: Option<usize>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let inputs = collect_inputs(input_dir).with_context(|| format!("listing {}", input_dir.display()))?;
    if inputs.is_empty() {
        tracing::warn!(dir = %input_dir.display(), "No recordings found");
    }

    if let Some(dir) = output_dir {
        config.export_path = dir;
    }
    config.ensure_directories().context("creating output directories")?;
    let mut runner = BatchRunner::new(build_analyzer(&config, stats, model)?, config.export_path.clone());
    if let Some(workers) = workers {
        runner = runner.with_workers(workers);
    }
    ctrlc_handler(runner.run_flag());

    let summary = runner.run(inputs);
    print_json(&summary)?;
    if summary.failed > 0 {
        anyhow::bail!("{} of {} recordings failed", summary.failed, summary.entries.len());
    }
    Ok(())
}

fn cmd_stats(stats: &ProcessingStats, reset: bool) -> Result<()> {
    if reset {
        stats.reset();
        println!("Statistics reset.");
        return Ok(());
    }
    println!("{}", stats.summary());
    Ok(())
}

/// Stop dispatching new work on Ctrl+C.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    });
    if let Err(e) = result {
        tracing::warn!(error = %e, "Could not install Ctrl+C handler");
    }
}

fn cmd_config(config: &Config, path: Option<&Path>, init: bool) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);
    if init {
        config
            .save_to(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration written");
    }
    println!("Config file: {}", path.display());
    println!();
    print_json(config)
}
