//! Pupcount replay runner
//!
//! Feeds recorded per-frame counts for one or more streams through the
//! stabilization engine, one producer thread per stream, then prints the
//! composed overlay of every stream.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use pupcount::config::AppConfig;
use pupcount::estimator::EstimatorKind;
use pupcount::ingest::FrameIngestor;
use pupcount::observer::{self, FrameObserver};
use pupcount::overlay::CompositeLayout;
use pupcount::replay::{parse_input_arg, replay_file, ReplaySummary};
use pupcount::stats::StatsRegistry;
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, Level};

/// Observers for a replay run. The closing overlays are composed from the
/// registry, so no live overlay board is kept.
fn replay_observers(config: &AppConfig) -> Result<Vec<Box<dyn FrameObserver>>> {
    let mut config = config.clone();
    config.output.overlay = false;
    let (observers, _) = observer::from_config(&config)?;
    Ok(observers)
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recorded counts for one stream, as STREAM=PATH (repeatable)
    #[arg(short, long = "input", value_name = "STREAM=PATH")]
    inputs: Vec<String>,

    /// Frames per second of every stream
    #[arg(long)]
    fps: Option<u32>,

    /// Sliding window length in seconds
    #[arg(long)]
    window_seconds: Option<u32>,

    /// Stabilization strategy: mode or percentile
    #[arg(long)]
    estimator: Option<EstimatorKind>,

    /// Fraction used by the percentile estimator, in (0, 1]
    #[arg(long)]
    percentile: Option<f64>,

    /// Directory for per-stream CSV logs
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// JSON lines file receiving every frame
    #[arg(long)]
    json: Option<PathBuf>,

    /// Minimum milliseconds between terminal lines per stream
    #[arg(long)]
    console_interval_ms: Option<u64>,

    /// Disable the per-frame terminal line
    #[arg(long)]
    no_console: bool,

    /// Print the final snapshots as JSON instead of overlay text
    #[arg(long)]
    json_summary: bool,

    /// Write the effective configuration to this file
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_names(true)
        .init();
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let config = match &args.config {
        Some(path) => AppConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };

    let mut config = config.with_overrides(
        args.fps,
        args.window_seconds,
        args.estimator,
        args.percentile,
    );

    if let Some(dir) = &args.csv_dir {
        config.output.csv_dir = Some(dir.clone());
    }
    if let Some(path) = &args.json {
        config.output.json_path = Some(path.clone());
    }
    if let Some(interval) = args.console_interval_ms {
        config.output.console_interval_ms = interval;
    }
    if args.no_console {
        config.output.console = false;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let mut config = load_config(&args)?;

    let mut inputs = Vec::with_capacity(args.inputs.len());
    let mut seen = HashSet::new();
    for arg in &args.inputs {
        let (stream, path) = parse_input_arg(arg)?;
        if !seen.insert(stream.clone()) {
            bail!("stream '{}' given more than one input", stream);
        }
        config.ensure_stream(&stream);
        inputs.push((stream, path));
    }

    config.validate().context("Invalid configuration")?;

    if let Some(path) = &args.write_config {
        config
            .to_toml_file(path)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        info!(path = %path.display(), "configuration written");
        if inputs.is_empty() {
            return Ok(());
        }
    }

    if inputs.is_empty() {
        bail!("no inputs given, pass at least one --input STREAM=PATH");
    }

    let registry = Arc::new(StatsRegistry::from_config(&config.stabilization)?);
    let observers = replay_observers(&config)?;
    let ingestor = Arc::new(FrameIngestor::new(Arc::clone(&registry)).with_observers(observers));

    info!(
        estimator = %registry.estimator_kind(),
        capacity = registry.capacity(),
        streams = inputs.len(),
        observers = ?ingestor.observer_names(),
        "starting replay"
    );

    let handles = inputs
        .into_iter()
        .map(|(stream, path)| {
            let ingestor = Arc::clone(&ingestor);
            thread::Builder::new()
                .name(format!("stream-{}", stream))
                .spawn(move || replay_file(&ingestor, &stream, &path))
                .context("Failed to spawn stream thread")
        })
        .collect::<Result<Vec<_>>>()?;

    let mut summaries: Vec<ReplaySummary> = Vec::with_capacity(handles.len());
    for handle in handles {
        let summary = handle
            .join()
            .map_err(|_| anyhow!("stream thread panicked"))??;
        summaries.push(summary);
    }

    info!(
        accepted = ingestor.accepted_frames(),
        rejected = ingestor.rejected_frames(),
        "replay complete"
    );

    if args.json_summary {
        let streams: Vec<_> = registry
            .snapshot_all()
            .into_iter()
            .map(|(stream, snapshot)| {
                json!({
                    "stream": stream,
                    "current": snapshot.current,
                    "stabilized": snapshot.stabilized,
                    "frame_count": snapshot.frame_count,
                })
            })
            .collect();
        let report = json!({
            "estimator": registry.estimator_kind().to_string(),
            "window_capacity": registry.capacity(),
            "accepted_frames": ingestor.accepted_frames(),
            "rejected_frames": ingestor.rejected_frames(),
            "streams": streams,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let layout = CompositeLayout::new(&config.layout, config.streams.clone());
    for placed in layout.compose(&registry) {
        println!(
            "[{} at {},{} {}x{}]",
            placed.stream, placed.tile.x, placed.tile.y, placed.tile.width, placed.tile.height
        );
        println!("{}", placed.overlay.text);
        println!();
    }

    for summary in &summaries {
        println!(
            "{}: {} accepted, {} rejected, {} malformed lines",
            summary.stream, summary.accepted, summary.rejected, summary.malformed
        );
    }

    Ok(())
}
