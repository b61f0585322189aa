//! RoadView Replay CLI
//!
//! Load a recording directory into a bounded store and report what is live.

use anyhow::Context;
use clap::Parser;
use roadview_core::ManagerConfig;
use roadview_replay::{load_directory, ReplayConfig, ReplaySummary};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// RoadView recording replay
#[derive(Parser, Debug)]
#[command(name = "roadview-replay")]
#[command(about = "Replay recorded fusion frames into a windowed trajectory store", long_about = None)]
struct Args {
    /// Recording directory (one JSON frame per file)
    data_dir: Option<PathBuf>,

    /// Keep only the most recent N frames (0 = unbounded)
    #[arg(short, long, env = "ROADVIEW_MAX_FRAMES")]
    max_frames: Option<usize>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the replay summary to this JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let mut config = match &args.config {
        Some(path) => ReplayConfig::from_file(path)?,
        None => ReplayConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(max_frames) = args.max_frames {
        config.manager = ManagerConfig::windowed(max_frames);
    }

    let replay = load_directory(&config)
        .with_context(|| format!("failed to load {}", config.data_dir.display()))?;
    let summary = ReplaySummary::from_replay(&config.data_dir, &replay);

    if !args.json {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!(
            "Window: steps {}..={} ({} frames, {} evicted)",
            summary.earliest_step, summary.last_step, summary.live_frames, summary.evicted_frames
        );
        info!(
            "Trajectories: {} live | observations: {} live, {} skipped",
            summary.trajectories.len(),
            summary.live_observations,
            summary.stats.observations_skipped
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if let Some(path) = &args.export {
        summary
            .write_to_file(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Exported summary to {}", path.display());
    }

    Ok(())
}
