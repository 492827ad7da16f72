use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use ball_localizer::prelude::*;
use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Replays a recorded detection log through the ball localizer and prints the tracked balls
/// after every frame.
#[derive(Parser, Debug)]
#[clap(version, about)]
struct Cli {
    /// Recorded detection log (JSON)
    log: PathBuf,

    /// Directory containing `ball_localizer.toml`
    #[clap(long, default_value = "./config")]
    config: PathBuf,

    /// Directory containing a robot specific overlay of the config
    #[clap(long)]
    overlay: Option<PathBuf>,

    /// Pretty print every frame
    #[clap(long)]
    pretty: bool,
}

/// A single frame of a recorded log.
#[derive(Debug, Deserialize)]
struct Frame {
    /// Seconds since the previous frame
    dt: f32,
    pose: RobotPose,
    #[serde(default)]
    detections: Vec<BallDetection>,
}

#[derive(Debug, Serialize)]
struct FrameOutput {
    frame: usize,
    tracks: Vec<TrackSnapshot>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    miette::set_panic_hook();

    let cli = Cli::parse();

    let config = BallLocalizerConfig::load_validated(&cli.config, cli.overlay.as_deref())
        .wrap_err_with(|| format!("failed to load config from {}", cli.config.display()))?;

    let log = fs::read_to_string(&cli.log)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", cli.log.display()))?;
    let frames: Vec<Frame> = serde_json::from_str(&log)
        .into_diagnostic()
        .wrap_err("failed to parse detection log")?;

    tracing::info!(frames = frames.len(), "replaying detection log");

    // time only moves with the log, so replays are reproducible
    let clock = Arc::new(ManualClock::new());
    let environment = Environment::from_config(&config).with_clock(clock.clone());
    let mut localizer = BallLocalizer::new(config, environment);

    let mut stdout = io::stdout().lock();
    for (index, frame) in frames.iter().enumerate() {
        clock.advance_secs(frame.dt);
        localizer.update(&frame.pose, &frame.detections, frame.dt);

        let output = FrameOutput {
            frame: index,
            tracks: localizer.snapshots(),
        };

        let line = if cli.pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        }
        .into_diagnostic()?;

        writeln!(stdout, "{line}").into_diagnostic()?;
    }

    tracing::info!(tracks = localizer.len(), "replay finished");

    Ok(())
}
