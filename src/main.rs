//! tl-detector - Traffic Light Detection Node
//!
//! Reads pose, waypoint, ground-truth light and camera events as JSON
//! lines and writes one `{"traffic_waypoint": N}` line per processed frame.
//!
//! # Usage
//!
//! ```bash
//! # Built-in synthetic closed-loop drive
//! cargo run --release
//!
//! # Live input from the simulator bridge
//! tl-sim --flicker 0.1 | tl-detector --stdin
//!
//! # Replay a recorded session at 4x
//! tl-detector --replay session.jsonl --speed 4
//! ```
//!
//! # Environment Variables
//!
//! - `TL_DETECTOR_CONFIG`: path to the node TOML config
//! - `RUST_LOG`: logging level (default: info)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tl_detector::config::{self, defaults, NodeConfig};
use tl_detector::pipeline::sink::StdoutSink;
use tl_detector::pipeline::source::{ChannelSource, JsonlFileSource, StdinSource};
use tl_detector::pipeline::{DetectorNode, NodeReport};
use tl_detector::sim::{SimConfig, SimDrive};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "tl-detector")]
#[command(about = "Traffic light detection node: publishes the stop waypoint for red lights ahead")]
#[command(version)]
struct CliArgs {
    /// Read JSON-lines input events from stdin
    /// Use with simulator: tl-sim | tl-detector --stdin
    #[arg(long, conflicts_with = "replay")]
    stdin: bool,

    /// Replay a recorded JSON-lines session
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Replay / synthetic speed multiplier (1 = 10 fps, 0 = no delay)
    #[arg(long, default_value = "1")]
    speed: u64,

    /// Node config file (overrides TL_DETECTOR_CONFIG and ./tl_detector.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Logs go to stderr; stdout carries the output stream
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn frame_delay(speed: u64) -> Duration {
    if speed == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(defaults::REPLAY_BASE_DELAY_MS / speed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let node_config = match NodeConfig::load_or_search(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Config could not be loaded — using built-in defaults");
            NodeConfig::default()
        }
    };

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  tl-detector - Traffic Light Detection Node");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let report = if args.stdin {
        info!("Input: stdin (JSON lines)");
        config::init(node_config);
        DetectorNode::from_config(config::get().clone())
            .run(StdinSource::new(), StdoutSink::new(), cancel_token)
            .await?
    } else if let Some(path) = args.replay {
        let delay = frame_delay(args.speed);
        info!(path = %path.display(), delay_ms = delay.as_millis() as u64, "Input: replay");
        let source = JsonlFileSource::open(&path, delay).await?;
        config::init(node_config);
        DetectorNode::from_config(config::get().clone())
            .run(source, StdoutSink::new(), cancel_token)
            .await?
    } else {
        run_synthetic(node_config, frame_delay(args.speed), cancel_token).await?
    };

    info!(
        frames_routed = report.router.frames,
        frames_processed = report.detector.frames_processed,
        publishes = report.detector.publishes,
        "tl-detector shutdown complete"
    );
    Ok(())
}

/// Drive the node with the built-in synthetic loop. The map comes from the
/// drive unless the config already lists lights.
async fn run_synthetic(
    mut node_config: NodeConfig,
    delay: Duration,
    cancel_token: CancellationToken,
) -> Result<NodeReport> {
    let drive = SimDrive::new(SimConfig { seed: Some(42), ..SimConfig::default() }, &node_config.camera);
    if node_config.map.lights.is_empty() {
        node_config.map = drive.map_config();
    }
    node_config.route.closed_loop = true;
    info!(frames = drive.total_frames(), "Input: synthetic closed-loop drive");

    let (tx, source) = ChannelSource::channel(64);
    let producer_cancel = cancel_token.clone();
    tokio::spawn(async move {
        for event in drive {
            let is_frame = event.kind() == "frame";
            if tx.send(event).await.is_err() || producer_cancel.is_cancelled() {
                break;
            }
            if is_frame && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    });

    config::init(node_config);
    DetectorNode::from_config(config::get().clone())
        .run(source, StdoutSink::new(), cancel_token)
        .await
        .context("synthetic drive failed")
}
