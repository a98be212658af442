//! Traffic Light Drive Simulation
//!
//! Generates a synthetic closed-loop drive as JSON-lines input events for
//! tl-detector:
//! - one waypoint path (a circle)
//! - a pose per frame moving along it
//! - the ground-truth light array
//! - camera frames with the light ahead painted in its current color
//!
//! # Usage
//! ```bash
//! ./tl-sim --write-config sim.toml --flicker 0.1 | ./tl-detector --stdin --config sim.toml
//! ```

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;

use tl_detector::config::{CameraConfig, NodeConfig};
use tl_detector::pipeline::source::InputEvent;
use tl_detector::sim::{SimConfig, SimDrive};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "tl-sim")]
#[command(about = "Synthetic traffic light drive for tl-detector testing")]
#[command(version)]
struct Args {
    /// Number of waypoints on the loop
    #[arg(long, default_value = "400", value_parser = clap::value_parser!(u32).range(3..=100_000))]
    waypoints: u32,

    /// Loop radius in meters
    #[arg(long, default_value = "100")]
    radius: f64,

    /// Traffic lights spaced evenly around the loop
    #[arg(long, default_value = "4")]
    lights: u32,

    /// Laps to drive
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=1000))]
    laps: u32,

    /// Frames per light color phase
    #[arg(long, default_value = "40")]
    phase_frames: u64,

    /// Probability that a frame shows a random color (0-1)
    #[arg(long, default_value = "0")]
    flicker: f64,

    /// Output frame rate in Hz (0 = as fast as possible)
    #[arg(long, default_value = "10")]
    rate: u32,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Write a tl-detector config with this drive's light map, then continue
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,

    /// Suppress the mission log (only output events)
    #[arg(short, long)]
    quiet: bool,
}

fn log_mission(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[tl-sim] {message}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if !(0.0..=1.0).contains(&args.flicker) {
        return Err(format!("--flicker must be within 0..=1, got {}", args.flicker).into());
    }

    let camera = CameraConfig::default();
    let drive = SimDrive::new(
        SimConfig {
            waypoints: args.waypoints as usize,
            radius_m: args.radius,
            lights: args.lights as usize,
            phase_frames: args.phase_frames,
            flicker: args.flicker,
            laps: args.laps,
            seed: args.seed,
            ..SimConfig::default()
        },
        &camera,
    );

    log_mission(&"=".repeat(60), args.quiet);
    log_mission("TRAFFIC LIGHT DRIVE SIMULATION", args.quiet);
    log_mission(&format!("  Loop: {} waypoints, radius {:.0} m", args.waypoints, args.radius), args.quiet);
    log_mission(&format!("  Lights: {} (RED -> GREEN -> YELLOW, {} frames each)", args.lights, args.phase_frames), args.quiet);
    log_mission(&format!("  Frames: {} at {} Hz", drive.total_frames(), args.rate), args.quiet);
    if args.flicker > 0.0 {
        log_mission(&format!("  Flicker noise: {:.0}%", args.flicker * 100.0), args.quiet);
    }
    if let Some(seed) = args.seed {
        log_mission(&format!("  Random seed: {seed}"), args.quiet);
    }
    log_mission(&"=".repeat(60), args.quiet);

    if let Some(path) = &args.write_config {
        let mut config = NodeConfig::default();
        config.map = drive.map_config();
        config.route.closed_loop = true;
        std::fs::write(path, config.to_toml()?)?;
        log_mission(&format!("Wrote detector config to {}", path.display()), args.quiet);
    }

    let interval = (args.rate > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(args.rate)));
    let total = drive.total_frames().max(1);
    let mut last_percent = 0;
    let mut frames = 0u64;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut frame_start = Instant::now();

    for event in drive {
        let is_frame = matches!(event, InputEvent::Frame(_));
        serde_json::to_writer(&mut out, &event)?;
        out.write_all(b"\n")?;

        if !is_frame {
            continue;
        }
        out.flush()?;
        frames += 1;

        let percent = frames * 100 / total;
        if percent >= last_percent + 10 {
            last_percent = percent;
            log_mission(&format!("{percent}% ({frames}/{total} frames)"), args.quiet);
        }

        if let Some(interval) = interval {
            let elapsed = frame_start.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
            frame_start = Instant::now();
        }
    }
    out.flush()?;

    log_mission("SIMULATION COMPLETE", args.quiet);
    Ok(())
}
