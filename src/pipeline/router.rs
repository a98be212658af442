//! Input router: applies non-image updates to the snapshot store and drops
//! camera frames into the frame slot.
//!
//! Runs until the source is exhausted, errors, or is cancelled. Returning
//! drops the [`FrameSlot`], which ends the processing loop once it has
//! handled the last frame.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::source::{EventSource, InputEvent, SourceEvent};
use super::{FrameSlot, SnapshotStore};

/// Counts of events routed, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub poses: u64,
    pub paths: u64,
    pub light_updates: u64,
    pub frames: u64,
}

/// `force_closed_loop` marks every received path as a closed loop, for
/// tracks whose publisher does not flag it.
pub async fn run_router<S: EventSource>(
    source: &mut S,
    store: Arc<SnapshotStore>,
    frames: FrameSlot,
    force_closed_loop: bool,
    cancel: CancellationToken,
) -> RouterStats {
    let mut stats = RouterStats::default();
    info!(source = source.source_name(), "Routing input events");

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                info!("[Router] Shutdown signal received");
                break;
            }
            result = source.next_event() => match result {
                Ok(SourceEvent::Input(event)) => event,
                Ok(SourceEvent::Eof) => {
                    info!(frames = stats.frames, "[Router] Source reached end");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "[Router] Source error");
                    break;
                }
            }
        };

        match event {
            InputEvent::Pose(pose) => {
                stats.poses += 1;
                store.set_pose(pose);
            }
            InputEvent::Waypoints(mut path) => {
                stats.paths += 1;
                path.closed_loop |= force_closed_loop;
                info!(waypoints = path.len(), closed_loop = path.closed_loop, "Received waypoint path");
                store.set_path(path);
            }
            InputEvent::Lights { lights } => {
                stats.light_updates += 1;
                debug!(lights = lights.len(), "Ground-truth lights updated");
                store.set_ground_truth(lights);
            }
            InputEvent::Frame(frame) => {
                stats.frames += 1;
                if !frame.is_well_formed() {
                    warn!(
                        frame = frame.seq,
                        width = frame.width,
                        height = frame.height,
                        bytes = frame.data.len(),
                        "Frame buffer does not match its dimensions"
                    );
                }
                frames.publish(frame);
                if !frames.is_attached() {
                    warn!("[Router] Frame consumer gone — stopping");
                    break;
                }
            }
        }
    }

    stats
}
