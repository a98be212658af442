//! Latest-known shared state
//!
//! Pose, route and ground-truth lights are replaced wholesale by their
//! update handlers and read lock-free by the per-frame pass. Camera frames
//! go through a single-slot `watch` channel: a new frame overwrites the one
//! waiting, nothing is queued.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;

use crate::types::{Frame, Pose, TrafficLight, WaypointPath};

// ============================================================================
// Snapshot Store
// ============================================================================

/// Last-writer-wins store for the asynchronous non-image inputs.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    pose: ArcSwapOption<Pose>,
    path: ArcSwapOption<WaypointPath>,
    ground_truth: ArcSwapOption<Vec<TrafficLight>>,
}

/// Consistent view taken once at the start of a pass.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub pose: Option<Arc<Pose>>,
    pub path: Option<Arc<WaypointPath>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pose(&self, pose: Pose) {
        self.pose.store(Some(Arc::new(pose)));
    }

    pub fn set_path(&self, path: WaypointPath) {
        self.path.store(Some(Arc::new(path)));
    }

    pub fn set_ground_truth(&self, lights: Vec<TrafficLight>) {
        self.ground_truth.store(Some(Arc::new(lights)));
    }

    pub fn pose(&self) -> Option<Arc<Pose>> {
        self.pose.load_full()
    }

    pub fn path(&self) -> Option<Arc<WaypointPath>> {
        self.path.load_full()
    }

    /// Latest simulator light array. Informational only.
    pub fn ground_truth(&self) -> Option<Arc<Vec<TrafficLight>>> {
        self.ground_truth.load_full()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pose: self.pose(),
            path: self.path(),
        }
    }
}

// ============================================================================
// Frame Slot
// ============================================================================

/// Producer side of the most-recent-wins frame slot.
///
/// Dropping the slot closes the stream; the processing loop drains the
/// frame still waiting and then stops.
#[derive(Debug)]
pub struct FrameSlot {
    tx: watch::Sender<Option<Arc<Frame>>>,
}

impl FrameSlot {
    pub fn new() -> (Self, watch::Receiver<Option<Arc<Frame>>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    /// Overwrite the current frame, whether or not the previous one was
    /// consumed.
    pub fn publish(&self, frame: Frame) {
        self.tx.send_replace(Some(Arc::new(frame)));
    }

    /// Whether any consumer is still listening.
    pub fn is_attached(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}
