//! tl-detector: Traffic Light Detection Node
//!
//! Decides, frame by frame, whether the vehicle is approaching a red light
//! and publishes the waypoint it should stop at (`-1` when no stop is
//! required).
//!
//! ## Architecture
//!
//! - **Map Index**: static traffic light positions from configuration
//! - **Waypoint Associator**: nearest upcoming light on the route
//! - **State Debouncer**: N consecutive identical classifications to commit
//! - **Publish-Decision Engine**: committed RED -> stop waypoint, else `-1`
//! - **Collaborators**: [`projection::TransformProjector`] and
//!   [`classifier::LightClassifier`] traits with reference implementations

pub mod association;
pub mod classifier;
pub mod config;
pub mod debounce;
pub mod decision;
pub mod error;
pub mod map_index;
pub mod pipeline;
pub mod projection;
pub mod sim;
pub mod types;

// Re-export node configuration
pub use config::NodeConfig;

// Re-export commonly used types
pub use types::{
    Frame, LightState, Orientation, Point3, Pose, TrafficLight, Waypoint, WaypointPath,
};

// Re-export the decision core
pub use association::{associate, Association, LightAhead};
pub use debounce::{DebounceOutcome, StateDebouncer};
pub use decision::{decide, PublishDecider, StopWaypoint};
pub use error::{DetectorError, RequiredInput};
pub use map_index::MapIndex;

// Re-export runtime
pub use classifier::{ClassifierHandle, LightClassifier};
pub use pipeline::{DetectorNode, DetectorStats, NodeReport, SnapshotStore, TrafficLightDetector};
