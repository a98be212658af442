//! Shared data structures for the traffic light detection node
//!
//! This module defines the core types that flow through the per-frame pass:
//! - Inputs: Pose, WaypointPath (route), TrafficLight (map + ground truth), Frame
//! - Classification: LightState
//! - Output: StopWaypoint (`-1` sentinel when no stop is required)

mod geometry;
mod light;
mod frame;

pub use geometry::*;
pub use light::*;
pub use frame::*;
