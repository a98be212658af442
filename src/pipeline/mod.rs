//! Detection pipeline
//!
//! ```text
//! input events ─► router ─► SnapshotStore + FrameSlot
//!                                   │
//!                          ProcessingLoop (one pass per frame)
//!                                   │
//!   associate ─► lookahead ─► project/crop ─► classify ─► debounce ─► decide
//!                                   │
//!                          StopWaypointSink
//! ```
//!
//! A pass publishes exactly one value per frame, except when pose or route
//! are missing, in which case it publishes nothing.

mod state;
mod coordinator;
mod detector;
mod router;
pub mod source;
pub mod sink;
pub mod processing_loop;

pub use state::*;
pub use coordinator::{DetectorNode, NodeReport};
pub use detector::{PassReport, TrafficLightDetector};
pub use processing_loop::{DetectorStats, ProcessingLoop};
pub use router::{run_router, RouterStats};
