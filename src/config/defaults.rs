//! System-wide default constants.
//!
//! Centralises the magic numbers of the detection node. Grouped by subsystem
//! for easy discovery.

// ============================================================================
// Decision Core
// ============================================================================

/// Consecutive identical classifications required before a light state is
/// committed.
pub const STATE_COUNT_THRESHOLD: u32 = 3;

/// Only lights within this many waypoints ahead of the vehicle are classified.
pub const LOOKAHEAD_WAYPOINTS: usize = 100;

/// Published stop waypoint meaning "no stop required".
pub const NO_STOP_WAYPOINT: i64 = -1;

/// Frames between "inputs missing" reminders at info level.
pub const MISSING_INPUT_LOG_INTERVAL: u64 = 50;

// ============================================================================
// Classifier
// ============================================================================

/// Minimum classifier warm-up before readiness is signalled (seconds).
pub const CLASSIFIER_WARMUP_SECS: f64 = 5.0;

/// Share of sampled pixels that must be lit in one color for it to win.
pub const CLASSIFIER_MIN_PIXEL_FRACTION: f64 = 0.02;

/// HSV value (0-255) above which a pixel counts as a lit lamp.
pub const CLASSIFIER_MIN_VALUE: f64 = 150.0;

// ============================================================================
// Camera (simulator intrinsics)
// ============================================================================

pub const CAMERA_FOCAL_LENGTH_X: f64 = 2574.0;
pub const CAMERA_FOCAL_LENGTH_Y: f64 = 2744.0;
pub const CAMERA_IMAGE_WIDTH: u32 = 800;
pub const CAMERA_IMAGE_HEIGHT: u32 = 600;

/// Camera height above the localization origin (m).
pub const CAMERA_MOUNTING_HEIGHT_M: f64 = 1.5;

/// Crop window around a projected light (pixels).
pub const CROP_WIDTH: u32 = 96;
pub const CROP_HEIGHT: u32 = 192;

// ============================================================================
// Map
// ============================================================================

/// Height of a light head above the road when the map omits `z` (m).
pub const LIGHT_HEAD_HEIGHT_M: f64 = 5.8;

// ============================================================================
// Simulation / Replay
// ============================================================================

/// Base delay denominator for `--speed` in replay mode.
///
/// `delay_ms = REPLAY_BASE_DELAY_MS / speed`
pub const REPLAY_BASE_DELAY_MS: u64 = 100;

/// Synthetic frame size emitted by `tl-sim`.
pub const SIM_FRAME_WIDTH: u32 = 80;
pub const SIM_FRAME_HEIGHT: u32 = 60;
