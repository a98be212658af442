//! Per-frame pass error taxonomy
//!
//! Every variant is local and recoverable. The next frame is the retry.

use thiserror::Error;

/// Upstream value a pass needs before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredInput {
    Pose,
    WaypointPath,
}

impl std::fmt::Display for RequiredInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequiredInput::Pose => f.write_str("pose"),
            RequiredInput::WaypointPath => f.write_str("waypoint path"),
        }
    }
}

/// Detection pass errors
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Pose or path never arrived (or the path is empty). The pass aborts
    /// without publishing.
    #[error("Missing input: {0}")]
    MissingInput(RequiredInput),

    /// No world-to-image mapping for the light. Degrades to whole-frame
    /// classification or a skipped frame.
    #[error("Transform unavailable: {0}")]
    TransformUnavailable(String),

    /// Classifier still warming up. The pass substitutes UNKNOWN.
    #[error("Classifier not ready")]
    ClassifierNotReady,

    /// Classifier failed on this frame. The pass substitutes UNKNOWN.
    #[error("Classifier error: {0}")]
    Classifier(String),
}

impl DetectorError {
    /// Whether the pass should abort without publishing.
    pub const fn aborts_pass(&self) -> bool {
        matches!(self, DetectorError::MissingInput(_))
    }
}
