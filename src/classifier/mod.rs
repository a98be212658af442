//! Traffic light classifier collaborator
//!
//! The detector treats the classifier as an opaque, potentially slow call
//! that maps an image (crop) to a [`LightState`]. It is not usable until
//! its one-shot readiness signal fires; until then the pass substitutes
//! UNKNOWN without invoking it.
//!
//! ## Implementations
//!
//! - [`ColorClassifier`]: HSV lamp-color vote (default)
//! - [`GroundTruthClassifier`]: simulator ground-truth state (debug only)

mod color;
mod ground_truth;
mod readiness;

pub use color::{rgb_to_hsv, ColorClassifier};
pub use ground_truth::GroundTruthClassifier;
pub use readiness::Readiness;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::error::DetectorError;
use crate::pipeline::SnapshotStore;
use crate::types::{Frame, LightState, TrafficLight};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model failed to load: {0}")]
    Load(String),

    #[error("Malformed image: {0}")]
    BadImage(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Everything a classifier may look at for one pass.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRequest<'a> {
    /// Crop around the light, or the whole frame when projection failed
    pub image: &'a Frame,
    /// Map entry of the light being classified
    pub light: &'a TrafficLight,
    pub light_index: usize,
    /// Whether `image` is a crop around the projected light
    pub cropped: bool,
}

/// Image -> light state.
///
/// Implementations may block; the pipeline calls them off the async
/// reactor.
pub trait LightClassifier: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// One-time model initialization, run on a blocking worker before
    /// readiness is signalled.
    fn warm_up(&self) -> Result<(), ClassifierError> {
        Ok(())
    }

    fn classify(&self, request: &ClassifyRequest<'_>) -> Result<LightState, ClassifierError>;
}

/// Build the configured classifier.
pub fn from_config(config: &ClassifierConfig, store: Arc<SnapshotStore>) -> Arc<dyn LightClassifier> {
    match config.kind {
        ClassifierKind::Color => Arc::new(ColorClassifier::new(config)),
        ClassifierKind::GroundTruth => {
            warn!("Using simulator ground-truth classifier — not available on a real vehicle");
            Arc::new(GroundTruthClassifier::new(store))
        }
    }
}

// ============================================================================
// Classifier Handle
// ============================================================================

/// Shared handle: classifier + readiness gate + invocation counter.
#[derive(Clone)]
pub struct ClassifierHandle {
    inner: Arc<dyn LightClassifier>,
    readiness: Arc<Readiness>,
    invocations: Arc<AtomicU64>,
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("classifier", &self.inner.name())
            .field("ready", &self.is_ready())
            .field("invocations", &self.invocations())
            .finish()
    }
}

impl ClassifierHandle {
    /// New handle in the not-ready state.
    pub fn new(classifier: Arc<dyn LightClassifier>) -> Self {
        Self {
            inner: classifier,
            readiness: Arc::new(Readiness::new()),
            invocations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn readiness(&self) -> &Arc<Readiness> {
        &self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Number of times the underlying classifier was actually invoked.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Classify, refusing while not ready.
    ///
    /// # Errors
    ///
    /// - [`DetectorError::ClassifierNotReady`] before readiness (no invocation)
    /// - [`DetectorError::Classifier`] if the classifier itself fails
    pub fn classify(&self, request: &ClassifyRequest<'_>) -> Result<LightState, DetectorError> {
        if !self.is_ready() {
            return Err(DetectorError::ClassifierNotReady);
        }
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.inner
            .classify(request)
            .map_err(|e| DetectorError::Classifier(e.to_string()))
    }

    /// Warm the classifier up in the background and signal readiness once
    /// both the warm-up and `min_delay` have elapsed.
    ///
    /// A failed warm-up leaves the handle permanently not-ready; the node
    /// keeps running and publishes from UNKNOWN observations.
    pub fn spawn_warm_up(&self, min_delay: Duration) -> tokio::task::JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            info!(
                classifier = handle.name(),
                min_delay_secs = min_delay.as_secs_f64(),
                "Waiting for traffic light classifier to load"
            );
            let classifier = Arc::clone(&handle.inner);
            let (_, warm_up) = tokio::join!(
                tokio::time::sleep(min_delay),
                tokio::task::spawn_blocking(move || classifier.warm_up()),
            );
            match warm_up {
                Ok(Ok(())) => {
                    if handle.readiness.mark_ready() {
                        info!(classifier = handle.name(), "Traffic light classifier loaded");
                    }
                }
                Ok(Err(e)) => {
                    warn!(classifier = handle.name(), error = %e, "Classifier warm-up failed — staying on UNKNOWN");
                }
                Err(e) => {
                    warn!(classifier = handle.name(), error = %e, "Classifier warm-up task panicked — staying on UNKNOWN");
                }
            }
        })
    }
}
