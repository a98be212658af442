//! Node coordinator: wires the detector together from configuration and
//! runs it.
//!
//! ```text
//! EventSource ─► router ─┬─► SnapshotStore (pose / path / lights)
//!                        └─► FrameSlot ─► ProcessingLoop ─► StopWaypointSink
//!                                              ▲
//!                     classifier warm-up ──────┘ (readiness)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::processing_loop::{DetectorStats, ProcessingLoop};
use super::router::{run_router, RouterStats};
use super::sink::StopWaypointSink;
use super::source::EventSource;
use super::{FrameSlot, SnapshotStore, TrafficLightDetector};
use crate::classifier::{self, ClassifierHandle, LightClassifier};
use crate::config::NodeConfig;
use crate::map_index::MapIndex;
use crate::projection::{PinholeProjector, TransformProjector};

/// Combined statistics for one node run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub router: RouterStats,
    pub detector: DetectorStats,
}

/// Fully assembled node, ready to [`run`](DetectorNode::run).
pub struct DetectorNode {
    config: NodeConfig,
    store: Arc<SnapshotStore>,
    map: Arc<MapIndex>,
    projector: Arc<dyn TransformProjector>,
    classifier: ClassifierHandle,
}

impl DetectorNode {
    /// Build every component from configuration: map index, pinhole
    /// projector and the configured classifier.
    pub fn from_config(config: NodeConfig) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let map = Arc::new(MapIndex::from_config(&config.map));
        let projector: Arc<dyn TransformProjector> = Arc::new(PinholeProjector::new(&config.camera));
        let classifier = ClassifierHandle::new(classifier::from_config(&config.classifier, Arc::clone(&store)));

        info!(
            node = %config.node.name,
            lights = map.len(),
            classifier = classifier.name(),
            threshold = config.detector.state_count_threshold,
            lookahead = config.detector.lookahead_waypoints,
            "Detector node assembled"
        );

        Self {
            config,
            store,
            map,
            projector,
            classifier,
        }
    }

    /// Replace the configured classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn LightClassifier>) -> Self {
        self.classifier = ClassifierHandle::new(classifier);
        self
    }

    /// Replace the pinhole projector.
    pub fn with_projector(mut self, projector: Arc<dyn TransformProjector>) -> Self {
        self.projector = projector;
        self
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    /// Run until the source is exhausted (and its last frame handled), the
    /// sink closes, or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Only if the router task panics.
    pub async fn run<S, K>(self, source: S, sink: K, cancel: CancellationToken) -> Result<NodeReport>
    where
        S: EventSource,
        K: StopWaypointSink,
    {
        let min_delay = Duration::try_from_secs_f64(self.config.classifier.warmup_secs).unwrap_or(Duration::ZERO);
        let warm_up = self.classifier.spawn_warm_up(min_delay);

        let (slot, frames) = FrameSlot::new();
        let stop = cancel.child_token();

        let router_store = Arc::clone(&self.store);
        let router_cancel = stop.clone();
        let closed_loop = self.config.route.closed_loop;
        let router = tokio::spawn(async move {
            let mut source = source;
            run_router(&mut source, router_store, slot, closed_loop, router_cancel).await
        });

        let detector = TrafficLightDetector::new(
            self.config.detector.clone(),
            self.config.camera.clone(),
            self.map,
            self.projector,
            self.classifier,
        );
        let stats = ProcessingLoop::new(detector, self.store, frames, sink, stop.clone()).run().await;

        // Loop ended on its own (sink gone): stop the router as well
        stop.cancel();
        let router_stats = router.await.context("input router task failed")?;
        warm_up.abort();

        Ok(NodeReport {
            router: router_stats,
            detector: stats,
        })
    }
}
