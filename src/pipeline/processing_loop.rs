//! Frame processing loop.
//!
//! Waits on the most-recent-wins frame slot, runs one detection pass per
//! frame on a blocking worker and publishes the result. A frame arriving
//! mid-pass replaces whatever is waiting for the next pass; it never
//! interrupts the one in flight.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::sink::{Publication, StopWaypointSink};
use super::{SnapshotStore, TrafficLightDetector};
use crate::types::Frame;

/// Final counters returned by [`ProcessingLoop::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectorStats {
    pub frames_processed: u64,
    pub frames_missing_input: u64,
    pub classifier_invocations: u64,
    pub publishes: u64,
    pub committed_transitions: u64,
    /// Last value sent to the sink (`-1` if none)
    pub last_published: i64,
}

impl Default for DetectorStats {
    fn default() -> Self {
        Self {
            frames_processed: 0,
            frames_missing_input: 0,
            classifier_invocations: 0,
            publishes: 0,
            committed_transitions: 0,
            last_published: crate::config::defaults::NO_STOP_WAYPOINT,
        }
    }
}

/// Owns the detector for the lifetime of the node.
///
/// Built with [`new()`](ProcessingLoop::new), consumed by
/// [`run()`](ProcessingLoop::run).
pub struct ProcessingLoop<K: StopWaypointSink> {
    detector: TrafficLightDetector,
    store: Arc<SnapshotStore>,
    frames: watch::Receiver<Option<Arc<Frame>>>,
    sink: K,
    cancel_token: CancellationToken,
}

impl<K: StopWaypointSink> ProcessingLoop<K> {
    pub fn new(
        detector: TrafficLightDetector,
        store: Arc<SnapshotStore>,
        frames: watch::Receiver<Option<Arc<Frame>>>,
        sink: K,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            detector,
            store,
            frames,
            sink,
            cancel_token,
        }
    }

    /// Run until cancelled, the frame stream closes, or the sink fails.
    pub async fn run(self) -> DetectorStats {
        let Self {
            mut detector,
            store,
            mut frames,
            mut sink,
            cancel_token,
        } = self;

        let mut stats = DetectorStats::default();
        let classifier = detector.classifier().clone();
        let mut ready_rx = classifier.readiness().subscribe();
        let mut awaiting_ready = !*ready_rx.borrow_and_update();

        info!(
            sink = sink.sink_name(),
            classifier = classifier.name(),
            ready = !awaiting_ready,
            "Traffic light detector running"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    info!("[Detector] Shutdown signal received");
                    break;
                }
                changed = ready_rx.changed(), if awaiting_ready => {
                    awaiting_ready = false;
                    if changed.is_ok() && *ready_rx.borrow_and_update() {
                        info!(classifier = classifier.name(), "Classifier ready — live classification enabled");
                    }
                    continue;
                }
                changed = frames.changed() => {
                    if changed.is_err() {
                        info!(frames = stats.frames_processed, "[Detector] Frame stream closed");
                        break;
                    }
                }
            }

            let Some(frame) = frames.borrow_and_update().clone() else {
                continue;
            };
            let snapshot = store.snapshot();

            let pass = tokio::task::spawn_blocking(move || {
                let result = detector.process(&frame, &snapshot);
                (detector, result)
            })
            .await;

            let result = match pass {
                Ok((returned, result)) => {
                    detector = returned;
                    result
                }
                Err(e) => {
                    warn!(error = %e, "[Detector] Detection pass panicked — stopping");
                    break;
                }
            };

            stats.frames_processed += 1;
            let report = match result {
                Ok(report) => report,
                Err(e) if e.aborts_pass() => {
                    stats.frames_missing_input += 1;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "[Detector] Pass failed");
                    continue;
                }
            };

            if report.committed_transition() {
                stats.committed_transitions += 1;
            }

            let publication = Publication {
                frame_seq: report.frame_seq,
                value: report.publish,
            };
            if let Err(e) = sink.publish(publication).await {
                warn!(error = %e, sink = sink.sink_name(), "[Detector] Sink closed — stopping");
                break;
            }
            stats.publishes += 1;
            stats.last_published = report.publish.to_wire();
        }

        stats.classifier_invocations = classifier.invocations();
        info!(
            frames_processed = stats.frames_processed,
            frames_missing_input = stats.frames_missing_input,
            classifier_invocations = stats.classifier_invocations,
            publishes = stats.publishes,
            committed_transitions = stats.committed_transitions,
            last_published = stats.last_published,
            "Detector stopped"
        );
        stats
    }
}
