//! Per-frame detection pass
//!
//! ```text
//! snapshot ─► associate ─► lookahead gate ─► project + crop ─► classify
//!                 │              │                  │              │
//!           NoLightAhead     hold last         fallback        debounce
//!             publish -1      decision        (whole/skip)         │
//!                                                               decide ─► publish
//! ```
//!
//! The detector owns the debounce and decision state. Exactly one pass runs
//! at a time; the processing loop moves the detector onto a blocking worker
//! for each frame and takes it back afterwards.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::Snapshot;
use crate::association::{associate, Association, LightAhead};
use crate::classifier::{ClassifierHandle, ClassifyRequest};
use crate::config::{CameraConfig, DetectorConfig, TransformFallback};
use crate::debounce::{DebounceOutcome, StateDebouncer};
use crate::decision::{PublishDecider, StopWaypoint};
use crate::error::{DetectorError, RequiredInput};
use crate::map_index::MapIndex;
use crate::projection::TransformProjector;
use crate::types::{Frame, LightState, PixelRect, Pose, TrafficLight};

/// What a completed pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub frame_seq: u64,
    /// Value to publish for this frame
    pub publish: StopWaypoint,
    pub association: Association,
    /// Raw observation fed to the debouncer, if the pass got that far
    pub observation: Option<LightState>,
    pub outcome: Option<DebounceOutcome>,
    /// Whether the classifier was actually invoked
    pub classified: bool,
}

impl PassReport {
    fn hold(frame_seq: u64, publish: StopWaypoint, association: Association) -> Self {
        Self {
            frame_seq,
            publish,
            association,
            observation: None,
            outcome: None,
            classified: false,
        }
    }

    /// True when the committed light state changed on this frame.
    pub fn committed_transition(&self) -> bool {
        matches!(self.outcome, Some(DebounceOutcome::Committed { changed: true, .. }))
    }
}

pub struct TrafficLightDetector {
    config: DetectorConfig,
    camera: CameraConfig,
    map: Arc<MapIndex>,
    projector: Arc<dyn TransformProjector>,
    classifier: ClassifierHandle,
    debouncer: StateDebouncer,
    decider: PublishDecider,
    /// Light chosen on the previous successful association
    nearest_light: Option<usize>,
    missing_input_frames: u64,
}

impl TrafficLightDetector {
    pub fn new(
        config: DetectorConfig,
        camera: CameraConfig,
        map: Arc<MapIndex>,
        projector: Arc<dyn TransformProjector>,
        classifier: ClassifierHandle,
    ) -> Self {
        Self {
            debouncer: StateDebouncer::new(config.state_count_threshold),
            config,
            camera,
            map,
            projector,
            classifier,
            decider: PublishDecider::new(),
            nearest_light: None,
            missing_input_frames: 0,
        }
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    /// Currently committed (debounced) light state.
    pub fn committed_state(&self) -> LightState {
        self.debouncer.committed()
    }

    /// Last committed publish decision.
    pub fn current_decision(&self) -> StopWaypoint {
        self.decider.current()
    }

    /// Run one pass for `frame` against a snapshot taken at pass start.
    ///
    /// # Errors
    ///
    /// Only [`DetectorError::MissingInput`] escapes; the caller publishes
    /// nothing for that frame. Every other failure degrades inside the pass.
    pub fn process(&mut self, frame: &Frame, snapshot: &Snapshot) -> Result<PassReport, DetectorError> {
        let inputs = snapshot
            .pose
            .as_deref()
            .ok_or(DetectorError::MissingInput(RequiredInput::Pose))
            .and_then(|pose| Ok((pose, associate(Some(pose), snapshot.path.as_deref(), &self.map)?)));
        let (pose, association) = match inputs {
            Ok(found) => found,
            Err(e) => {
                self.note_missing_input(frame.seq, &e);
                return Err(e);
            }
        };
        if self.missing_input_frames > 0 {
            info!(skipped = self.missing_input_frames, "Inputs available — detection running");
            self.missing_input_frames = 0;
        }

        let ahead = match association {
            Association::NoLightAhead => {
                self.note_nearest(None);
                let publish = self.decider.on_no_light_ahead();
                debug!(frame = frame.seq, "No traffic light ahead");
                return Ok(PassReport::hold(frame.seq, publish, association));
            }
            Association::LightAhead(ahead) => ahead,
        };
        self.note_nearest(Some(&ahead));

        if ahead.light_waypoint_offset > self.config.lookahead_waypoints {
            debug!(
                frame = frame.seq,
                light = ahead.light_index,
                offset = ahead.light_waypoint_offset,
                "Light beyond lookahead — holding state"
            );
            return Ok(self.hold(frame.seq, &ahead, association));
        }

        let light = &ahead.light;
        let (image, cropped) = match self.crop_around(frame, light, pose) {
            Ok(crop) => (Cow::Owned(crop), true),
            Err(e) => match self.config.transform_fallback {
                TransformFallback::WholeFrame => {
                    debug!(frame = frame.seq, error = %e, "Classifying whole frame");
                    (Cow::Borrowed(frame), false)
                }
                TransformFallback::SkipFrame => {
                    debug!(frame = frame.seq, error = %e, "Skipping frame");
                    return Ok(self.hold(frame.seq, &ahead, association));
                }
            },
        };

        let request = ClassifyRequest {
            image: &*image,
            light,
            light_index: ahead.light_index,
            cropped,
        };
        let (observation, classified) = match self.classifier.classify(&request) {
            Ok(state) => (state, true),
            Err(DetectorError::ClassifierNotReady) => (LightState::Unknown, false),
            Err(e) => {
                warn!(frame = frame.seq, error = %e, "Classification failed — using UNKNOWN");
                (LightState::Unknown, true)
            }
        };

        let previous = self.debouncer.committed();
        let outcome = self.debouncer.observe(observation);
        let publish = self.decider.on_observation(&outcome, &ahead);

        if let DebounceOutcome::Committed { state, changed: true } = outcome {
            info!(
                from = %previous,
                to = %state,
                light = ahead.light_index,
                traffic_waypoint = publish.to_wire(),
                "Traffic light state committed"
            );
        }
        debug!(
            frame = frame.seq,
            light = ahead.light_index,
            offset = ahead.light_waypoint_offset,
            observation = %observation,
            committed = %outcome.stable_state(),
            traffic_waypoint = publish.to_wire(),
            "Pass complete"
        );

        Ok(PassReport {
            frame_seq: frame.seq,
            publish,
            association,
            observation: Some(observation),
            outcome: Some(outcome),
            classified,
        })
    }

    /// Pass that skips classification: the committed state is carried over
    /// to the light currently ahead.
    fn hold(&mut self, frame_seq: u64, ahead: &LightAhead, association: Association) -> PassReport {
        let publish = self.decider.hold(self.debouncer.committed(), ahead);
        PassReport::hold(frame_seq, publish, association)
    }

    /// Crop centered on the projected light, scaled to the frame's actual
    /// resolution.
    fn crop_around(
        &self,
        frame: &Frame,
        light: &TrafficLight,
        pose: &Pose,
    ) -> Result<Frame, DetectorError> {
        let point = self
            .projector
            .project(&light.position, pose)
            .map_err(|e| DetectorError::TransformUnavailable(e.to_string()))?;

        let sx = f64::from(frame.width) / f64::from(self.camera.image_width.max(1));
        let sy = f64::from(frame.height) / f64::from(self.camera.image_height.max(1));
        let crop_w = ((f64::from(self.camera.crop_width) * sx).round() as u32).max(1);
        let crop_h = ((f64::from(self.camera.crop_height) * sy).round() as u32).max(1);

        let rect = PixelRect::centered(point.x * sx, point.y * sy, crop_w, crop_h, frame.width, frame.height)
            .ok_or_else(|| DetectorError::TransformUnavailable("empty frame".to_string()))?;
        Ok(frame.crop(&rect))
    }

    fn note_nearest(&mut self, ahead: Option<&LightAhead>) {
        let index = ahead.map(|a| a.light_index);
        if index == self.nearest_light {
            return;
        }
        match ahead {
            Some(a) => info!(
                light = a.light_index,
                stop_waypoint = a.stop_waypoint,
                offset = a.light_waypoint_offset,
                distance_m = a.distance_m,
                "Nearest traffic light changed"
            ),
            None => info!("No traffic light ahead on route"),
        }
        self.nearest_light = index;
    }

    fn note_missing_input(&mut self, frame_seq: u64, error: &DetectorError) {
        self.missing_input_frames += 1;
        debug!(frame = frame_seq, error = %error, "Pass aborted");
        let interval = self.config.missing_input_log_interval.max(1);
        if self.missing_input_frames % interval == 1 || interval == 1 {
            info!(frames = self.missing_input_frames, error = %error, "Waiting for inputs before detecting");
        }
    }
}

impl std::fmt::Debug for TrafficLightDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficLightDetector")
            .field("lights", &self.map.len())
            .field("committed", &self.debouncer.committed())
            .field("decision", &self.decider.current())
            .field("classifier", &self.classifier)
            .finish()
    }
}
