//! Pipeline Scenario Tests
//!
//! End-to-end decision scenarios through `TrafficLightDetector`: association,
//! lookahead gate, classifier readiness, debounce and publish decision.
//! The classifier is scripted so each test controls the raw observations
//! exactly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tl_detector::classifier::{ClassifierError, ClassifierHandle, ClassifyRequest, ColorClassifier, LightClassifier};
use tl_detector::config::{CameraConfig, ClassifierConfig, DetectorConfig};
use tl_detector::pipeline::source::InputEvent;
use tl_detector::pipeline::{Snapshot, SnapshotStore, TrafficLightDetector};
use tl_detector::projection::{ImagePoint, PinholeProjector, ProjectionError, TransformProjector};
use tl_detector::sim::{SimConfig, SimDrive};
use tl_detector::{
    decide, DetectorError, Frame, LightState, MapIndex, Orientation, Point3, Pose, RequiredInput,
    StopWaypoint, TrafficLight, Waypoint, WaypointPath,
};

use LightState::{Green, Red, Unknown, Yellow};

// ============================================================================
// Fixtures
// ============================================================================

/// Replays queued observations; UNKNOWN once the queue runs dry.
struct ScriptedClassifier {
    queue: Mutex<VecDeque<LightState>>,
}

impl ScriptedClassifier {
    fn new(states: &[LightState]) -> Arc<Self> {
        Arc::new(Self { queue: Mutex::new(states.iter().copied().collect()) })
    }
}

impl LightClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    fn classify(&self, _request: &ClassifyRequest<'_>) -> Result<LightState, ClassifierError> {
        Ok(self.queue.lock().unwrap().pop_front().unwrap_or(Unknown))
    }
}

struct NoTransform;

impl TransformProjector for NoTransform {
    fn project(&self, _world: &Point3, _pose: &Pose) -> Result<ImagePoint, ProjectionError> {
        Err(ProjectionError::Unavailable)
    }
}

fn straight_route(n: usize) -> WaypointPath {
    WaypointPath::new((0..n).map(|i| Waypoint::new(i as f64, 0.0)).collect())
}

fn lights_at(xs: &[f64]) -> MapIndex {
    MapIndex::new(xs.iter().map(|&x| TrafficLight::at(Point3::new(x, 0.0, 5.8))).collect())
}

fn snapshot(x: f64, path: &WaypointPath) -> Snapshot {
    Snapshot {
        pose: Some(Arc::new(Pose::new(Point3::new(x, 0.0, 0.0), Orientation::identity()))),
        path: Some(Arc::new(path.clone())),
    }
}

fn detector_with(map: MapIndex, classifier: Arc<dyn LightClassifier>, ready: bool) -> TrafficLightDetector {
    let handle = ClassifierHandle::new(classifier);
    if ready {
        handle.readiness().mark_ready();
    }
    TrafficLightDetector::new(
        DetectorConfig::default(),
        CameraConfig::default(),
        Arc::new(map),
        Arc::new(NoTransform),
        handle,
    )
}

fn frame(seq: u64) -> Frame {
    Frame::solid(seq, 8, 6, [0, 0, 0])
}

/// Run one pass per observation and collect the published wire values.
fn run(detector: &mut TrafficLightDetector, snap: &Snapshot, frames: usize) -> Vec<i64> {
    (0..frames)
        .map(|i| {
            detector
                .process(&frame(i as u64), snap)
                .expect("pass should not abort")
                .publish
                .to_wire()
        })
        .collect()
}

// ============================================================================
// Debounce through the full pass
// ============================================================================

#[test]
fn red_commits_after_three_frames_and_publishes_light_waypoint() {
    let path = straight_route(200);
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&[Red; 3]), true);

    let out = run(&mut d, &snapshot(10.0, &path), 3);

    assert_eq!(out, vec![-1, -1, 40], "stop published exactly at the 3rd RED");
    assert_eq!(d.committed_state(), Red);
}

#[test]
fn red_to_green_releases_exactly_at_third_green() {
    let path = straight_route(200);
    let script = [Red, Red, Red, Green, Green, Green];
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&script), true);

    let out = run(&mut d, &snapshot(10.0, &path), 6);

    assert_eq!(out, vec![-1, -1, 40, 40, 40, -1]);
}

#[test]
fn alternating_observations_never_change_the_output() {
    let path = straight_route(200);
    let script = [Red, Green, Red, Green, Red];
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&script), true);

    let out = run(&mut d, &snapshot(10.0, &path), 5);

    assert!(out.iter().all(|&v| v == -1), "flicker must not commit: {out:?}");
    assert_eq!(d.committed_state(), Unknown);
}

#[test]
fn flicker_during_red_keeps_the_stop() {
    let path = straight_route(200);
    let script = [Red, Red, Red, Green, Red, Yellow, Red];
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&script), true);

    let out = run(&mut d, &snapshot(10.0, &path), 7);

    assert_eq!(&out[2..], &[40, 40, 40, 40, 40]);
    assert_eq!(d.committed_state(), Red);
}

#[test]
fn yellow_commit_publishes_none() {
    let path = straight_route(200);
    let script = [Red, Red, Red, Yellow, Yellow, Yellow];
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&script), true);

    let out = run(&mut d, &snapshot(10.0, &path), 6);

    assert_eq!(out.last(), Some(&-1));
    assert_eq!(d.committed_state(), Yellow);
}

// ============================================================================
// Decision rule
// ============================================================================

#[test]
fn decide_is_idempotent_for_unchanged_inputs() {
    for state in [Red, Yellow, Green, Unknown] {
        let first = decide(state, Some(17));
        for _ in 0..10 {
            assert_eq!(decide(state, Some(17)), first);
        }
    }
}

#[test]
fn none_then_red_commit_yields_real_index() {
    let path = straight_route(200);
    // Vehicle past every light first, then a route with a light ahead
    let mut d = detector_with(lights_at(&[5.0]), ScriptedClassifier::new(&[Red; 3]), true);
    let passed = d.process(&frame(0), &snapshot(50.0, &path)).unwrap();
    assert_eq!(passed.publish, StopWaypoint::NONE);

    let out = run(&mut d, &snapshot(2.0, &path), 3);
    assert_eq!(out, vec![-1, -1, 5]);
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn empty_map_yields_no_light_ahead_and_minus_one() {
    let path = straight_route(50);
    let mut d = detector_with(MapIndex::default(), ScriptedClassifier::new(&[Red; 5]), true);

    let out = run(&mut d, &snapshot(10.0, &path), 5);

    assert!(out.iter().all(|&v| v == -1));
    assert_eq!(d.classifier().invocations(), 0);
}

#[test]
fn empty_path_is_missing_input_and_publishes_nothing() {
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&[Red; 3]), true);
    let snap = snapshot(10.0, &WaypointPath::default());

    let err = d.process(&frame(0), &snap).unwrap_err();

    assert!(matches!(err, DetectorError::MissingInput(RequiredInput::WaypointPath)));
    assert_eq!(d.current_decision().to_wire(), -1);
}

#[test]
fn missing_pose_then_inputs_arrive_recovers() {
    let path = straight_route(200);
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&[Red; 3]), true);
    let no_pose = Snapshot { pose: None, path: Some(Arc::new(path.clone())) };

    for i in 0..4 {
        assert!(d.process(&frame(i), &no_pose).is_err());
    }
    let out = run(&mut d, &snapshot(10.0, &path), 3);
    assert_eq!(out, vec![-1, -1, 40]);
}

// ============================================================================
// Readiness and lookahead
// ============================================================================

#[test]
fn classifier_not_ready_publishes_minus_one_without_invoking() {
    let path = straight_route(200);
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&[Red; 20]), false);

    let out = run(&mut d, &snapshot(10.0, &path), 10);

    assert_eq!(out, vec![-1; 10]);
    assert_eq!(d.classifier().invocations(), 0);
    // UNKNOWN was debounced and committed, never RED
    assert_eq!(d.committed_state(), Unknown);
}

#[test]
fn readiness_mid_stream_switches_to_classifier() {
    let path = straight_route(200);
    let mut d = detector_with(lights_at(&[40.0]), ScriptedClassifier::new(&[Red; 3]), false);
    let snap = snapshot(10.0, &path);

    run(&mut d, &snap, 4);
    d.classifier().readiness().mark_ready();
    let out = run(&mut d, &snap, 3);

    assert_eq!(out, vec![-1, -1, 40]);
    assert_eq!(d.classifier().invocations(), 3);
}

#[test]
fn light_beyond_lookahead_is_never_classified() {
    let path = straight_route(400);
    let mut d = detector_with(lights_at(&[200.0]), ScriptedClassifier::new(&[Red; 10]), true);

    let out = run(&mut d, &snapshot(10.0, &path), 10);

    assert!(out.iter().all(|&v| v == -1));
    assert_eq!(d.classifier().invocations(), 0);
}

#[test]
fn far_light_carries_committed_state_to_its_own_waypoint() {
    let path = straight_route(400);
    let mut d = detector_with(lights_at(&[40.0, 300.0]), ScriptedClassifier::new(&[Red; 3]), true);
    run(&mut d, &snapshot(10.0, &path), 3);
    assert_eq!(d.current_decision(), StopWaypoint::at(40));

    // Past the first light: next one is 250 waypoints away
    let report = d.process(&frame(9), &snapshot(50.0, &path)).unwrap();
    assert!(!report.classified);
    assert_eq!(report.publish, StopWaypoint::at(300));
}

#[test]
fn held_decision_never_points_behind_the_vehicle() {
    let path = straight_route(400);
    let mut d = detector_with(lights_at(&[40.0, 200.0]), ScriptedClassifier::new(&[Red; 3]), true);
    run(&mut d, &snapshot(10.0, &path), 3);

    let report = d.process(&frame(9), &snapshot(45.0, &path)).unwrap();
    let ahead = report.association.light().copied().expect("second light ahead");
    assert_eq!(ahead.light_index, 1);
    assert_eq!(report.publish, StopWaypoint::at(200));
    assert!(report.publish.index().is_some_and(|wp| wp >= ahead.vehicle_waypoint));
}

#[test]
fn settling_after_light_change_drops_old_waypoint() {
    let path = straight_route(400);
    let script = [Red, Red, Red, Green];
    let mut d = detector_with(lights_at(&[40.0, 90.0]), ScriptedClassifier::new(&script), true);
    run(&mut d, &snapshot(10.0, &path), 3);

    // Next light within lookahead; a single GREEN only settles
    let report = d.process(&frame(9), &snapshot(45.0, &path)).unwrap();
    assert_eq!(report.observation, Some(Green));
    assert_eq!(report.publish, StopWaypoint::at(90));
}

#[test]
fn closed_loop_ignores_light_just_passed() {
    let path = WaypointPath::looped((0..200).map(|i| Waypoint::new(i as f64, 0.0)).collect());
    let mut d = detector_with(lights_at(&[48.0, 80.0]), ScriptedClassifier::new(&[Red; 3]), true);

    let out = run(&mut d, &snapshot(50.0, &path), 3);

    assert_eq!(out, vec![-1, -1, 80]);
    assert_eq!(d.classifier().invocations(), 3);
}

#[test]
fn closed_loop_route_wraps_to_light_past_the_end() {
    // Square-ish loop of 20 waypoints along x; light near waypoint 2
    let path = WaypointPath::looped((0..20).map(|i| Waypoint::new(i as f64, 0.0)).collect());
    let mut d = detector_with(
        MapIndex::new(vec![TrafficLight::at(Point3::new(2.0, 0.0, 5.8))]),
        ScriptedClassifier::new(&[Red; 3]),
        true,
    );

    let report = d.process(&frame(0), &snapshot(18.0, &path)).unwrap();
    let ahead = report.association.light().copied().expect("light ahead after wrap");
    assert_eq!(ahead.light_waypoint_offset, 4);
    assert_eq!(ahead.stop_waypoint, 2);

    let out = run(&mut d, &snapshot(18.0, &path), 2);
    assert_eq!(out, vec![-1, 2]);
}

// ============================================================================
// Synthetic drive with the color classifier
// ============================================================================

#[test]
fn synthetic_drive_stops_only_at_light_waypoints() {
    let camera = CameraConfig::default();
    let sim = SimDrive::new(SimConfig { seed: Some(3), ..SimConfig::default() }, &camera);
    let map = MapIndex::from_config(&sim.map_config());
    let light_waypoints: Vec<usize> = map
        .lights()
        .iter()
        .filter_map(|l| sim.route().closest_index(&l.position))
        .collect();

    let handle = ClassifierHandle::new(Arc::new(ColorClassifier::new(&ClassifierConfig::default())));
    handle.readiness().mark_ready();
    let mut detector = TrafficLightDetector::new(
        DetectorConfig::default(),
        camera.clone(),
        Arc::new(map),
        Arc::new(PinholeProjector::new(&camera)),
        handle,
    );

    let store = SnapshotStore::new();
    let mut stops = Vec::new();
    for event in sim {
        match event {
            InputEvent::Pose(p) => store.set_pose(p),
            InputEvent::Waypoints(p) => store.set_path(p),
            InputEvent::Lights { lights } => store.set_ground_truth(lights),
            InputEvent::Frame(f) => {
                let report = detector.process(&f, &store.snapshot()).unwrap();
                if let Some(index) = report.publish.index() {
                    stops.push(index);
                }
            }
        }
    }

    assert!(!stops.is_empty(), "a red phase should have produced a stop");
    assert!(stops.iter().all(|s| light_waypoints.contains(s)), "stops {stops:?} vs lights {light_waypoints:?}");
}
