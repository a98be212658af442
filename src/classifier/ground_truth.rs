//! Ground-truth classifier (simulator only)
//!
//! Reads the light states the simulator publishes alongside the camera and
//! returns the state of the ground-truth light nearest the map light. Used
//! to debug association and debounce logic without a working vision model.

use std::sync::Arc;

use super::{ClassifierError, ClassifyRequest, LightClassifier};
use crate::pipeline::SnapshotStore;
use crate::types::LightState;

/// Ground-truth lights further than this from the map light are ignored (m)
const MATCH_RADIUS_M: f64 = 40.0;

#[derive(Debug, Clone)]
pub struct GroundTruthClassifier {
    store: Arc<SnapshotStore>,
}

impl GroundTruthClassifier {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }
}

impl LightClassifier for GroundTruthClassifier {
    fn name(&self) -> &str {
        "ground-truth"
    }

    fn classify(&self, request: &ClassifyRequest<'_>) -> Result<LightState, ClassifierError> {
        let Some(lights) = self.store.ground_truth() else {
            return Ok(LightState::Unknown);
        };

        let target = request.light.position;
        let nearest = lights
            .iter()
            .map(|l| (l.position.planar_distance(&target), l.state))
            .filter(|(d, _)| *d <= MATCH_RADIUS_M)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        Ok(nearest.map_or(LightState::Unknown, |(_, state)| state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Frame, Point3, TrafficLight};

    fn classify(store: &Arc<SnapshotStore>, at: Point3) -> LightState {
        let frame = Frame::solid(0, 1, 1, [0, 0, 0]);
        let light = TrafficLight::at(at);
        GroundTruthClassifier::new(Arc::clone(store))
            .classify(&ClassifyRequest { image: &frame, light: &light, light_index: 0, cropped: false })
            .unwrap()
    }

    #[test]
    fn no_ground_truth_is_unknown() {
        let store = Arc::new(SnapshotStore::new());
        assert_eq!(classify(&store, Point3::new(0.0, 0.0, 0.0)), LightState::Unknown);
    }

    #[test]
    fn picks_nearest_ground_truth_light() {
        let store = Arc::new(SnapshotStore::new());
        store.set_ground_truth(vec![
            TrafficLight { position: Point3::new(100.0, 0.0, 0.0), state: LightState::Green },
            TrafficLight { position: Point3::new(3.0, 4.0, 0.0), state: LightState::Red },
        ]);
        assert_eq!(classify(&store, Point3::new(0.0, 0.0, 0.0)), LightState::Red);
        assert_eq!(classify(&store, Point3::new(95.0, 0.0, 0.0)), LightState::Green);
        assert_eq!(classify(&store, Point3::new(50.0, 300.0, 0.0)), LightState::Unknown);
    }
}
