//! Static traffic light map
//!
//! Loaded once at startup from `[[map.lights]]`, read-only afterwards.

use crate::config::MapConfig;
use crate::types::TrafficLight;

/// Ordered collection of known traffic light positions.
///
/// There is no mutation API beyond construction; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct MapIndex {
    lights: Vec<TrafficLight>,
}

impl MapIndex {
    pub fn new(lights: Vec<TrafficLight>) -> Self {
        Self { lights }
    }

    pub fn from_config(map: &MapConfig) -> Self {
        let index = Self::new(map.lights.iter().map(|p| p.to_light()).collect());
        tracing::info!(lights = index.len(), "Traffic light map loaded");
        index
    }

    pub fn lights(&self) -> &[TrafficLight] {
        &self.lights
    }

    pub fn get(&self, index: usize) -> Option<&TrafficLight> {
        self.lights.get(index)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}
