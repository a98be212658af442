//! Waypoint association: nearest upcoming traffic light
//!
//! Pure function of pose, route and map. "Ahead" is decided by route order
//! (the light's closest waypoint is at or after the vehicle's), so a light
//! the vehicle already passed is never selected even if it is still the
//! closest in straight-line distance. On a closed loop every light is
//! reachable by wrapping, so only lights within half a lap count as ahead.
//! Among lights ahead, the nearest by planar Euclidean distance wins.

use crate::error::{DetectorError, RequiredInput};
use crate::map_index::MapIndex;
use crate::types::{Pose, TrafficLight, WaypointPath};

/// Distances closer than this are treated as equal for tie-breaking (m).
const DISTANCE_TIE_EPSILON: f64 = 1e-9;

/// Outcome of a successful association.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Association {
    LightAhead(LightAhead),
    /// No light exists beyond the vehicle's position. Not an error.
    NoLightAhead,
}

impl Association {
    pub fn light(&self) -> Option<&LightAhead> {
        match self {
            Association::LightAhead(l) => Some(l),
            Association::NoLightAhead => None,
        }
    }
}

/// The nearest light ahead and where it sits on the route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightAhead {
    /// Position of the light in the map index
    pub light_index: usize,
    /// The map entry itself
    pub light: TrafficLight,
    /// Waypoint closest to the vehicle
    pub vehicle_waypoint: usize,
    /// Waypoints from the vehicle to the light's waypoint
    pub light_waypoint_offset: usize,
    /// Waypoint index to stop at (vehicle waypoint advanced by the offset)
    pub stop_waypoint: usize,
    /// Planar straight-line distance vehicle -> light (m)
    pub distance_m: f64,
}

/// Find the nearest upcoming traffic light.
///
/// # Errors
///
/// [`DetectorError::MissingInput`] when the pose has never arrived or the
/// path is absent or empty. An empty map is not an error; it yields
/// [`Association::NoLightAhead`].
pub fn associate(
    pose: Option<&Pose>,
    path: Option<&WaypointPath>,
    map: &MapIndex,
) -> Result<Association, DetectorError> {
    let pose = pose.ok_or(DetectorError::MissingInput(RequiredInput::Pose))?;
    let path = path
        .filter(|p| !p.is_empty())
        .ok_or(DetectorError::MissingInput(RequiredInput::WaypointPath))?;

    let vehicle_waypoint = path
        .closest_index(&pose.position)
        .ok_or(DetectorError::MissingInput(RequiredInput::WaypointPath))?;

    let mut best: Option<LightAhead> = None;
    for (light_index, light) in map.lights().iter().enumerate() {
        let Some(light_waypoint) = path.closest_index(&light.position) else {
            continue;
        };
        let Some(offset) = path.forward_offset(vehicle_waypoint, light_waypoint) else {
            continue; // behind the vehicle
        };
        if path.closed_loop && offset * 2 > path.len() {
            continue; // passed; reachable only by going round again
        }
        let distance_m = pose.position.planar_distance(&light.position);

        let candidate = LightAhead {
            light_index,
            light: *light,
            vehicle_waypoint,
            light_waypoint_offset: offset,
            stop_waypoint: path.advance(vehicle_waypoint, offset),
            distance_m,
        };
        if best.map_or(true, |b| is_better(&candidate, &b)) {
            best = Some(candidate);
        }
    }

    Ok(best.map_or(Association::NoLightAhead, Association::LightAhead))
}

/// Nearer wins; equidistant lights resolve to the one earlier along the
/// route, then to the lower map index.
fn is_better(candidate: &LightAhead, current: &LightAhead) -> bool {
    let delta = candidate.distance_m - current.distance_m;
    if delta.abs() > DISTANCE_TIE_EPSILON {
        return delta < 0.0;
    }
    (candidate.light_waypoint_offset, candidate.light_index)
        < (current.light_waypoint_offset, current.light_index)
}
