//! Pose and route geometry

use serde::{Deserialize, Serialize};

/// 3D point in the world (map) frame, metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance in the route's planar (x, y) frame.
    pub fn planar_distance(&self, other: &Point3) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Unit quaternion orientation (x, y, z, w).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Orientation {
    pub const fn identity() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }

    /// Pure rotation about the vertical axis.
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw * 0.5;
        Self { x: 0.0, y: 0.0, z: half.sin(), w: half.cos() }
    }

    /// Heading angle about the vertical axis (radians).
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }

    /// Rotate a vector from the world frame into the body frame
    /// (applies the inverse rotation).
    pub fn world_to_body(&self, v: Point3) -> Point3 {
        let norm = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if norm < 1e-12 {
            return v;
        }
        // Conjugate of the normalized quaternion
        let (qx, qy, qz, qw) = (-self.x / norm, -self.y / norm, -self.z / norm, self.w / norm);

        // v' = v + 2w(q x v) + 2(q x (q x v))
        let (tx, ty, tz) = (
            2.0 * (qy * v.z - qz * v.y),
            2.0 * (qz * v.x - qx * v.z),
            2.0 * (qx * v.y - qy * v.x),
        );
        Point3 {
            x: v.x + qw * tx + (qy * tz - qz * ty),
            y: v.y + qw * ty + (qz * tx - qx * tz),
            z: v.z + qw * tz + (qx * ty - qy * tx),
        }
    }
}

/// Vehicle pose from localization. Superseded wholesale by each update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3,
    #[serde(default)]
    pub orientation: Orientation,
}

impl Pose {
    pub const fn new(position: Point3, orientation: Orientation) -> Self {
        Self { position, orientation }
    }

    /// Express a world point in the vehicle body frame
    /// (x forward, y left, z up).
    pub fn to_body(&self, world: &Point3) -> Point3 {
        let rel = Point3 {
            x: world.x - self.position.x,
            y: world.y - self.position.y,
            z: world.z - self.position.z,
        };
        self.orientation.world_to_body(rel)
    }
}

/// A single point along the planned route.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Point3,
}

impl Waypoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { position: Point3::new(x, y, 0.0) }
    }
}

/// Ordered planned route. Replaced wholesale when a new path arrives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WaypointPath {
    pub waypoints: Vec<Waypoint>,
    /// The route wraps from the last waypoint back to the first.
    #[serde(default)]
    pub closed_loop: bool,
}

impl WaypointPath {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints, closed_loop: false }
    }

    pub fn looped(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints, closed_loop: true }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Index of the waypoint closest to `point` in the planar frame.
    ///
    /// Linear scan; the first of several equidistant waypoints wins.
    /// Returns `None` for an empty path.
    pub fn closest_index(&self, point: &Point3) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, wp) in self.waypoints.iter().enumerate() {
            let d = wp.position.planar_distance(point);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Waypoint count from `from` to `to` following route order.
    ///
    /// On an open path a target behind `from` is not reachable (`None`);
    /// on a closed loop the count wraps around.
    pub fn forward_offset(&self, from: usize, to: usize) -> Option<usize> {
        if to >= from {
            Some(to - from)
        } else if self.closed_loop && !self.waypoints.is_empty() {
            Some(self.waypoints.len() - from + to)
        } else {
            None
        }
    }

    /// Waypoint index reached by advancing `offset` waypoints from `from`.
    pub fn advance(&self, from: usize, offset: usize) -> usize {
        let idx = from + offset;
        if self.closed_loop && !self.waypoints.is_empty() {
            idx % self.waypoints.len()
        } else {
            idx
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(n: usize) -> Vec<Waypoint> {
        (0..n).map(|i| Waypoint::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn closest_index_picks_nearest() {
        let path = WaypointPath::new(straight(20));
        assert_eq!(path.closest_index(&Point3::new(7.2, 0.5, 0.0)), Some(7));
        assert_eq!(path.closest_index(&Point3::new(-3.0, 0.0, 0.0)), Some(0));
    }

    #[test]
    fn closest_index_tie_goes_to_earlier_waypoint() {
        let path = WaypointPath::new(straight(4));
        assert_eq!(path.closest_index(&Point3::new(1.5, 0.0, 0.0)), Some(1));
    }

    #[test]
    fn closest_index_empty_path() {
        let path = WaypointPath::default();
        assert_eq!(path.closest_index(&Point3::default()), None);
    }

    #[test]
    fn forward_offset_open_and_closed() {
        let open = WaypointPath::new(straight(10));
        assert_eq!(open.forward_offset(2, 7), Some(5));
        assert_eq!(open.forward_offset(7, 2), None);

        let closed = WaypointPath::looped(straight(10));
        assert_eq!(closed.forward_offset(7, 2), Some(5));
        assert_eq!(closed.advance(7, 5), 2);
    }

    #[test]
    fn yaw_round_trips_through_quaternion() {
        let q = Orientation::from_yaw(1.2);
        assert!((q.yaw() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn to_body_rotates_into_heading() {
        // Vehicle at origin facing +y; a point 10 m along +y is straight ahead.
        let pose = Pose::new(Point3::default(), Orientation::from_yaw(std::f64::consts::FRAC_PI_2));
        let body = pose.to_body(&Point3::new(0.0, 10.0, 0.0));
        assert!((body.x - 10.0).abs() < 1e-9);
        assert!(body.y.abs() < 1e-9);
    }
}
