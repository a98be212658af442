//! World-to-image projection of traffic lights
//!
//! The detector only needs `Project(worldPoint, pose) -> imagePoint` to pick
//! a crop around the light. Any failure degrades the pass, never aborts it.

use thiserror::Error;

use crate::config::CameraConfig;
use crate::types::{Point3, Pose};

/// Projected pixel coordinate (may be fractional).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("No camera transform available")]
    Unavailable,

    #[error("Point is behind the camera (forward distance {0:.2} m)")]
    BehindCamera(f64),

    #[error("Point projects outside the image at ({x:.1}, {y:.1})")]
    OutOfFrame { x: f64, y: f64 },
}

/// World -> image mapping for the current pose.
pub trait TransformProjector: Send + Sync {
    fn project(&self, world: &Point3, pose: &Pose) -> Result<ImagePoint, ProjectionError>;
}

/// Forward-looking pinhole camera mounted at the pose origin.
///
/// Body frame is x forward, y left, z up; the image origin is top-left.
#[derive(Debug, Clone)]
pub struct PinholeProjector {
    fx: f64,
    fy: f64,
    width: u32,
    height: u32,
    mounting_height_m: f64,
}

impl PinholeProjector {
    pub fn new(camera: &CameraConfig) -> Self {
        Self {
            fx: camera.focal_length_x,
            fy: camera.focal_length_y,
            width: camera.image_width,
            height: camera.image_height,
            mounting_height_m: camera.mounting_height_m,
        }
    }
}

impl PinholeProjector {
    /// Image coordinate of a point in front of the camera, without the
    /// image bounds check.
    pub fn project_unbounded(&self, world: &Point3, pose: &Pose) -> Result<ImagePoint, ProjectionError> {
        if !pose.position.is_finite() || !world.is_finite() {
            return Err(ProjectionError::Unavailable);
        }

        let mut body = pose.to_body(world);
        body.z -= self.mounting_height_m;
        if body.x <= f64::EPSILON {
            return Err(ProjectionError::BehindCamera(body.x));
        }

        let cx = f64::from(self.width) / 2.0;
        let cy = f64::from(self.height) / 2.0;
        Ok(ImagePoint {
            x: cx - self.fx * body.y / body.x,
            y: cy - self.fy * body.z / body.x,
        })
    }

    pub const fn image_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl TransformProjector for PinholeProjector {
    fn project(&self, world: &Point3, pose: &Pose) -> Result<ImagePoint, ProjectionError> {
        let ImagePoint { x, y } = self.project_unbounded(world, pose)?;
        if x < 0.0 || y < 0.0 || x >= f64::from(self.width) || y >= f64::from(self.height) {
            return Err(ProjectionError::OutOfFrame { x, y });
        }
        Ok(ImagePoint { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Orientation;

    fn camera() -> CameraConfig {
        CameraConfig {
            focal_length_x: 100.0,
            focal_length_y: 100.0,
            image_width: 200,
            image_height: 100,
            mounting_height_m: 1.0,
            ..CameraConfig::default()
        }
    }

    #[test]
    fn point_straight_ahead_hits_image_center() {
        let p = PinholeProjector::new(&camera());
        let pose = Pose::new(Point3::default(), Orientation::identity());
        let ip = p.project(&Point3::new(50.0, 0.0, 1.0), &pose).unwrap();
        assert!((ip.x - 100.0).abs() < 1e-9);
        assert!((ip.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn left_and_up_move_toward_top_left() {
        let p = PinholeProjector::new(&camera());
        let pose = Pose::new(Point3::default(), Orientation::identity());
        let ip = p.project(&Point3::new(50.0, 10.0, 11.0), &pose).unwrap();
        assert!((ip.x - 80.0).abs() < 1e-9);
        assert!((ip.y - 30.0).abs() < 1e-9);
    }

    #[test]
    fn heading_is_respected() {
        let p = PinholeProjector::new(&camera());
        // Facing +y: a light along +y is ahead, along -y is behind
        let pose = Pose::new(Point3::default(), Orientation::from_yaw(std::f64::consts::FRAC_PI_2));
        assert!(p.project(&Point3::new(0.0, 50.0, 1.0), &pose).is_ok());
        assert!(matches!(
            p.project(&Point3::new(0.0, -50.0, 1.0), &pose),
            Err(ProjectionError::BehindCamera(_))
        ));
    }

    #[test]
    fn behind_and_out_of_frame_fail() {
        let p = PinholeProjector::new(&camera());
        let pose = Pose::new(Point3::default(), Orientation::identity());
        assert!(matches!(
            p.project(&Point3::new(-5.0, 0.0, 1.0), &pose),
            Err(ProjectionError::BehindCamera(_))
        ));
        assert!(matches!(
            p.project(&Point3::new(5.0, 20.0, 1.0), &pose),
            Err(ProjectionError::OutOfFrame { .. })
        ));
    }

    #[test]
    fn non_finite_pose_is_unavailable() {
        let p = PinholeProjector::new(&camera());
        let pose = Pose::new(Point3::new(f64::NAN, 0.0, 0.0), Orientation::identity());
        assert_eq!(
            p.project(&Point3::new(5.0, 0.0, 1.0), &pose),
            Err(ProjectionError::Unavailable)
        );
    }
}
