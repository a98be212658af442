//! Synthetic closed-loop drive
//!
//! Generates the input stream a simulator would publish: one waypoint path
//! (a circle), then per frame a pose, the ground-truth light array and a
//! camera frame with the nearest light ahead painted where the pinhole
//! camera sees it. Light colors cycle RED -> GREEN -> YELLOW, each light
//! phase-shifted, with optional per-frame flicker noise.

use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_2, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::defaults::{LIGHT_HEAD_HEIGHT_M, SIM_FRAME_HEIGHT, SIM_FRAME_WIDTH};
use crate::config::{CameraConfig, LightPosition, MapConfig};
use crate::pipeline::source::InputEvent;
use crate::projection::PinholeProjector;
use crate::types::{Frame, LightState, Orientation, PixelRect, Point3, Pose, TrafficLight, Waypoint, WaypointPath};

/// Lights are placed this far outside the driven circle (m)
const LIGHT_SETBACK_M: f64 = 4.0;
/// Lights further than this are not painted (m)
const MAX_VISIBLE_M: f64 = 150.0;
const BACKGROUND: [u8; 3] = [20, 20, 24];
/// Lamp size as a share of frame width / height
const LAMP_FRACTION: (f64, f64) = (0.125, 0.2);

const PHASES: [LightState; 3] = [LightState::Red, LightState::Green, LightState::Yellow];

/// Parameters of the synthetic drive.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub waypoints: usize,
    pub radius_m: f64,
    pub lights: usize,
    /// Waypoints advanced per frame
    pub waypoints_per_frame: usize,
    /// Frames each color phase lasts
    pub phase_frames: u64,
    /// Probability that a frame shows a random color instead of the true one
    pub flicker: f64,
    pub laps: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            waypoints: 400,
            radius_m: 100.0,
            lights: 4,
            waypoints_per_frame: 1,
            phase_frames: 40,
            flicker: 0.0,
            laps: 1,
            frame_width: SIM_FRAME_WIDTH,
            frame_height: SIM_FRAME_HEIGHT,
            seed: None,
        }
    }
}

/// Iterator over the drive's [`InputEvent`]s.
pub struct SimDrive {
    config: SimConfig,
    projector: PinholeProjector,
    camera_size: (u32, u32),
    route: WaypointPath,
    lights: Vec<Point3>,
    rng: StdRng,
    frame: u64,
    total_frames: u64,
    pending: VecDeque<InputEvent>,
}

impl SimDrive {
    pub fn new(config: SimConfig, camera: &CameraConfig) -> Self {
        let n = config.waypoints.max(3);
        let route = WaypointPath::looped(
            (0..n)
                .map(|i| {
                    let theta = TAU * i as f64 / n as f64;
                    Waypoint::new(config.radius_m * theta.cos(), config.radius_m * theta.sin())
                })
                .collect(),
        );

        let count = config.lights.min(n);
        let lights = (0..count)
            .map(|j| {
                let index = j * n / count.max(1) + n / (2 * count.max(1));
                let theta = TAU * index as f64 / n as f64;
                let r = config.radius_m + LIGHT_SETBACK_M;
                Point3::new(r * theta.cos(), r * theta.sin(), LIGHT_HEAD_HEIGHT_M)
            })
            .collect();

        let rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let step = config.waypoints_per_frame.max(1) as u64;
        let total_frames = u64::from(config.laps) * n as u64 / step;
        let projector = PinholeProjector::new(camera);

        let mut pending = VecDeque::new();
        pending.push_back(InputEvent::Waypoints(route.clone()));

        Self {
            camera_size: projector.image_size(),
            projector,
            route,
            lights,
            rng,
            frame: 0,
            total_frames,
            pending,
            config,
        }
    }

    pub fn route(&self) -> &WaypointPath {
        &self.route
    }

    /// The light map matching this drive, for `[[map.lights]]`.
    pub fn map_config(&self) -> MapConfig {
        MapConfig {
            lights: self
                .lights
                .iter()
                .map(|p| LightPosition { x: p.x, y: p.y, z: p.z })
                .collect(),
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// True color of `light` at `frame`.
    pub fn light_state(&self, frame: u64, light: usize) -> LightState {
        let phase = frame / self.config.phase_frames.max(1) + light as u64;
        PHASES[(phase % PHASES.len() as u64) as usize]
    }

    fn pose_at(&self, frame: u64) -> Pose {
        let n = self.route.len();
        let index = (frame as usize * self.config.waypoints_per_frame.max(1)) % n;
        let theta = TAU * index as f64 / n as f64;
        let position = self.route.waypoints[index].position;
        Pose::new(position, Orientation::from_yaw(theta + FRAC_PI_2))
    }

    fn render(&mut self, frame: u64, pose: &Pose) -> Frame {
        let (w, h) = (self.config.frame_width, self.config.frame_height);
        let mut image = Frame::solid(frame, w, h, BACKGROUND);

        let visible = self
            .lights
            .iter()
            .enumerate()
            .filter_map(|(j, p)| {
                let distance = pose.position.planar_distance(p);
                let point = self.projector.project_unbounded(p, pose).ok()?;
                (distance <= MAX_VISIBLE_M).then_some((j, distance, point))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((light, _, point)) = visible else {
            return image;
        };

        let mut state = self.light_state(frame, light);
        if self.config.flicker > 0.0 && self.rng.gen_bool(self.config.flicker.clamp(0.0, 1.0)) {
            state = [LightState::Red, LightState::Yellow, LightState::Green, LightState::Unknown]
                [self.rng.gen_range(0..4)];
        }
        let Some(rgb) = lamp_color(state) else {
            return image;
        };

        let sx = f64::from(w) / f64::from(self.camera_size.0.max(1));
        let sy = f64::from(h) / f64::from(self.camera_size.1.max(1));
        let lamp_w = ((f64::from(w) * LAMP_FRACTION.0).round() as u32).max(1);
        let lamp_h = ((f64::from(h) * LAMP_FRACTION.1).round() as u32).max(1);
        let cx = (point.x * sx).clamp(0.0, f64::from(w));
        let cy = (point.y * sy).clamp(0.0, f64::from(h));
        if let Some(rect) = PixelRect::centered(cx, cy, lamp_w, lamp_h, w, h) {
            image.fill_rect(&rect, rgb);
        }
        image
    }

    fn ground_truth(&self, frame: u64) -> Vec<TrafficLight> {
        self.lights
            .iter()
            .enumerate()
            .map(|(j, p)| TrafficLight {
                position: *p,
                state: self.light_state(frame, j),
            })
            .collect()
    }
}

fn lamp_color(state: LightState) -> Option<[u8; 3]> {
    match state {
        LightState::Red => Some([255, 30, 30]),
        LightState::Yellow => Some([255, 200, 0]),
        LightState::Green => Some([0, 255, 80]),
        LightState::Unknown => None,
    }
}

impl Iterator for SimDrive {
    type Item = InputEvent;

    fn next(&mut self) -> Option<InputEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        if self.frame >= self.total_frames {
            return None;
        }

        let frame = self.frame;
        self.frame += 1;
        let pose = self.pose_at(frame);
        let image = self.render(frame, &pose);
        self.pending.push_back(InputEvent::Lights { lights: self.ground_truth(frame) });
        self.pending.push_back(InputEvent::Frame(image));
        Some(InputEvent::Pose(pose))
    }
}
