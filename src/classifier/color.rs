//! HSV lamp-color classifier
//!
//! Counts bright, saturated pixels per lamp hue and returns the winning
//! color when it covers enough of the image. Lit lamps are the brightest
//! saturated blobs in a crop around a signal head, so a plain vote is
//! enough for simulator imagery.

use tracing::trace;

use super::{ClassifierError, ClassifyRequest, LightClassifier};
use crate::config::ClassifierConfig;
use crate::types::{Frame, LightState};

/// Minimum saturation (0-100) for a pixel to count as lamp light
const MIN_SATURATION: f32 = 40.0;

/// Above this many pixels, every other row and column is sampled
const FULL_SCAN_LIMIT: usize = 40_000;

/// Convert RGB to HSV.
/// Returns (H: 0-360, S: 0-100, V: 0-255).
#[inline]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta < 1e-6 {
        0.0
    } else if (max - r).abs() < 1e-6 {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() < 1e-6 {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max < 1e-6 { 0.0 } else { (delta / max) * 100.0 };

    (h, s, max * 255.0)
}

fn lamp_hue(hue: f32) -> Option<LightState> {
    match hue {
        h if !(15.0..340.0).contains(&h) => Some(LightState::Red),
        h if h < 70.0 => Some(LightState::Yellow),
        h if (80.0..=180.0).contains(&h) => Some(LightState::Green),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Votes {
    red: u32,
    yellow: u32,
    green: u32,
    sampled: u32,
}

impl Votes {
    fn add(&mut self, state: LightState) {
        match state {
            LightState::Red => self.red += 1,
            LightState::Yellow => self.yellow += 1,
            LightState::Green => self.green += 1,
            LightState::Unknown => {}
        }
    }

    /// Highest vote; ties resolve toward the more restrictive color.
    fn winner(&self) -> (LightState, u32) {
        [
            (LightState::Red, self.red),
            (LightState::Yellow, self.yellow),
            (LightState::Green, self.green),
        ]
        .into_iter()
        .fold((LightState::Unknown, 0), |best, cand| if cand.1 > best.1 { cand } else { best })
    }
}

/// Lamp-color vote over the request image.
#[derive(Debug, Clone)]
pub struct ColorClassifier {
    min_value: f32,
    min_pixel_fraction: f64,
}

impl ColorClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            min_value: config.min_value as f32,
            min_pixel_fraction: config.min_pixel_fraction,
        }
    }

    fn tally(&self, image: &Frame) -> Votes {
        let pixels = image.width as usize * image.height as usize;
        let step = if pixels > FULL_SCAN_LIMIT { 2 } else { 1 };

        let mut votes = Votes::default();
        for y in (0..image.height).step_by(step) {
            for x in (0..image.width).step_by(step) {
                let Some([r, g, b]) = image.pixel(x, y) else {
                    continue;
                };
                votes.sampled += 1;
                let (h, s, v) = rgb_to_hsv(r, g, b);
                if v < self.min_value || s < MIN_SATURATION {
                    continue;
                }
                if let Some(state) = lamp_hue(h) {
                    votes.add(state);
                }
            }
        }
        votes
    }
}

impl LightClassifier for ColorClassifier {
    fn name(&self) -> &str {
        "hsv-color"
    }

    fn classify(&self, request: &ClassifyRequest<'_>) -> Result<LightState, ClassifierError> {
        let image = request.image;
        if !image.is_well_formed() {
            return Err(ClassifierError::BadImage(format!(
                "{}x{} frame with {} bytes",
                image.width,
                image.height,
                image.data.len()
            )));
        }

        let votes = self.tally(image);
        if votes.sampled == 0 {
            return Ok(LightState::Unknown);
        }

        let (state, count) = votes.winner();
        let fraction = f64::from(count) / f64::from(votes.sampled);
        trace!(
            light = request.light_index,
            cropped = request.cropped,
            red = votes.red,
            yellow = votes.yellow,
            green = votes.green,
            sampled = votes.sampled,
            "Color vote"
        );

        if fraction >= self.min_pixel_fraction {
            Ok(state)
        } else {
            Ok(LightState::Unknown)
        }
    }
}
