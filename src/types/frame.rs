//! Camera frame types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RGB8 camera image with capture metadata.
///
/// Pixels are row-major, 3 bytes per pixel. On the JSON wire the pixel
/// buffer travels as a base64 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub seq: u64,
    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(seq: u64, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            seq,
            captured_at: Utc::now(),
            width,
            height,
            data,
        }
    }

    /// Uniformly colored frame.
    pub fn solid(seq: u64, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self::new(seq, width, height, data)
    }

    /// Buffer length matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 3
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data.get(idx..idx + 3).map(|p| [p[0], p[1], p[2]])
    }

    /// Paint a rectangle (clamped to the frame) with a solid color.
    pub fn fill_rect(&mut self, rect: &PixelRect, rgb: [u8; 3]) {
        let x_end = (rect.x + rect.width).min(self.width);
        let y_end = (rect.y + rect.height).min(self.height);
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                let idx = (y as usize * self.width as usize + x as usize) * 3;
                if let Some(p) = self.data.get_mut(idx..idx + 3) {
                    p.copy_from_slice(&rgb);
                }
            }
        }
    }

    /// Copy out a sub-image. The rectangle must lie inside the frame
    /// (see [`PixelRect::centered`]); out-of-range rows are skipped.
    pub fn crop(&self, rect: &PixelRect) -> Frame {
        let mut data = Vec::with_capacity(rect.width as usize * rect.height as usize * 3);
        for y in rect.y..(rect.y + rect.height).min(self.height) {
            let start = (y as usize * self.width as usize + rect.x as usize) * 3;
            let end = start + rect.width as usize * 3;
            if let Some(row) = self.data.get(start..end) {
                data.extend_from_slice(row);
            }
        }
        let height = if rect.width == 0 {
            0
        } else {
            (data.len() / (rect.width as usize * 3)) as u32
        };
        Frame {
            seq: self.seq,
            captured_at: self.captured_at,
            width: rect.width,
            height,
            data,
        }
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Rectangle of the requested size centered on `(cx, cy)`, shifted and
    /// shrunk as needed to stay inside a `frame_width` x `frame_height` image.
    pub fn centered(
        cx: f64,
        cy: f64,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Self> {
        if frame_width == 0 || frame_height == 0 || !cx.is_finite() || !cy.is_finite() {
            return None;
        }
        let width = width.min(frame_width);
        let height = height.min(frame_height);
        let max_x = f64::from(frame_width - width);
        let max_y = f64::from(frame_height - height);
        let x = (cx - f64::from(width) / 2.0).clamp(0.0, max_x) as u32;
        let y = (cy - f64::from(height) / 2.0).clamp(0.0, max_y) as u32;
        Some(Self { x, y, width, height })
    }
}

/// Serde adapter: `Vec<u8>` <-> standard base64 string.
mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_frame_is_well_formed() {
        let f = Frame::solid(1, 4, 3, [10, 20, 30]);
        assert!(f.is_well_formed());
        assert_eq!(f.pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(f.pixel(4, 0), None);
    }

    #[test]
    fn crop_extracts_painted_region() {
        let mut f = Frame::solid(7, 10, 10, [0, 0, 0]);
        let rect = PixelRect { x: 2, y: 3, width: 4, height: 2 };
        f.fill_rect(&rect, [255, 0, 0]);
        let c = f.crop(&rect);
        assert_eq!((c.width, c.height, c.seq), (4, 2, 7));
        assert!(c.is_well_formed());
        assert!(c.data.chunks(3).all(|p| p == [255, 0, 0]));
    }

    #[test]
    fn centered_rect_is_clamped_inside_frame() {
        let r = PixelRect::centered(1.0, 598.0, 96, 192, 800, 600).unwrap();
        assert_eq!(r, PixelRect { x: 0, y: 408, width: 96, height: 192 });

        let big = PixelRect::centered(5.0, 5.0, 50, 50, 20, 10).unwrap();
        assert_eq!(big, PixelRect { x: 0, y: 0, width: 20, height: 10 });

        assert!(PixelRect::centered(f64::NAN, 0.0, 4, 4, 10, 10).is_none());
    }

    #[test]
    fn json_wire_uses_base64_pixels() {
        let f = Frame::solid(3, 1, 1, [1, 2, 3]);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["data"], "AQID");
        let back: Frame = serde_json::from_value(json).unwrap();
        assert_eq!(back.data, vec![1, 2, 3]);
    }
}
