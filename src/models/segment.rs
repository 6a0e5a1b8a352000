use serde::{Deserialize, Serialize};

/// Region of the visible viewport to keep from a screenshot, in CSS pixels.
///
/// Screenshots are taken at native density, so every coordinate is scaled by
/// `device_pixel_ratio` before pixels are copied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

impl CaptureBounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Ratio used for scaling; non-positive or non-finite ratios count as 1.
    pub fn dpr(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// Bounds in native pixels: `(x, y, width, height)`.
    pub fn scaled(&self) -> (i64, i64, u32, u32) {
        let dpr = self.dpr();
        let x = (self.x * dpr).floor() as i64;
        let y = (self.y * dpr).floor() as i64;
        let width = (self.width * dpr).floor().max(0.0) as u32;
        let height = (self.height * dpr).floor().max(0.0) as u32;
        (x, y, width, height)
    }
}

/// One planned viewport slice of a rolling capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub scroll_position: i64,
    pub bounds: CaptureBounds,
}

impl Segment {
    pub fn new(scroll_position: i64, bounds: CaptureBounds) -> Self {
        Self {
            scroll_position,
            bounds,
        }
    }
}
