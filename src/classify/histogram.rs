use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::imaging::sampling::downsample_square;

pub const HISTOGRAM_BINS: usize = 16;
const HISTOGRAM_SAMPLE_SIZE: u32 = 100;

/// Per-channel 16-bucket histograms of a 100x100 downsample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorHistogram {
    pub red: [u32; HISTOGRAM_BINS],
    pub green: [u32; HISTOGRAM_BINS],
    pub blue: [u32; HISTOGRAM_BINS],
}

impl ColorHistogram {
    pub fn compute(image: &RgbaImage) -> Self {
        let mut histogram = Self {
            red: [0; HISTOGRAM_BINS],
            green: [0; HISTOGRAM_BINS],
            blue: [0; HISTOGRAM_BINS],
        };
        if image.width() == 0 || image.height() == 0 {
            return histogram;
        }

        let sample = downsample_square(image, HISTOGRAM_SAMPLE_SIZE);
        for px in sample.pixels() {
            histogram.red[bin(px[0])] += 1;
            histogram.green[bin(px[1])] += 1;
            histogram.blue[bin(px[2])] += 1;
        }
        histogram
    }

    /// Mean Pearson correlation of the three channels, scaled to 0-100.
    /// Anti-correlated histograms go negative.
    pub fn similarity(&self, other: &Self) -> f64 {
        let red = correlation(&self.red, &other.red);
        let green = correlation(&self.green, &other.green);
        let blue = correlation(&self.blue, &other.blue);
        (red + green + blue) / 3.0 * 100.0
    }
}

fn bin(value: u8) -> usize {
    usize::from(value) * HISTOGRAM_BINS / 256
}

/// Pearson correlation; 0 when either side has no variance.
fn correlation(lhs: &[u32], rhs: &[u32]) -> f64 {
    let n = lhs.len() as f64;
    let mean_lhs = lhs.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let mean_rhs = rhs.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut var_lhs = 0.0;
    let mut var_rhs = 0.0;
    for (&a, &b) in lhs.iter().zip(rhs) {
        let da = f64::from(a) - mean_lhs;
        let db = f64::from(b) - mean_rhs;
        numerator += da * db;
        var_lhs += da * da;
        var_rhs += db * db;
    }

    let denominator = (var_lhs * var_rhs).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
