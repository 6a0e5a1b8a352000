//! Overlap advice from the visual complexity of a kept segment.
//!
//! Busy segments (photos, cards, avatars) get a wider overlap margin than
//! plain text. The advice is logged and stored with the segment; the stitcher
//! always uses the run-level overlap chosen before capture starts.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::imaging::sampling::{downsample_square, luminance};

const EDGE_SAMPLE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    /// Luma difference to a neighbour that counts as an edge.
    pub edge_threshold: f64,
    /// Edge density above which content is complex.
    pub complex_density: f64,
    pub simple_overlap_px: u32,
    pub complex_overlap_px: u32,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 30.0,
            complex_density: 0.15,
            simple_overlap_px: 100,
            complex_overlap_px: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentComplexity {
    Simple,
    Complex,
}

impl ContentComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentComplexity::Simple => "simple",
            ContentComplexity::Complex => "complex",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapSuggestion {
    pub overlap_px: u32,
    pub complexity: ContentComplexity,
    pub edge_density: f64,
}

/// Share of pixels in a 100x100 downsample whose right or lower neighbour
/// differs in luma by more than `threshold`. Border pixels are never edges.
pub fn edge_density(image: &RgbaImage, threshold: f64) -> f64 {
    if image.width() == 0 || image.height() == 0 {
        return 0.0;
    }

    let sample = downsample_square(image, EDGE_SAMPLE_SIZE);
    let luma = |x: u32, y: u32| {
        let px = sample.get_pixel(x, y);
        luminance(px[0], px[1], px[2])
    };

    let mut edges = 0u32;
    for y in 1..EDGE_SAMPLE_SIZE - 1 {
        for x in 1..EDGE_SAMPLE_SIZE - 1 {
            let here = luma(x, y);
            let diff_x = (here - luma(x + 1, y)).abs();
            let diff_y = (here - luma(x, y + 1)).abs();
            if diff_x > threshold || diff_y > threshold {
                edges += 1;
            }
        }
    }

    f64::from(edges) / f64::from(EDGE_SAMPLE_SIZE * EDGE_SAMPLE_SIZE)
}

pub fn suggest_overlap(image: &RgbaImage, config: &OverlapConfig) -> OverlapSuggestion {
    let density = edge_density(image, config.edge_threshold);
    if density > config.complex_density {
        OverlapSuggestion {
            overlap_px: config.complex_overlap_px,
            complexity: ContentComplexity::Complex,
            edge_density: density,
        }
    } else {
        OverlapSuggestion {
            overlap_px: config.simple_overlap_px,
            complexity: ContentComplexity::Simple,
            edge_density: density,
        }
    }
}
