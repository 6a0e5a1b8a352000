use image::{imageops, imageops::FilterType, RgbaImage};

/// Byte stride over an RGBA buffer that visits every 4th pixel.
pub const PIXEL_SAMPLE_STRIDE: usize = 16;

/// Resizes to `width`x`height` with bilinear filtering; aspect ratio is not kept.
pub fn downsample(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width.max(1), height.max(1), FilterType::Triangle)
}

pub fn downsample_square(image: &RgbaImage, size: u32) -> RgbaImage {
    downsample(image, size, size)
}

/// Rec. 601 luma.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Mean squared RGB error between two RGBA buffers, summed over the three
/// channels of every 4th pixel.
///
/// Buffers of different length are not comparable and return infinity, as
/// does an empty buffer.
pub fn sampled_mse(lhs: &[u8], rhs: &[u8]) -> f64 {
    if lhs.len() != rhs.len() {
        return f64::INFINITY;
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for offset in (0..lhs.len().saturating_sub(3)).step_by(PIXEL_SAMPLE_STRIDE) {
        let diff: f64 = (0..3)
            .map(|channel| {
                let d = f64::from(lhs[offset + channel]) - f64::from(rhs[offset + channel]);
                d * d
            })
            .sum();
        sum += diff;
        count += 1;
    }

    if count == 0 {
        f64::INFINITY
    } else {
        sum / count as f64
    }
}
