use image::RgbaImage;

use crate::imaging::sampling::{downsample_square, PIXEL_SAMPLE_STRIDE};

const BLANK_SAMPLE_SIZE: u32 = 200;
const NEAR_WHITE: u8 = 250;
const NEAR_TRANSPARENT: u8 = 10;

/// Share of sampled pixels that are near-white or near-transparent.
///
/// The image is squashed to a square of `min(width, height, 200)` first.
/// An image with no pixels counts as fully blank.
pub fn blank_ratio(image: &RgbaImage) -> f64 {
    let size = image.width().min(image.height()).min(BLANK_SAMPLE_SIZE);
    if size == 0 {
        return 1.0;
    }

    let sample = downsample_square(image, size);
    let pixels = sample.as_raw();

    let mut blank = 0usize;
    let mut sampled = 0usize;
    for px in pixels.chunks_exact(4).step_by(PIXEL_SAMPLE_STRIDE / 4) {
        let near_white = px[0] > NEAR_WHITE && px[1] > NEAR_WHITE && px[2] > NEAR_WHITE;
        if near_white || px[3] < NEAR_TRANSPARENT {
            blank += 1;
        }
        sampled += 1;
    }

    blank as f64 / sampled as f64
}
