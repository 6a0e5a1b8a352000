//! Vertical compositing of kept segments with the overlap band removed.

use image::{imageops, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StitchError {
    #[error("no segments to stitch")]
    NoSegments,
    #[error(
        "overlap of {overlap_pixels}px leaves nothing of segment {index} ({height}px tall)"
    )]
    OverlapTooLarge {
        index: usize,
        height: u32,
        overlap_pixels: u32,
    },
}

/// Overlap band height in native pixels.
pub fn overlap_pixels(overlap_css: u32, device_pixel_ratio: f64) -> u32 {
    let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    (f64::from(overlap_css) * dpr).floor() as u32
}

/// Height of the stitched image: `h0 + sum(h_i - overlap)`.
pub fn stitched_height(heights: &[u32], overlap_pixels: u32) -> u32 {
    match heights.split_first() {
        Some((first, rest)) => rest
            .iter()
            .fold(*first, |total, h| total + h.saturating_sub(overlap_pixels)),
        None => 0,
    }
}

/// Stacks `segments` top to bottom, dropping the top `overlap` band of every
/// segment after the first.
///
/// Segments must already be in reading order. The widest segment sets the
/// canvas width and narrower ones leave transparent margins on the right.
/// A single segment is returned as is.
pub fn stitch(
    segments: Vec<RgbaImage>,
    overlap_css: u32,
    device_pixel_ratio: f64,
) -> Result<RgbaImage, StitchError> {
    let overlap = overlap_pixels(overlap_css, device_pixel_ratio);

    for (index, segment) in segments.iter().enumerate().skip(1) {
        if overlap >= segment.height() {
            return Err(StitchError::OverlapTooLarge {
                index,
                height: segment.height(),
                overlap_pixels: overlap,
            });
        }
    }

    let mut segments = segments.into_iter();
    let first = segments.next().ok_or(StitchError::NoSegments)?;
    let rest: Vec<RgbaImage> = segments.collect();
    if rest.is_empty() {
        return Ok(first);
    }

    let width = rest.iter().map(RgbaImage::width).fold(first.width(), u32::max);
    let heights: Vec<u32> = std::iter::once(first.height())
        .chain(rest.iter().map(RgbaImage::height))
        .collect();
    let height = stitched_height(&heights, overlap);

    let mut canvas = RgbaImage::new(width, height);
    imageops::replace(&mut canvas, &first, 0, 0);
    let mut cursor = i64::from(first.height());

    for segment in &rest {
        let visible_height = segment.height() - overlap;
        let visible = imageops::crop_imm(segment, 0, overlap, segment.width(), visible_height).to_image();
        imageops::replace(&mut canvas, &visible, 0, cursor);
        cursor += i64::from(visible_height);
    }

    Ok(canvas)
}
