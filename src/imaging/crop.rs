use image::{imageops, RgbaImage};
use thiserror::Error;

use crate::models::CaptureBounds;

#[derive(Debug, Error, PartialEq)]
pub enum CropError {
    #[error("crop bounds scale to an empty {width}x{height} px region")]
    EmptyBounds { width: u32, height: u32 },
}

/// Copies the DPR-scaled `bounds` out of a full viewport screenshot.
///
/// The result is exactly the scaled size. Pixels of the region that fall
/// outside the screenshot stay transparent; nothing is resampled.
pub fn crop_to_bounds(source: &RgbaImage, bounds: &CaptureBounds) -> Result<RgbaImage, CropError> {
    let (x, y, width, height) = bounds.scaled();
    if width == 0 || height == 0 {
        return Err(CropError::EmptyBounds { width, height });
    }

    let mut output = RgbaImage::new(width, height);

    let left = x.max(0);
    let top = y.max(0);
    let right = (x + i64::from(width)).min(i64::from(source.width()));
    let bottom = (y + i64::from(height)).min(i64::from(source.height()));

    if right > left && bottom > top {
        let visible = imageops::crop_imm(
            source,
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
        .to_image();
        imageops::replace(&mut output, &visible, left - x, top - y);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::gradient_image;
    use image::Rgba;

    #[test]
    fn crop_copies_scaled_region_exactly() {
        let source = gradient_image(400, 300);
        let bounds = CaptureBounds::new(10.0, 20.0, 50.0, 40.0, 2.0);

        let cropped = crop_to_bounds(&source, &bounds).expect("crop");

        assert_eq!(cropped.dimensions(), (100, 80));
        assert_eq!(cropped.get_pixel(0, 0), source.get_pixel(20, 40));
        assert_eq!(cropped.get_pixel(99, 79), source.get_pixel(119, 119));
    }

    #[test]
    fn crop_is_idempotent() {
        let source = gradient_image(320, 240);
        let bounds = CaptureBounds::new(12.5, 7.0, 100.0, 80.0, 1.5);

        let first = crop_to_bounds(&source, &bounds).expect("crop");
        let second = crop_to_bounds(&source, &bounds).expect("crop");
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn region_past_the_edge_is_transparent() {
        let source = RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255]));
        let bounds = CaptureBounds::new(80.0, 90.0, 40.0, 20.0, 1.0);

        let cropped = crop_to_bounds(&source, &bounds).expect("crop");

        assert_eq!(cropped.dimensions(), (40, 20));
        assert_eq!(*cropped.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*cropped.get_pixel(25, 5), Rgba([0, 0, 0, 0]));
        assert_eq!(*cropped.get_pixel(5, 15), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn empty_bounds_are_rejected() {
        let source = gradient_image(50, 50);
        let bounds = CaptureBounds::new(0.0, 0.0, 0.4, 30.0, 1.0);
        assert_eq!(
            crop_to_bounds(&source, &bounds),
            Err(CropError::EmptyBounds {
                width: 0,
                height: 30
            })
        );
    }
}
