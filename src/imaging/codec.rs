use std::io::Cursor;

use image::{ImageFormat, ImageResult, RgbaImage};

/// Decodes a raw viewport screenshot (PNG or JPEG) into RGBA.
pub fn decode_screenshot(bytes: &[u8]) -> ImageResult<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

pub fn encode_png(image: &RgbaImage) -> ImageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
