//! Pixel-level helpers shared by the classifier, the overlap estimator and
//! the stitcher.

pub mod codec;
pub mod crop;
pub mod sampling;

pub use codec::{decode_screenshot, encode_png};
pub use crop::{crop_to_bounds, CropError};
