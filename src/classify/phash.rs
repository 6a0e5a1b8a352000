use image::{DynamicImage, RgbaImage};
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};

use crate::imaging::sampling::downsample;

const HASH_SIDE: u32 = 8;
// Shrinking before hashing keeps the hasher's Lanczos pass cheap on tall segments.
const PREFILTER_SIDE: u32 = 64;

/// 64-bit average hash: 8x8 grayscale cells thresholded against their mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub const BITS: u32 = HASH_SIDE * HASH_SIDE;

    pub fn compute(image: &RgbaImage) -> Self {
        let small = downsample(
            image,
            image.width().min(PREFILTER_SIDE),
            image.height().min(PREFILTER_SIDE),
        );
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .hash_size(HASH_SIDE, HASH_SIDE)
            .to_hasher();

        let hash = hasher.hash_image(&DynamicImage::ImageRgba8(small));

        let mut bytes = [0u8; 8];
        for (slot, byte) in bytes.iter_mut().zip(hash.as_bytes()) {
            *slot = *byte;
        }
        Self(u64::from_be_bytes(bytes))
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn hamming_distance(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Percentage (0-100) of bits that agree.
    pub fn similarity(&self, other: &Self) -> f64 {
        let matching = Self::BITS - self.hamming_distance(other);
        f64::from(matching) / f64::from(Self::BITS) * 100.0
    }

    /// The hash as a 64-character string of `0`/`1`, most significant bit first.
    pub fn to_bit_string(&self) -> String {
        format!("{:064b}", self.0)
    }

    pub fn from_bit_string(value: &str) -> Option<Self> {
        if value.len() != Self::BITS as usize {
            return None;
        }
        u64::from_str_radix(value, 2).ok().map(Self)
    }
}
