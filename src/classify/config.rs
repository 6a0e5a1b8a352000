use serde::{Deserialize, Serialize};

use super::SimilarityTest;

/// Thresholds and test order for blank/duplicate classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// A segment whose sampled near-white/transparent share exceeds this is blank.
    pub blank_ratio_threshold: f64,

    /// Duplicate tests, run in this order; the first positive wins.
    pub duplicate_tests: Vec<SimilarityTest>,

    /// Percentage of matching hash bits above which segments are duplicates.
    pub phash_similarity_threshold: f64,
    /// Overlap-band MSE below which segments are duplicates.
    pub overlap_mse_threshold: f64,
    /// 100x100 full-frame MSE below which segments are duplicates.
    pub frame_mse_threshold: f64,
    /// Histogram correlation (0-100) above which segments are duplicates.
    pub histogram_similarity_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            blank_ratio_threshold: 0.95,
            duplicate_tests: SimilarityTest::DEFAULT_ORDER.to_vec(),
            phash_similarity_threshold: 90.0,
            overlap_mse_threshold: 10.0,
            frame_mse_threshold: 50.0,
            histogram_similarity_threshold: 95.0,
        }
    }
}
