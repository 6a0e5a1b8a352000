//! Blank and duplicate detection for rolling-capture segments.
//!
//! A segment first goes through the blank test, which needs no history.
//! Surviving segments are compared against the last kept segment by an
//! ordered list of named [`SimilarityTest`]s; the first test that reports a
//! duplicate decides the verdict and the rest are not run.

pub mod blank;
pub mod config;
pub mod histogram;
pub mod phash;

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::imaging::sampling::{downsample_square, sampled_mse};

pub use blank::blank_ratio;
pub use config::ClassifierConfig;
pub use histogram::ColorHistogram;
pub use phash::PerceptualHash;

const FRAME_SAMPLE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityTest {
    PerceptualHash,
    OverlapMse,
    FullFrameMse,
    HistogramCorrelation,
}

impl SimilarityTest {
    pub const DEFAULT_ORDER: [SimilarityTest; 4] = [
        SimilarityTest::PerceptualHash,
        SimilarityTest::OverlapMse,
        SimilarityTest::FullFrameMse,
        SimilarityTest::HistogramCorrelation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityTest::PerceptualHash => "phash",
            SimilarityTest::OverlapMse => "overlap_mse",
            SimilarityTest::FullFrameMse => "frame_mse",
            SimilarityTest::HistogramCorrelation => "histogram",
        }
    }

    /// Runs this test on one pair of segments.
    pub fn evaluate(
        &self,
        previous: &SegmentView<'_>,
        current: &SegmentView<'_>,
        overlap_pixels: u32,
        config: &ClassifierConfig,
    ) -> TestOutcome {
        match self {
            SimilarityTest::PerceptualHash => {
                let score = previous.perceptual_hash.similarity(&current.perceptual_hash);
                let threshold = config.phash_similarity_threshold;
                TestOutcome::new(*self, score, threshold, score > threshold)
            }
            SimilarityTest::OverlapMse => {
                let threshold = config.overlap_mse_threshold;
                match overlap_band_mse(previous.image, current.image, overlap_pixels) {
                    Some(score) => TestOutcome::new(*self, score, threshold, score < threshold),
                    None => TestOutcome::skipped(*self, threshold),
                }
            }
            SimilarityTest::FullFrameMse => {
                let score = full_frame_mse(previous.image, current.image);
                let threshold = config.frame_mse_threshold;
                TestOutcome::new(*self, score, threshold, score < threshold)
            }
            SimilarityTest::HistogramCorrelation => {
                let score = previous.color_histogram.similarity(current.color_histogram);
                let threshold = config.histogram_similarity_threshold;
                TestOutcome::new(*self, score, threshold, score > threshold)
            }
        }
    }
}

/// A segment image together with its precomputed fingerprints.
#[derive(Debug, Clone, Copy)]
pub struct SegmentView<'a> {
    pub image: &'a RgbaImage,
    pub perceptual_hash: PerceptualHash,
    pub color_histogram: &'a ColorHistogram,
}

/// Score of one similarity test. `skipped` tests never flag a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    pub test: SimilarityTest,
    pub score: f64,
    pub threshold: f64,
    pub duplicate: bool,
    pub skipped: bool,
}

impl TestOutcome {
    fn new(test: SimilarityTest, score: f64, threshold: f64, duplicate: bool) -> Self {
        Self {
            test,
            score,
            threshold,
            duplicate,
            skipped: false,
        }
    }

    fn skipped(test: SimilarityTest, threshold: f64) -> Self {
        Self {
            test,
            score: f64::NAN,
            threshold,
            duplicate: false,
            skipped: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Keep,
    Blank { ratio: f64 },
    Duplicate { test: SimilarityTest, score: f64 },
}

impl Verdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, Verdict::Keep)
    }
}

/// Hash and histogram of a non-blank segment, reused as the reference for
/// the next comparison when the segment is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub perceptual_hash: PerceptualHash,
    pub color_histogram: ColorHistogram,
}

impl Fingerprint {
    pub fn compute(image: &RgbaImage) -> Self {
        Self {
            perceptual_hash: PerceptualHash::compute(image),
            color_histogram: ColorHistogram::compute(image),
        }
    }

    pub fn view<'a>(&'a self, image: &'a RgbaImage) -> SegmentView<'a> {
        SegmentView {
            image,
            perceptual_hash: self.perceptual_hash,
            color_histogram: &self.color_histogram,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub verdict: Verdict,
    pub blank_ratio: f64,
    /// Every test that ran, in order. Empty for blank or first segments.
    pub outcomes: Vec<TestOutcome>,
    /// `None` only for blank segments.
    pub fingerprint: Option<Fingerprint>,
}

pub struct SegmentClassifier {
    config: ClassifierConfig,
}

impl SegmentClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies `image` against the last kept segment, if any.
    ///
    /// `overlap_pixels` is the overlap band height in native pixels.
    pub fn classify(
        &self,
        image: &RgbaImage,
        previous: Option<SegmentView<'_>>,
        overlap_pixels: u32,
    ) -> Classification {
        let blank_ratio = blank_ratio(image);
        if blank_ratio > self.config.blank_ratio_threshold {
            return Classification {
                verdict: Verdict::Blank { ratio: blank_ratio },
                blank_ratio,
                outcomes: Vec::new(),
                fingerprint: None,
            };
        }

        let fingerprint = Fingerprint::compute(image);
        let mut outcomes = Vec::new();
        let mut verdict = Verdict::Keep;

        if let Some(previous) = previous {
            let current = fingerprint.view(image);
            for test in &self.config.duplicate_tests {
                let outcome = test.evaluate(&previous, &current, overlap_pixels, &self.config);
                let duplicate = outcome.duplicate;
                let score = outcome.score;
                outcomes.push(outcome);
                if duplicate {
                    verdict = Verdict::Duplicate { test: *test, score };
                    break;
                }
            }
        }

        Classification {
            verdict,
            blank_ratio,
            outcomes,
            fingerprint: Some(fingerprint),
        }
    }
}

impl Default for SegmentClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

/// MSE between the bottom band of `previous` and the top band of `current`.
///
/// `None` when the band is empty or taller than either image. Bands of
/// different widths are not comparable and score infinity.
pub fn overlap_band_mse(previous: &RgbaImage, current: &RgbaImage, overlap_pixels: u32) -> Option<f64> {
    if overlap_pixels == 0 || overlap_pixels > previous.height() || overlap_pixels > current.height() {
        return None;
    }
    if previous.width() != current.width() {
        return Some(f64::INFINITY);
    }

    let bottom = imageops::crop_imm(
        previous,
        0,
        previous.height() - overlap_pixels,
        previous.width(),
        overlap_pixels,
    )
    .to_image();
    let top = imageops::crop_imm(current, 0, 0, current.width(), overlap_pixels).to_image();

    Some(sampled_mse(bottom.as_raw(), top.as_raw()))
}

/// MSE of both images squashed to 100x100.
pub fn full_frame_mse(previous: &RgbaImage, current: &RgbaImage) -> f64 {
    if previous.width() == 0 || previous.height() == 0 || current.width() == 0 || current.height() == 0 {
        return f64::INFINITY;
    }
    let lhs = downsample_square(previous, FRAME_SAMPLE_SIZE);
    let rhs = downsample_square(current, FRAME_SAMPLE_SIZE);
    sampled_mse(lhs.as_raw(), rhs.as_raw())
}
