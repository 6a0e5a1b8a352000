use thiserror::Error;

use crate::archive::Capture;
use crate::capture::CaptureStats;
use crate::imaging::CropError;
use crate::stitch::StitchError;

/// Everything that can end a capture run without producing a `Capture`.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("selection too small ({width}x{height} px); select at least {min}x{min} px")]
    InputTooSmall { width: f64, height: f64, min: f64 },

    #[error(
        "segment {index} scrolls to {current}px after {previous}px; segments must be in ascending scroll order"
    )]
    OutOfOrder {
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("capture cancelled")]
    Cancelled,

    #[error("a capture is already running")]
    AlreadyRunning,

    #[error("no capture is running")]
    NoActiveRun,

    #[error("page {operation} failed: {source:#}")]
    Primitive {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "all {} segments were filtered out ({} blank, {} duplicate, {} did not scroll) - nothing to capture",
        .stats.planned, .stats.blank, .stats.duplicate, .stats.below_min_delta
    )]
    NothingToCapture { stats: CaptureStats },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error(transparent)]
    Stitch(#[from] StitchError),

    /// The capture was assembled but the archive rejected it. The record is
    /// handed back so the caller can retry once space has been freed.
    #[error("failed to save capture to archive: {source:#}")]
    Persistence {
        capture: Box<Capture>,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;
