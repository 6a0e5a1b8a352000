//! End-to-end capture flows: segment loop, stitching, assembly and archiving.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::archive::{ArchiveStore, Capture};
use crate::assembler::{assemble_capture, persist};
use crate::capture::steps::{cancellable, wait_until, with_retries};
use crate::capture::{PageSurface, RunContext, SegmentCapturer};
use crate::error::{CaptureError, CaptureResult};
use crate::imaging::{crop_to_bounds, decode_screenshot};
use crate::models::{CaptureBounds, CaseInfo, Segment, Selection};
use crate::planner::plan_segments;
use crate::settings::CaptureSettings;
use crate::stitch::stitch;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingCaptureRequest {
    pub url: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub case: Option<CaseInfo>,
    pub segments: Vec<Segment>,
    /// Falls back to the configured overlap when absent.
    #[serde(default)]
    pub overlap_px: Option<u32>,
}

impl RollingCaptureRequest {
    /// Request for a tall selection, planned with the configured overlap.
    pub fn for_selection(
        url: impl Into<String>,
        selection: &Selection,
        case: Option<CaseInfo>,
        settings: &CaptureSettings,
    ) -> CaptureResult<Self> {
        let segments = plan_segments(selection, settings.overlap_px, settings)?;
        Ok(Self {
            url: url.into(),
            platform: None,
            case,
            segments,
            overlap_px: Some(settings.overlap_px),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCaptureRequest {
    pub url: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub case: Option<CaseInfo>,
    pub bounds: CaptureBounds,
}

/// Captures, filters and stitches a planned sequence of segments and
/// archives the result as one `Capture`.
pub async fn run_rolling_capture<P, S>(
    page: &P,
    store: &S,
    settings: &CaptureSettings,
    request: RollingCaptureRequest,
    cancel_token: CancellationToken,
) -> CaptureResult<Capture>
where
    P: PageSurface,
    S: ArchiveStore,
{
    let overlap_px = request.overlap_px.unwrap_or(settings.overlap_px);
    let ctx = RunContext::new(request.url, request.platform, request.case, overlap_px, cancel_token);

    let run = SegmentCapturer::new(page, settings)
        .capture(&request.segments, &ctx)
        .await?;

    let Some(first) = run.segments.first() else {
        log_warn!("run {}: every segment was filtered out", ctx.run_id);
        return Err(CaptureError::NothingToCapture { stats: run.stats });
    };
    let device_pixel_ratio = first.segment.bounds.dpr();
    let segment_count = u32::try_from(run.segments.len()).context("too many segments")?;

    let images: Vec<_> = run
        .segments
        .into_iter()
        .map(|kept| Arc::try_unwrap(kept.image).unwrap_or_else(|shared| (*shared).clone()))
        .collect();

    let blocking_ctx = ctx.clone();
    let capture = cancellable(ctx.cancel_token(), async move {
        tokio::task::spawn_blocking(move || -> CaptureResult<Capture> {
            let stitched = stitch(images, overlap_px, device_pixel_ratio)?;
            log_info!(
                "run {}: stitched {} segments into {}x{}",
                blocking_ctx.run_id,
                segment_count,
                stitched.width(),
                stitched.height()
            );
            assemble_capture(&blocking_ctx, &stitched, segment_count)
        })
        .await
        .context("stitch worker join failed")?
    })
    .await?;

    persist(store, capture).await
}

/// Captures the visible part of one selection, without scrolling.
pub async fn capture_selection<P, S>(
    page: &P,
    store: &S,
    settings: &CaptureSettings,
    request: SelectionCaptureRequest,
    cancel_token: CancellationToken,
) -> CaptureResult<Capture>
where
    P: PageSurface,
    S: ArchiveStore,
{
    let bounds = request.bounds;
    let min = settings.min_selection_px;
    if !(bounds.width >= min && bounds.height >= min) {
        return Err(CaptureError::InputTooSmall {
            width: bounds.width,
            height: bounds.height,
            min,
        });
    }

    let ctx = RunContext::new(
        request.url,
        request.platform,
        request.case,
        settings.overlap_px,
        cancel_token,
    );

    if let Err(err) = page.hide_user_regions().await {
        log_warn!("could not hide user regions: {err:#}");
    }
    let shot = grab_viewport(page, settings, &ctx).await;
    if let Err(err) = page.restore_user_regions().await {
        log_warn!("could not restore user regions: {err:#}");
    }
    let png = shot?;

    let blocking_ctx = ctx.clone();
    let capture = cancellable(ctx.cancel_token(), async move {
        tokio::task::spawn_blocking(move || -> CaptureResult<Capture> {
            let raw = decode_screenshot(&png)?;
            let cropped = crop_to_bounds(&raw, &bounds)?;
            assemble_capture(&blocking_ctx, &cropped, 1)
        })
        .await
        .context("selection worker join failed")?
    })
    .await?;

    log_info!(
        "run {}: captured selection {}x{} on {}",
        ctx.run_id,
        capture.width,
        capture.height,
        ctx.platform
    );
    persist(store, capture).await
}

async fn grab_viewport<P: PageSurface>(
    page: &P,
    settings: &CaptureSettings,
    ctx: &RunContext,
) -> CaptureResult<Vec<u8>> {
    wait_until(ctx.cancel_token(), Instant::now() + settings.selection_settle()).await?;
    cancellable(
        ctx.cancel_token(),
        with_retries(
            "screenshot",
            settings.primitive_attempts,
            settings.screenshot_retry_backoff(),
            || page.capture_visible_viewport(),
        ),
    )
    .await
}
