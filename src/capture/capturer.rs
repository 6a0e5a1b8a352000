use std::sync::Arc;

use anyhow::Context;
use image::RgbaImage;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::classify::{Classification, Fingerprint, SegmentClassifier, Verdict};
use crate::error::{CaptureError, CaptureResult};
use crate::imaging::{crop_to_bounds, decode_screenshot};
use crate::models::Segment;
use crate::overlap::{suggest_overlap, OverlapSuggestion};
use crate::settings::CaptureSettings;
use crate::stitch::overlap_pixels;

use super::page::{CaptureProgress, PageSurface};
use super::session::RunContext;
use super::steps::{cancellable, scroll_and_settle, wait_until, with_retries};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Counters for one run, reported on success and in `NothingToCapture`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStats {
    pub planned: usize,
    pub screenshots: usize,
    pub kept: usize,
    pub blank: usize,
    pub duplicate: usize,
    pub below_min_delta: usize,
    pub unsettled_scrolls: usize,
}

/// Fingerprints and overlap advice of a kept segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMetadata {
    pub fingerprint: Fingerprint,
    pub suggested_overlap: OverlapSuggestion,
}

#[derive(Debug, Clone)]
pub struct KeptSegment {
    /// Position in the plan.
    pub index: usize,
    pub segment: Segment,
    pub actual_scroll: i64,
    pub image: Arc<RgbaImage>,
    pub metadata: SegmentMetadata,
}

#[derive(Debug)]
pub struct CaptureRun {
    pub segments: Vec<KeptSegment>,
    pub stats: CaptureStats,
}

struct AnalyzedSegment {
    image: RgbaImage,
    classification: Classification,
    suggestion: Option<OverlapSuggestion>,
}

/// Rejects plans whose scroll positions are not strictly ascending.
pub fn validate_plan_order(plan: &[Segment]) -> CaptureResult<()> {
    for (index, pair) in plan.windows(2).enumerate() {
        let (previous, current) = (pair[0].scroll_position, pair[1].scroll_position);
        if current <= previous {
            return Err(CaptureError::OutOfOrder {
                index: index + 1,
                previous,
                current,
            });
        }
    }
    Ok(())
}

/// Drives scroll, screenshot, crop and classification over a segment plan.
pub struct SegmentCapturer<'a, P> {
    page: &'a P,
    settings: &'a CaptureSettings,
    classifier: Arc<SegmentClassifier>,
}

impl<'a, P: PageSurface> SegmentCapturer<'a, P> {
    pub fn new(page: &'a P, settings: &'a CaptureSettings) -> Self {
        Self {
            page,
            settings,
            classifier: Arc::new(SegmentClassifier::new(settings.classifier.clone())),
        }
    }

    /// Captures every segment of `plan` that moves the page far enough and is
    /// neither blank nor a duplicate of the previous kept segment.
    ///
    /// Page chrome and user regions are hidden for the whole loop and always
    /// restored before returning, including on error and cancellation.
    pub async fn capture(&self, plan: &[Segment], ctx: &RunContext) -> CaptureResult<CaptureRun> {
        validate_plan_order(plan)?;

        log_info!(
            "run {}: capturing {} segments with {}px overlap",
            ctx.run_id,
            plan.len(),
            ctx.overlap_px
        );

        self.hide_chrome().await;
        let result = self.capture_segments(plan, ctx).await;
        self.restore_chrome().await;

        match &result {
            Ok(run) => log_info!(
                "run {}: {} kept, {} blank, {} duplicate, {} below min delta of {} planned",
                ctx.run_id,
                run.stats.kept,
                run.stats.blank,
                run.stats.duplicate,
                run.stats.below_min_delta,
                run.stats.planned
            ),
            Err(CaptureError::Cancelled) => log_info!("run {}: cancelled", ctx.run_id),
            Err(err) => log_error!("run {}: capture loop aborted: {err}", ctx.run_id),
        }
        result
    }

    async fn capture_segments(&self, plan: &[Segment], ctx: &RunContext) -> CaptureResult<CaptureRun> {
        let cancel_token = ctx.cancel_token();
        let min_delta = self.settings.min_scroll_delta_px;

        let mut stats = CaptureStats {
            planned: plan.len(),
            ..CaptureStats::default()
        };
        let mut kept: Vec<KeptSegment> = Vec::new();
        let mut previous_planned: Option<i64> = None;
        let mut last_screenshot_at: Option<Instant> = None;

        wait_until(cancel_token, Instant::now() + self.settings.chrome_settle()).await?;

        for (index, segment) in plan.iter().enumerate() {
            let position = index + 1;
            self.report_progress(position, plan.len(), cancel_token).await?;

            if let Some(previous) = previous_planned {
                let planned_delta = segment.scroll_position - previous;
                if planned_delta < min_delta {
                    log_info!(
                        "segment {position}/{}: planned scroll delta {planned_delta}px < {min_delta}px, skipping",
                        plan.len()
                    );
                    stats.below_min_delta += 1;
                    continue;
                }
            }
            previous_planned = Some(segment.scroll_position);

            let target = segment.scroll_position;
            let scroll = cancellable(
                cancel_token,
                with_retries(
                    "scroll",
                    self.settings.primitive_attempts,
                    self.settings.retry_backoff(),
                    || scroll_and_settle(self.page, target, self.settings),
                ),
            )
            .await?;

            if !scroll.settled {
                stats.unsettled_scrolls += 1;
                log_warn!(
                    "segment {position}/{}: scroll to {}px still moving after {}ms, continuing at {}px",
                    plan.len(),
                    target,
                    scroll.waited.as_millis(),
                    scroll.actual
                );
            }

            if let Some(previous) = kept.last() {
                let actual_delta = scroll.actual - previous.actual_scroll;
                if actual_delta < min_delta {
                    log_info!(
                        "segment {position}/{}: actual scroll delta {actual_delta}px < {min_delta}px, skipping",
                        plan.len()
                    );
                    stats.below_min_delta += 1;
                    continue;
                }
            }

            if let Some(previous_shot) = last_screenshot_at {
                wait_until(cancel_token, previous_shot + self.settings.capture_interval()).await?;
            }

            let png = cancellable(
                cancel_token,
                with_retries(
                    "screenshot",
                    self.settings.primitive_attempts,
                    self.settings.screenshot_retry_backoff(),
                    || self.page.capture_visible_viewport(),
                ),
            )
            .await?;
            last_screenshot_at = Some(Instant::now());
            stats.screenshots += 1;

            let analyzed = cancellable(cancel_token, self.analyze(png, segment, kept.last(), ctx)).await?;

            match analyzed.classification.verdict {
                Verdict::Keep => {
                    let (fingerprint, suggestion) =
                        match (analyzed.classification.fingerprint, analyzed.suggestion) {
                            (Some(fingerprint), Some(suggestion)) => (fingerprint, suggestion),
                            _ => {
                                return Err(CaptureError::Internal(anyhow::anyhow!(
                                    "kept segment {position} is missing its fingerprint"
                                )))
                            }
                        };
                    log_info!(
                        "segment {position}/{}: kept (content {}, suggested overlap {}px, edge density {:.3})",
                        plan.len(),
                        suggestion.complexity.as_str(),
                        suggestion.overlap_px,
                        suggestion.edge_density
                    );
                    stats.kept += 1;
                    kept.push(KeptSegment {
                        index,
                        segment: *segment,
                        actual_scroll: scroll.actual,
                        image: Arc::new(analyzed.image),
                        metadata: SegmentMetadata {
                            fingerprint,
                            suggested_overlap: suggestion,
                        },
                    });
                }
                Verdict::Blank { ratio } => {
                    log_info!(
                        "segment {position}/{}: blank ({:.1}% empty), skipping",
                        plan.len(),
                        ratio * 100.0
                    );
                    stats.blank += 1;
                }
                Verdict::Duplicate { test, score } => {
                    log_info!(
                        "segment {position}/{}: duplicate by {} (score {:.1}), skipping",
                        plan.len(),
                        test.as_str(),
                        score
                    );
                    stats.duplicate += 1;
                }
            }

            for outcome in &analyzed.classification.outcomes {
                log_debug!(
                    "segment {position}: {} score={:.2} threshold={:.2} duplicate={} skipped={}",
                    outcome.test.as_str(),
                    outcome.score,
                    outcome.threshold,
                    outcome.duplicate,
                    outcome.skipped
                );
            }
        }

        Ok(CaptureRun {
            segments: kept,
            stats,
        })
    }

    /// Decodes, crops and classifies one screenshot off the async runtime.
    async fn analyze(
        &self,
        png: Vec<u8>,
        segment: &Segment,
        previous: Option<&KeptSegment>,
        ctx: &RunContext,
    ) -> CaptureResult<AnalyzedSegment> {
        let bounds = segment.bounds;
        let band = overlap_pixels(ctx.overlap_px, bounds.dpr());
        let classifier = Arc::clone(&self.classifier);
        let overlap_config = self.settings.overlap.clone();
        let reference = previous.map(|kept| (Arc::clone(&kept.image), kept.metadata.fingerprint.clone()));

        tokio::task::spawn_blocking(move || -> CaptureResult<AnalyzedSegment> {
            let raw = decode_screenshot(&png)?;
            drop(png);
            let image = crop_to_bounds(&raw, &bounds)?;
            drop(raw);

            let previous_view = reference
                .as_ref()
                .map(|(image, fingerprint)| fingerprint.view(image.as_ref()));
            let classification = classifier.classify(&image, previous_view, band);
            let suggestion = classification
                .verdict
                .is_keep()
                .then(|| suggest_overlap(&image, &overlap_config));

            Ok(AnalyzedSegment {
                image,
                classification,
                suggestion,
            })
        })
        .await
        .context("segment analysis worker join failed")?
    }

    async fn report_progress(
        &self,
        current_segment: usize,
        total_segments: usize,
        cancel_token: &CancellationToken,
    ) -> CaptureResult<()> {
        let progress = CaptureProgress {
            current_segment,
            total_segments,
        };
        let report = async { Ok::<_, CaptureError>(self.page.report_progress(progress).await) };
        if let Err(err) = cancellable(cancel_token, report).await? {
            log_debug!("progress update {current_segment}/{total_segments} not delivered: {err:#}");
        }
        Ok(())
    }

    async fn hide_chrome(&self) {
        if let Err(err) = self.page.hide_user_regions().await {
            log_warn!("could not hide user regions: {err:#}");
        }
        if let Err(err) = self.page.hide_page_chrome().await {
            log_warn!("could not hide page chrome: {err:#}");
        }
    }

    async fn restore_chrome(&self) {
        if let Err(err) = self.page.restore_user_regions().await {
            log_warn!("could not restore user regions: {err:#}");
        }
        if let Err(err) = self.page.restore_page_chrome().await {
            log_warn!("could not restore page chrome: {err:#}");
        }
    }
}
