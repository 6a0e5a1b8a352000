use std::future::Future;

use anyhow::Result;
use serde::Serialize;

/// Position of the capture loop, shown by the page's progress overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureProgress {
    /// 1-based index of the planned segment being processed.
    pub current_segment: usize,
    pub total_segments: usize,
}

/// The page/tab a capture runs against.
///
/// Implementations forward to the browser (content script messages, tab
/// screenshot API). Calls may fail transiently, e.g. while the page's
/// receiver is not ready yet; the capture loop retries scroll and screenshot
/// calls and tolerates failures of the hide/restore calls.
pub trait PageSurface: Send + Sync {
    /// Scrolls the document to an absolute vertical offset in CSS px.
    fn scroll_to(&self, offset: i64) -> impl Future<Output = Result<()>> + Send;

    /// Current vertical scroll offset in CSS px.
    fn scroll_offset(&self) -> impl Future<Output = Result<i64>> + Send;

    /// Encoded (PNG/JPEG) screenshot of the visible viewport at native density.
    fn capture_visible_viewport(&self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Hides fixed and sticky page chrome (headers, chat heads, banners).
    fn hide_page_chrome(&self) -> impl Future<Output = Result<()>> + Send;

    fn restore_page_chrome(&self) -> impl Future<Output = Result<()>> + Send;

    /// Hides regions that identify the capturing user (own avatar, comment
    /// composer, account menu).
    fn hide_user_regions(&self) -> impl Future<Output = Result<()>> + Send;

    fn restore_user_regions(&self) -> impl Future<Output = Result<()>> + Send;

    /// Updates the on-page progress indicator. Failures are ignored.
    fn report_progress(&self, progress: CaptureProgress) -> impl Future<Output = Result<()>> + Send;
}
