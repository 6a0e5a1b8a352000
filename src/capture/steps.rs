//! Suspension points of the capture loop: retried page calls, scroll
//! settling, and cancellable waits.

use std::future::Future;

use tokio::time::{sleep, sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{CaptureError, CaptureResult};
use crate::settings::CaptureSettings;

use super::page::PageSurface;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Runs `step` unless `cancel_token` fires first.
pub async fn cancellable<T, F>(cancel_token: &CancellationToken, step: F) -> CaptureResult<T>
where
    F: Future<Output = CaptureResult<T>>,
{
    if cancel_token.is_cancelled() {
        return Err(CaptureError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => Err(CaptureError::Cancelled),
        result = step => result,
    }
}

/// Cancellable sleep until `deadline`.
pub async fn wait_until(cancel_token: &CancellationToken, deadline: Instant) -> CaptureResult<()> {
    cancellable(cancel_token, async {
        sleep_until(deadline).await;
        Ok(())
    })
    .await
}

/// Calls a page primitive up to `attempts` times with a fixed backoff.
pub async fn with_retries<T, F, Fut>(
    operation: &'static str,
    attempts: u32,
    backoff: Duration,
    mut call: F,
) -> CaptureResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                log_warn!("page {operation} failed (attempt {attempt}/{attempts}): {err:#}");
                sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => {
                return Err(CaptureError::Primitive {
                    operation,
                    source: err,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub requested: i64,
    pub actual: i64,
    /// `false` when the offset was still moving at the deadline.
    pub settled: bool,
    pub waited: Duration,
}

/// Scrolls to `target` and polls until the offset stops moving for the
/// stability window or the maximum wait runs out.
///
/// Running out of time is not an error: the last observed offset is
/// returned with `settled == false`.
pub async fn scroll_and_settle<P: PageSurface>(
    page: &P,
    target: i64,
    settings: &CaptureSettings,
) -> anyhow::Result<ScrollOutcome> {
    page.scroll_to(target).await?;

    let started = Instant::now();
    let deadline = started + settings.scroll_max_wait();
    let window = settings.scroll_stable_window();
    let poll = settings.scroll_poll_interval();

    let mut last = page.scroll_offset().await?;
    let mut still_since = Instant::now();

    let settled = loop {
        let now = Instant::now();
        if now.duration_since(still_since) >= window {
            break true;
        }
        if now >= deadline {
            break false;
        }
        sleep(poll).await;

        let current = page.scroll_offset().await?;
        if current != last {
            last = current;
            still_since = Instant::now();
        }
    };

    let outcome = ScrollOutcome {
        requested: target,
        actual: last,
        settled,
        waited: started.elapsed(),
    };
    log_debug!(
        "scroll to {}px settled={} at {}px after {}ms",
        target,
        settled,
        last,
        outcome.waited.as_millis()
    );
    Ok(outcome)
}
