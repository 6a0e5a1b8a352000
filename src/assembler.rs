//! Turns a finished image plus its run context into an archived `Capture`.

use chrono::Utc;
use image::RgbaImage;
use uuid::Uuid;

use crate::archive::{ArchiveStore, Capture};
use crate::capture::RunContext;
use crate::error::{CaptureError, CaptureResult};
use crate::imaging::encode_png;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Display name of the site a URL belongs to: `https://www.facebook.com/x`
/// gives `Facebook`, `https://m.tiktok.com` gives `Tiktok`.
pub fn platform_from_url(url: &str) -> String {
    let host = host_of(url).to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let labels: Vec<&str> = host.split('.').filter(|label| !label.is_empty()).collect();
    let main = match labels.as_slice() {
        [] => return "Unknown".to_string(),
        [only] => *only,
        [.., name, _tld] => *name,
    };

    let mut chars = main.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Unknown".to_string(),
    }
}

fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    authority.split(':').next().unwrap_or(authority)
}

/// Encodes `image` and fills in a `Capture` from the run context.
///
/// CPU-bound; call from a blocking task.
pub fn assemble_capture(ctx: &RunContext, image: &RgbaImage, segment_count: u32) -> CaptureResult<Capture> {
    let screenshot = encode_png(image)?;
    Ok(Capture {
        id: Uuid::new_v4().to_string(),
        url: ctx.url.clone(),
        screenshot,
        width: image.width(),
        height: image.height(),
        date: None,
        platform: ctx.platform.clone(),
        is_about_page: false,
        captured_at: Utc::now(),
        case_name: ctx.case.name.clone(),
        case_mig: ctx.case.mig.clone(),
        subject_name: ctx.case.current_subject.clone(),
        segment_count,
    })
}

/// Appends `capture` to the archive. On failure the capture is handed back
/// inside the error so it can be saved again later.
pub async fn persist<S: ArchiveStore>(store: &S, capture: Capture) -> CaptureResult<Capture> {
    match store.append_capture(&capture).await {
        Ok(()) => {
            log_info!(
                "archived capture {} ({}x{}, {} bytes, {} segments)",
                capture.id,
                capture.width,
                capture.height,
                capture.screenshot.len(),
                capture.segment_count
            );
            Ok(capture)
        }
        Err(source) => {
            log_warn!("could not archive capture {}: {source:#}", capture.id);
            Err(CaptureError::Persistence {
                capture: Box::new(capture),
                source,
            })
        }
    }
}
