//! Test fixtures: synthetic images and a scriptable in-memory page.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Result};
use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureProgress, PageSurface};
use crate::imaging::encode_png;

const NOISE_BLOCK: u32 = 48;

pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// Blocky random colours; different seeds give clearly different images.
pub fn noise_image(seed: u64, width: u32, height: u32) -> RgbaImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let cols = width.div_ceil(NOISE_BLOCK);
    let rows = height.div_ceil(NOISE_BLOCK);
    let palette: Vec<[u8; 3]> = (0..cols * rows).map(|_| rng.gen()).collect();
    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = palette[((y / NOISE_BLOCK) * cols + x / NOISE_BLOCK) as usize];
        Rgba([r, g, b, 255])
    })
}

/// White canvas with a dark rectangle in the top-left corner.
pub fn white_with_dark_rect(width: u32, height: u32, rect_width: u32, rect_height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if x < rect_width && y < rect_height {
            Rgba([20, 20, 20, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

/// Colour depends on the column only, so every row is identical.
pub fn vertical_stripes(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| {
        let shade = ((x / 8) % 2) as u8 * 180 + 30;
        Rgba([shade, 255 - shade, (x % 256) as u8, 255])
    })
}

pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rollcap-{name}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[derive(Default)]
struct PageState {
    offset: i64,
    target: i64,
    lag_remaining: u32,
    jitter_tick: bool,
    scroll_targets: Vec<i64>,
    screenshot_attempts: usize,
    screenshots_taken: usize,
    screenshot_times: Vec<Instant>,
    attempt_times: Vec<Instant>,
    progress: Vec<CaptureProgress>,
    hide_calls: usize,
    restore_calls: usize,
    chrome_hidden: bool,
    user_regions_hidden: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

/// In-memory `PageSurface` with scripted frames and failure modes.
///
/// Screenshots return the frame registered for the current scroll offset,
/// or a noise frame seeded by the offset when none is registered.
pub struct FakePage {
    viewport: (u32, u32),
    frames: HashMap<i64, RgbaImage>,
    max_scroll: i64,
    scroll_lag_polls: u32,
    jitter: bool,
    fail_scrolls: bool,
    fail_screenshots_from: Option<usize>,
    failing_screenshot_attempts: Vec<usize>,
    fail_hide_calls: bool,
    state: Mutex<PageState>,
}

pub struct FakePageBuilder {
    page: FakePage,
}

impl FakePage {
    pub fn builder() -> FakePageBuilder {
        FakePageBuilder {
            page: FakePage {
                viewport: (500, 800),
                frames: HashMap::new(),
                max_scroll: i64::MAX,
                scroll_lag_polls: 0,
                jitter: false,
                fail_scrolls: false,
                fail_screenshots_from: None,
                failing_screenshot_attempts: Vec::new(),
                fail_hide_calls: false,
                state: Mutex::new(PageState::default()),
            },
        }
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cancels `token` once `count` screenshots have been returned.
    pub fn cancel_after_screenshots(&self, count: usize, token: CancellationToken) {
        self.state().cancel_after = Some((count, token));
    }

    pub fn scroll_targets(&self) -> Vec<i64> {
        self.state().scroll_targets.clone()
    }

    pub fn screenshot_attempts(&self) -> usize {
        self.state().screenshot_attempts
    }

    pub fn screenshot_times(&self) -> Vec<Instant> {
        self.state().screenshot_times.clone()
    }

    /// Start time of every screenshot attempt, failed ones included.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.state().attempt_times.clone()
    }

    pub fn progress(&self) -> Vec<CaptureProgress> {
        self.state().progress.clone()
    }

    pub fn hide_calls(&self) -> usize {
        self.state().hide_calls
    }

    /// True once something was hidden and everything hidden was restored.
    pub fn chrome_restored(&self) -> bool {
        let state = self.state();
        state.hide_calls > 0 && state.restore_calls > 0 && !state.chrome_hidden && !state.user_regions_hidden
    }

    fn frame_at(&self, offset: i64) -> RgbaImage {
        match self.frames.get(&offset) {
            Some(frame) => frame.clone(),
            None => noise_image(offset as u64 ^ 0x5eed, self.viewport.0, self.viewport.1),
        }
    }
}

impl FakePageBuilder {
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.page.viewport = (width, height);
        self
    }

    pub fn frame(mut self, offset: i64, image: RgbaImage) -> Self {
        self.page.frames.insert(offset, image);
        self
    }

    /// The page cannot scroll past `offset`.
    pub fn max_scroll(mut self, offset: i64) -> Self {
        self.page.max_scroll = offset;
        self
    }

    /// The offset reaches its target over `polls` reads instead of instantly.
    pub fn scroll_lag_polls(mut self, polls: u32) -> Self {
        self.page.scroll_lag_polls = polls;
        self
    }

    /// The offset keeps flickering by one pixel and never settles.
    pub fn jitter_scroll(mut self) -> Self {
        self.page.jitter = true;
        self
    }

    pub fn fail_scrolls(mut self) -> Self {
        self.page.fail_scrolls = true;
        self
    }

    /// Every screenshot attempt from the `attempt`-th (zero-based) on fails.
    pub fn fail_screenshots_from(mut self, attempt: usize) -> Self {
        self.page.fail_screenshots_from = Some(attempt);
        self
    }

    /// Only the given (zero-based) screenshot attempt fails.
    pub fn fail_screenshot_attempt(mut self, attempt: usize) -> Self {
        self.page.failing_screenshot_attempts.push(attempt);
        self
    }

    /// Hide and progress messages fail as if the page's receiver were gone.
    pub fn fail_hide_calls(mut self) -> Self {
        self.page.fail_hide_calls = true;
        self
    }

    pub fn build(self) -> FakePage {
        self.page
    }
}

impl PageSurface for FakePage {
    async fn scroll_to(&self, offset: i64) -> Result<()> {
        if self.fail_scrolls {
            bail!("receiver not ready");
        }
        let mut state = self.state();
        let target = offset.clamp(0, self.max_scroll);
        state.scroll_targets.push(offset);
        state.target = target;
        if self.scroll_lag_polls == 0 {
            state.offset = target;
        } else {
            state.lag_remaining = self.scroll_lag_polls;
        }
        Ok(())
    }

    async fn scroll_offset(&self) -> Result<i64> {
        let mut state = self.state();
        if self.jitter {
            state.jitter_tick = !state.jitter_tick;
            state.offset = state.target + i64::from(state.jitter_tick);
            return Ok(state.offset);
        }
        if state.lag_remaining > 0 {
            let remaining = i64::from(state.lag_remaining);
            state.offset += (state.target - state.offset) / remaining;
            state.lag_remaining -= 1;
        }
        Ok(state.offset)
    }

    async fn capture_visible_viewport(&self) -> Result<Vec<u8>> {
        let offset = {
            let mut state = self.state();
            let attempt = state.screenshot_attempts;
            state.screenshot_attempts += 1;
            state.attempt_times.push(Instant::now());
            if self.fail_screenshots_from.is_some_and(|from| attempt >= from)
                || self.failing_screenshot_attempts.contains(&attempt)
            {
                bail!("tab capture quota exceeded");
            }
            state.offset
        };

        let png = encode_png(&self.frame_at(offset))?;

        let mut state = self.state();
        state.screenshots_taken += 1;
        state.screenshot_times.push(Instant::now());
        if let Some((count, token)) = &state.cancel_after {
            if state.screenshots_taken >= *count {
                token.cancel();
            }
        }
        Ok(png)
    }

    async fn hide_page_chrome(&self) -> Result<()> {
        let mut state = self.state();
        state.hide_calls += 1;
        if self.fail_hide_calls {
            bail!("receiver not ready");
        }
        state.chrome_hidden = true;
        Ok(())
    }

    async fn restore_page_chrome(&self) -> Result<()> {
        let mut state = self.state();
        state.restore_calls += 1;
        state.chrome_hidden = false;
        Ok(())
    }

    async fn hide_user_regions(&self) -> Result<()> {
        let mut state = self.state();
        state.hide_calls += 1;
        if self.fail_hide_calls {
            bail!("receiver not ready");
        }
        state.user_regions_hidden = true;
        Ok(())
    }

    async fn restore_user_regions(&self) -> Result<()> {
        let mut state = self.state();
        state.restore_calls += 1;
        state.user_regions_hidden = false;
        Ok(())
    }

    async fn report_progress(&self, progress: CaptureProgress) -> Result<()> {
        let mut state = self.state();
        state.progress.push(progress);
        if self.fail_hide_calls {
            bail!("receiver not ready");
        }
        Ok(())
    }
}
