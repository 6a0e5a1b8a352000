//! Rolling screenshot capture for post archiving.
//!
//! A capture scrolls through a selection segment by segment, drops blank and
//! duplicate segments, stitches the survivors with the overlap removed and
//! appends the result to a local SQLite archive.

pub mod archive;
pub mod assembler;
pub mod capture;
pub mod classify;
pub mod error;
pub mod imaging;
pub mod models;
pub mod overlap;
pub mod pipeline;
pub mod planner;
pub mod settings;
pub mod stitch;
mod utils;

#[cfg(test)]
mod testing;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

pub use archive::{ArchiveStore, Capture, Database};
pub use capture::{CaptureCommand, CaptureController, CaptureStats, PageSurface};
pub use error::{CaptureError, CaptureResult};
pub use pipeline::{capture_selection, run_rolling_capture, RollingCaptureRequest, SelectionCaptureRequest};
pub use settings::{CaptureSettings, SettingsStore};

/// Initializes logging from `RUST_LOG`, defaulting to `info`. Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Archive and settings opened from one data directory.
pub struct AppState {
    pub db: Database,
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("rollcap.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        log::info!("Rollcap state opened from {}", data_dir.display());

        Ok(Self {
            db,
            settings: Arc::new(settings),
        })
    }

    /// Controller that captures from `page` into this state's archive.
    pub fn controller<P: PageSurface + 'static>(&self, page: Arc<P>) -> CaptureController<P, Database> {
        CaptureController::new(page, Arc::new(self.db.clone()), Arc::clone(&self.settings))
    }
}
