use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::classify::ClassifierConfig;
use crate::overlap::OverlapConfig;

/// Tunables for one capture run. Missing fields in a settings file fall back
/// to these defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Overlap between consecutive segments in CSS px, used when a request
    /// does not choose one.
    pub overlap_px: u32,
    /// Smallest scroll movement that can reveal new content.
    pub min_scroll_delta_px: i64,
    /// Smallest selection side accepted, in CSS px.
    pub min_selection_px: f64,
    /// Spacing between screenshots; the host throttles to about 2 per second.
    pub capture_interval_ms: u64,
    pub scroll_poll_interval_ms: u64,
    /// How long the scroll offset must stay put to count as settled.
    pub scroll_stable_window_ms: u64,
    pub scroll_max_wait_ms: u64,
    /// Delay after hiding page chrome before the first screenshot.
    pub chrome_settle_ms: u64,
    /// Delay after hiding user regions for a single-area capture.
    pub selection_settle_ms: u64,
    /// Attempts for each scroll or screenshot call before giving up.
    pub primitive_attempts: u32,
    pub retry_backoff_ms: u64,
    pub classifier: ClassifierConfig,
    pub overlap: OverlapConfig,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            overlap_px: 150,
            min_scroll_delta_px: 50,
            min_selection_px: 50.0,
            capture_interval_ms: 600,
            scroll_poll_interval_ms: 10,
            scroll_stable_window_ms: 50,
            scroll_max_wait_ms: 2000,
            chrome_settle_ms: 300,
            selection_settle_ms: 200,
            primitive_attempts: 3,
            retry_backoff_ms: 100,
            classifier: ClassifierConfig::default(),
            overlap: OverlapConfig::default(),
        }
    }
}

impl CaptureSettings {
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    pub fn scroll_poll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_poll_interval_ms.max(1))
    }

    pub fn scroll_stable_window(&self) -> Duration {
        Duration::from_millis(self.scroll_stable_window_ms)
    }

    pub fn scroll_max_wait(&self) -> Duration {
        Duration::from_millis(self.scroll_max_wait_ms)
    }

    pub fn chrome_settle(&self) -> Duration {
        Duration::from_millis(self.chrome_settle_ms)
    }

    pub fn selection_settle(&self) -> Duration {
        Duration::from_millis(self.selection_settle_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Backoff between screenshot attempts. Never shorter than the capture
    /// interval, so a retry cannot hit the tab capture quota again.
    pub fn screenshot_retry_backoff(&self) -> Duration {
        self.retry_backoff().max(self.capture_interval())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CaptureSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`, or defaults when the file is missing or
    /// unreadable as JSON.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring malformed settings at {}: {err}",
                    path.display()
                );
                CaptureSettings::default()
            })
        } else {
            CaptureSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn capture(&self) -> CaptureSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_capture(&self, settings: CaptureSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: CaptureSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &CaptureSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SimilarityTest;
    use crate::testing::scratch_dir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = scratch_dir("settings-missing");
        let store = SettingsStore::new(dir.join("settings.json")).expect("store");
        assert_eq!(store.capture(), CaptureSettings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = scratch_dir("settings-partial");
        let path = dir.join("settings.json");
        fs::write(
            &path,
            r#"{"overlap_px": 200, "classifier": {"duplicate_tests": ["overlap_mse"]}}"#,
        )
        .expect("write");

        let settings = SettingsStore::new(path).expect("store").capture();

        assert_eq!(settings.overlap_px, 200);
        assert_eq!(settings.capture_interval_ms, 600);
        assert_eq!(settings.classifier.duplicate_tests, vec![SimilarityTest::OverlapMse]);
        assert_eq!(settings.classifier.frame_mse_threshold, 50.0);
    }

    #[test]
    fn updates_are_persisted_and_reloadable() {
        let dir = scratch_dir("settings-update");
        let path = dir.join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone()).expect("store");

        let mut settings = store.capture();
        settings.min_scroll_delta_px = 80;
        store.update_capture(settings.clone()).expect("update");

        let reopened = SettingsStore::new(path).expect("reopen");
        assert_eq!(reopened.capture(), settings);
        reopened.reload().expect("reload");
        assert_eq!(reopened.capture().min_scroll_delta_px, 80);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = scratch_dir("settings-malformed");
        let path = dir.join("settings.json");
        fs::write(&path, "{ not json").expect("write");

        let store = SettingsStore::new(path).expect("store");
        assert_eq!(store.capture(), CaptureSettings::default());
        assert!(store.reload().is_err());
    }

    #[test]
    fn screenshot_retries_keep_the_capture_interval() {
        let mut settings = CaptureSettings::default();
        assert_eq!(settings.screenshot_retry_backoff(), Duration::from_millis(600));

        settings.retry_backoff_ms = 900;
        assert_eq!(settings.screenshot_retry_backoff(), Duration::from_millis(900));
    }
}
