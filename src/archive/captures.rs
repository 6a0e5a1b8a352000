use anyhow::{anyhow, Context, Result};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};

use super::helpers::{conversion_error, parse_datetime, to_u32};
use super::models::{Capture, CaptureSummary};
use super::Database;

/// Shown to the user when the archive runs out of space.
pub const STORAGE_FULL_MESSAGE: &str = "Storage full! Delete older captures and try again.";

fn row_to_capture(row: &Row) -> Result<Capture, rusqlite::Error> {
    let captured_at: String = row.get("captured_at")?;
    Ok(Capture {
        id: row.get("id")?,
        url: row.get("url")?,
        screenshot: row.get("screenshot")?,
        width: to_u32(row.get("width")?, "width").map_err(|e| conversion_error(3, e))?,
        height: to_u32(row.get("height")?, "height").map_err(|e| conversion_error(4, e))?,
        date: row.get("date")?,
        platform: row.get("platform")?,
        is_about_page: row.get("is_about_page")?,
        captured_at: parse_datetime(&captured_at, "captured_at").map_err(|e| conversion_error(8, e))?,
        case_name: row.get("case_name")?,
        case_mig: row.get("case_mig")?,
        subject_name: row.get("subject_name")?,
        segment_count: to_u32(row.get("segment_count")?, "segment_count")
            .map_err(|e| conversion_error(12, e))?,
    })
}

fn row_to_summary(row: &Row) -> Result<CaptureSummary, rusqlite::Error> {
    let captured_at: String = row.get("captured_at")?;
    let screenshot_bytes: i64 = row.get("screenshot_bytes")?;
    Ok(CaptureSummary {
        id: row.get("id")?,
        url: row.get("url")?,
        platform: row.get("platform")?,
        width: to_u32(row.get("width")?, "width").map_err(|e| conversion_error(3, e))?,
        height: to_u32(row.get("height")?, "height").map_err(|e| conversion_error(4, e))?,
        captured_at: parse_datetime(&captured_at, "captured_at").map_err(|e| conversion_error(5, e))?,
        case_name: row.get("case_name")?,
        case_mig: row.get("case_mig")?,
        subject_name: row.get("subject_name")?,
        segment_count: to_u32(row.get("segment_count")?, "segment_count")
            .map_err(|e| conversion_error(9, e))?,
        screenshot_bytes: screenshot_bytes.max(0) as u64,
    })
}

impl Database {
    pub async fn insert_capture(&self, capture: &Capture) -> Result<()> {
        let record = capture.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO captures (
                    id, url, screenshot, width, height, date, platform, is_about_page,
                    captured_at, case_name, case_mig, subject_name, segment_count
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    record.id,
                    record.url,
                    record.screenshot,
                    record.width,
                    record.height,
                    record.date,
                    record.platform,
                    record.is_about_page,
                    record.captured_at.to_rfc3339(),
                    record.case_name,
                    record.case_mig,
                    record.subject_name,
                    record.segment_count,
                ],
            )
            .map_err(|err| match err.sqlite_error_code() {
                Some(ErrorCode::DiskFull) => anyhow!(err).context(STORAGE_FULL_MESSAGE),
                _ => anyhow!(err).context("failed to insert capture"),
            })?;
            Ok(())
        })
        .await
    }

    pub async fn get_capture(&self, id: &str) -> Result<Option<Capture>> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT id, url, screenshot, width, height, date, platform, is_about_page,
                        captured_at, case_name, case_mig, subject_name, segment_count
                 FROM captures WHERE id = ?1",
                params![id],
                row_to_capture,
            )
            .optional()
            .context("failed to load capture")
        })
        .await
    }

    /// Newest first, without screenshot blobs.
    pub async fn list_captures(&self, limit: usize) -> Result<Vec<CaptureSummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, platform, width, height, captured_at,
                        case_name, case_mig, subject_name, segment_count,
                        length(screenshot) AS screenshot_bytes
                 FROM captures
                 ORDER BY captured_at DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], row_to_summary)?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("failed to list captures")
        })
        .await
    }

    pub async fn list_captures_for_case(&self, case_mig: &str) -> Result<Vec<CaptureSummary>> {
        let case_mig = case_mig.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, platform, width, height, captured_at,
                        case_name, case_mig, subject_name, segment_count,
                        length(screenshot) AS screenshot_bytes
                 FROM captures
                 WHERE case_mig = ?1
                 ORDER BY captured_at ASC",
            )?;
            let rows = stmt.query_map(params![case_mig], row_to_summary)?;
            rows.collect::<Result<Vec<_>, _>>()
                .context("failed to list captures for case")
        })
        .await
    }

    pub async fn count_captures(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM captures", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete_capture(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let removed = conn
                .execute("DELETE FROM captures WHERE id = ?1", params![id])
                .context("failed to delete capture")?;
            Ok(removed > 0)
        })
        .await
    }
}
