//! Splits a tall selection into viewport-sized segments.

use crate::error::{CaptureError, CaptureResult};
use crate::models::{CaptureBounds, Segment, Selection};
use crate::settings::CaptureSettings;

/// Plans scroll offsets so that consecutive segments share `overlap_px` rows.
///
/// Each segment scrolls the selection's next slice to the top of the viewport
/// and keeps `selection.width` by `min(viewport_height, height)` CSS px of it.
/// The last segment may reach below the selection. Steps shorter than the
/// minimum scroll delta are rejected, since the capture loop would skip them.
pub fn plan_segments(
    selection: &Selection,
    overlap_px: u32,
    settings: &CaptureSettings,
) -> CaptureResult<Vec<Segment>> {
    let min_side_px = settings.min_selection_px;
    let too_small = || CaptureError::InputTooSmall {
        width: selection.width,
        height: selection.height,
        min: min_side_px,
    };

    if !(selection.width >= min_side_px && selection.height >= min_side_px) {
        return Err(too_small());
    }

    let segment_height = selection.viewport_height.min(selection.height).floor();
    let step = segment_height - f64::from(overlap_px);
    let remaining = selection.height - segment_height;

    let extra_segments = if remaining <= 0.0 {
        0
    } else if step < settings.min_scroll_delta_px.max(1) as f64 {
        return Err(too_small());
    } else {
        (remaining / step).ceil() as usize
    };
    let bounds = CaptureBounds::new(
        selection.x,
        0.0,
        selection.width,
        segment_height,
        selection.device_pixel_ratio,
    );

    Ok((0..=extra_segments)
        .map(|i| {
            let offset = selection.top + step * i as f64;
            Segment::new(offset.floor() as i64, bounds)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CaptureSettings {
        CaptureSettings::default()
    }

    fn selection(top: f64, height: f64, viewport_height: f64) -> Selection {
        Selection {
            x: 40.0,
            top,
            width: 500.0,
            height,
            viewport_height,
            device_pixel_ratio: 2.0,
        }
    }

    #[test]
    fn tall_selection_is_split_with_overlap() {
        let plan = plan_segments(&selection(100.0, 2750.0, 800.0), 150, &settings()).expect("plan");

        let offsets: Vec<i64> = plan.iter().map(|s| s.scroll_position).collect();
        assert_eq!(offsets, vec![100, 750, 1400, 2050]);
        assert!(plan.iter().all(|s| s.bounds == CaptureBounds::new(40.0, 0.0, 500.0, 800.0, 2.0)));
    }

    #[test]
    fn partial_last_step_still_covers_the_bottom() {
        let plan = plan_segments(&selection(0.0, 1450.0, 800.0), 150, &settings()).expect("plan");
        let offsets: Vec<i64> = plan.iter().map(|s| s.scroll_position).collect();
        assert_eq!(offsets, vec![0, 650]);

        let plan = plan_segments(&selection(0.0, 1450.5, 800.0), 150, &settings()).expect("plan");
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn short_selection_is_one_segment() {
        let plan = plan_segments(&selection(300.0, 420.0, 800.0), 150, &settings()).expect("plan");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].scroll_position, 300);
        assert_eq!(plan[0].bounds.height, 420.0);

        // overlap never matters for a single segment
        assert_eq!(plan_segments(&selection(0.0, 120.0, 800.0), 150, &settings()).expect("plan").len(), 1);
    }

    #[test]
    fn tiny_selection_is_rejected() {
        let mut narrow = selection(0.0, 600.0, 800.0);
        narrow.width = 49.0;
        assert!(matches!(
            plan_segments(&narrow, 150, &settings()),
            Err(CaptureError::InputTooSmall { .. })
        ));
    }

    #[test]
    fn overlap_must_leave_room_to_advance() {
        assert!(matches!(
            plan_segments(&selection(0.0, 2000.0, 800.0), 800, &settings()),
            Err(CaptureError::InputTooSmall { .. })
        ));
    }

    #[test]
    fn steps_below_the_minimum_scroll_delta_are_rejected() {
        assert!(matches!(
            plan_segments(&selection(0.0, 2000.0, 800.0), 760, &settings()),
            Err(CaptureError::InputTooSmall { .. })
        ));

        let plan = plan_segments(&selection(0.0, 900.0, 800.0), 750, &settings()).expect("plan");
        let offsets: Vec<i64> = plan.iter().map(|s| s.scroll_position).collect();
        assert_eq!(offsets, vec![0, 50, 100]);
    }
}
