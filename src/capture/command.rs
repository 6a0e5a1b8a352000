use serde::{Deserialize, Serialize};

use crate::pipeline::{RollingCaptureRequest, SelectionCaptureRequest};

/// Messages the selection UI sends to the capture controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum CaptureCommand {
    StartRollingCapture(RollingCaptureRequest),
    CaptureSelection(SelectionCaptureRequest),
    Cancel,
}

impl CaptureCommand {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureCommand::StartRollingCapture(_) => "startRollingCapture",
            CaptureCommand::CaptureSelection(_) => "captureSelection",
            CaptureCommand::Cancel => "cancel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_ui_messages() {
        let json = r#"{
            "action": "startRollingCapture",
            "payload": {
                "url": "https://www.facebook.com/p/1",
                "segments": [
                    {"scrollPosition": 0, "bounds": {"x": 0, "y": 0, "width": 500, "height": 800}},
                    {"scrollPosition": 650, "bounds": {"x": 0, "y": 0, "width": 500, "height": 800, "devicePixelRatio": 2}}
                ],
                "overlapPx": 120
            }
        }"#;

        let command: CaptureCommand = serde_json::from_str(json).expect("parse");
        let CaptureCommand::StartRollingCapture(request) = &command else {
            panic!("wrong command {command:?}");
        };
        assert_eq!(command.name(), "startRollingCapture");
        assert_eq!(request.segments.len(), 2);
        assert_eq!(request.segments[0].bounds.device_pixel_ratio, 1.0);
        assert_eq!(request.segments[1].bounds.dpr(), 2.0);
        assert_eq!(request.overlap_px, Some(120));
        assert!(request.case.is_none());

        let cancel: CaptureCommand = serde_json::from_str(r#"{"action": "cancel"}"#).expect("parse");
        assert_eq!(cancel, CaptureCommand::Cancel);
    }
}
