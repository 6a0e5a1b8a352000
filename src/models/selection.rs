use serde::{Deserialize, Serialize};

/// A user-selected page region, in CSS pixels.
///
/// `top` is measured from the top of the document, `x` from the left edge
/// of the viewport. For a single-area capture only the visible part matters,
/// for a rolling capture `height` may exceed `viewport_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub x: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub viewport_height: f64,
    pub device_pixel_ratio: f64,
}

/// Case/subject tags attached to a capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseInfo {
    pub name: Option<String>,
    pub mig: Option<String>,
    pub current_subject: Option<String>,
}
