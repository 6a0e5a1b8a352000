use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One archived screenshot with the context it was taken in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    pub id: String,
    pub url: String,
    /// PNG bytes.
    #[serde(with = "png_base64", rename = "screenshotPng")]
    pub screenshot: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Free-text post date. Filled in later by the archive UI, never here.
    pub date: Option<String>,
    pub platform: String,
    pub is_about_page: bool,
    pub captured_at: DateTime<Utc>,
    pub case_name: Option<String>,
    #[serde(rename = "caseMIG")]
    pub case_mig: Option<String>,
    pub subject_name: Option<String>,
    pub segment_count: u32,
}

/// Listing row without the screenshot blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSummary {
    pub id: String,
    pub url: String,
    pub platform: String,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    pub case_name: Option<String>,
    #[serde(rename = "caseMIG")]
    pub case_mig: Option<String>,
    pub subject_name: Option<String>,
    pub segment_count: u32,
    pub screenshot_bytes: u64,
}

mod png_base64 {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    const PREFIX: &str = "data:image/png;base64,";

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{PREFIX}{}", general_purpose::STANDARD.encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let payload = text.strip_prefix(PREFIX).unwrap_or(&text);
        general_purpose::STANDARD
            .decode(payload)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn capture() -> Capture {
        Capture {
            id: "c-1".into(),
            url: "https://www.facebook.com/p/1".into(),
            screenshot: vec![0x89, b'P', b'N', b'G', 0, 255, 7],
            width: 500,
            height: 2750,
            date: None,
            platform: "Facebook".into(),
            is_about_page: false,
            captured_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            case_name: Some("Case".into()),
            case_mig: Some("MIG-7".into()),
            subject_name: None,
            segment_count: 4,
        }
    }

    #[test]
    fn capture_json_carries_png_data_url() {
        let capture = capture();
        let json = serde_json::to_value(&capture).expect("serialize");

        let screenshot = json["screenshotPng"].as_str().expect("data url");
        assert!(screenshot.starts_with("data:image/png;base64,"));
        assert_eq!(json["caseMIG"], "MIG-7");
        assert_eq!(json["segmentCount"], 4);

        let parsed: Capture = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, capture);
    }

    #[test]
    fn bare_base64_screenshot_is_accepted() {
        let mut json = serde_json::to_value(capture()).expect("serialize");
        json["screenshotPng"] = "AAEC".into();

        let parsed: Capture = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed.screenshot, vec![0, 1, 2]);
    }
}
