use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::assembler::platform_from_url;
use crate::models::CaseInfo;

/// Everything one capture run needs to know about where it came from.
///
/// Created when a run starts and dropped when it ends, so nothing (case tags
/// in particular) leaks into the next run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub url: String,
    pub platform: String,
    pub case: CaseInfo,
    /// Run-level overlap in CSS px.
    pub overlap_px: u32,
    cancel_token: CancellationToken,
}

impl RunContext {
    pub fn new(
        url: impl Into<String>,
        platform: Option<String>,
        case: Option<CaseInfo>,
        overlap_px: u32,
        cancel_token: CancellationToken,
    ) -> Self {
        let url = url.into();
        let platform = platform
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| platform_from_url(&url));
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            url,
            platform,
            case: case.unwrap_or_default(),
            overlap_px,
            cancel_token,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_is_derived_when_missing() {
        let ctx = RunContext::new(
            "https://www.instagram.com/p/abc",
            None,
            None,
            150,
            CancellationToken::new(),
        );
        assert_eq!(ctx.platform, "Instagram");
        assert_eq!(ctx.case, CaseInfo::default());
    }

    #[test]
    fn explicit_platform_wins() {
        let ctx = RunContext::new(
            "https://m.facebook.com/story",
            Some("Facebook Groups".into()),
            None,
            150,
            CancellationToken::new(),
        );
        assert_eq!(ctx.platform, "Facebook Groups");
    }

    #[test]
    fn each_run_gets_its_own_id() {
        let token = CancellationToken::new();
        let a = RunContext::new("https://x.com", None, None, 150, token.clone());
        let b = RunContext::new("https://x.com", None, None, 150, token);
        assert_ne!(a.run_id, b.run_id);
    }
}
