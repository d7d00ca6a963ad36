use chrono::{DateTime, TimeZone, Utc};
use log::{warn, Level};
use serde::Deserialize;

use crate::dom;
use crate::error::PageResult;

/// 2025-11-22T10:00:00Z
const LAUNCH_AT_SECS: i64 = 1_763_805_600;

const CONFIG_ELEMENT_ID: &str = "site-config";

#[cfg(debug_assertions)]
pub fn log_level() -> Level {
    Level::Debug
}

#[cfg(not(debug_assertions))]
pub fn log_level() -> Level {
    Level::Info
}

/// Page settings. Every field can be overridden from a JSON block:
///
/// ```html
/// <script type="application/json" id="site-config">
///   { "launch_at": "2026-01-01T09:00:00Z", "compact_breakpoint_px": 600 }
/// </script>
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub launch_at: DateTime<Utc>,
    pub consent_key: String,
    pub measurement_id: String,
    pub compact_breakpoint_px: f64,
    pub banner_reveal_delay_ms: u32,
    pub banner_hide_delay_ms: u32,
    pub info_toast_ms: u32,
    pub error_toast_ms: u32,
    pub toast_fade_ms: u32,
    pub widget_ready_timeout_ms: u32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            launch_at: Utc.timestamp_opt(LAUNCH_AT_SECS, 0).single().unwrap_or_default(),
            consent_key: "pawtrack_cookie_consent".to_string(),
            measurement_id: "G-XT881QNV2H".to_string(),
            compact_breakpoint_px: 768.0,
            banner_reveal_delay_ms: 2000,
            banner_hide_delay_ms: 300,
            info_toast_ms: 60_000,
            error_toast_ms: 10_000,
            toast_fade_ms: 500,
            widget_ready_timeout_ms: 3000,
        }
    }
}

impl SiteConfig {
    pub fn from_json(raw: &str) -> PageResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads the optional `#site-config` block, falling back to defaults.
    pub fn load() -> Self {
        let raw = dom::by_id::<web_sys::Element>(CONFIG_ELEMENT_ID).and_then(|el| el.text_content());
        match raw {
            Some(raw) if !raw.trim().is_empty() => Self::from_json(&raw).unwrap_or_else(|e| {
                warn!("Ignoring #{}: {}", CONFIG_ELEMENT_ID, e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn launch_at_ms(&self) -> i64 {
        self.launch_at.timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_launch_is_november_22nd() {
        let config = SiteConfig::default();
        assert_eq!(config.launch_at.to_rfc3339(), "2025-11-22T10:00:00+00:00");
        assert_eq!(config.launch_at_ms(), LAUNCH_AT_SECS * 1000);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = SiteConfig::from_json(
            r#"{ "launch_at": "2026-01-01T09:00:00Z", "compact_breakpoint_px": 600 }"#,
        )
        .unwrap();
        assert_eq!(config.launch_at.to_rfc3339(), "2026-01-01T09:00:00+00:00");
        assert_eq!(config.compact_breakpoint_px, 600.0);
        assert_eq!(config.consent_key, "pawtrack_cookie_consent");
        assert_eq!(config.error_toast_ms, 10_000);
    }

    #[test]
    fn malformed_override_is_an_error() {
        assert!(SiteConfig::from_json("{ not json").is_err());
        assert!(SiteConfig::from_json(r#"{ "launch_at": "tomorrow" }"#).is_err());
    }
}
