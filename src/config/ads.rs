//! Ad classification and neutralization settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdConfig {
    /// Any media element under this container is an ad.
    pub container_selector: String,

    /// Media sources matching this are ads.
    pub src_pattern: String,

    /// Host of the cross-origin ad frames.
    pub frame_host_pattern: String,

    /// Path of the cross-origin ad frames.
    pub frame_path_pattern: String,

    /// Skip affordances, clicked only when actually interactive.
    pub skip_selectors: Vec<String>,

    /// Skip control the page keeps hidden; forced visible before the check.
    pub forced_skip_id: String,

    /// Playback rate applied while an ad plays.
    pub skip_playback_rate: f64,

    /// Rate tried when the browser rejects `skip_playback_rate`.
    pub fallback_playback_rate: f64,

    /// Seconds before the end an ad is jumped to.
    pub skip_tail_secs: f64,

    /// Dimming overlay opacity.
    pub overlay_alpha: f64,

    /// Class name of the dimming overlay canvas.
    pub overlay_class: String,
}

impl Default for AdConfig {
    fn default() -> Self {
        Self {
            container_selector: "#nv_watch_VideoAdContainer".into(),
            src_pattern: r"(?i)(^https?:)?//[^/]*ads\.nicovideo\.jp/|/vast/".into(),
            frame_host_pattern: r"(?i)(^|\.)ads\.nicovideo\.jp$".into(),
            frame_path_pattern: r"(?i)/vast/script/simid/video/".into(),
            skip_selectors: vec![
                "#request_skip".into(),
                ".videoAdUiSkipButton".into(),
                ".videoAdUiSkipContainer button".into(),
                r#"button[aria-label*="Skip" i]"#.into(),
                r#"button[id*="skip" i]"#.into(),
                r#"[role="button"][aria-label*="Skip" i]"#.into(),
            ],
            forced_skip_id: "request_skip".into(),
            skip_playback_rate: 2048.0,
            fallback_playback_rate: 16.0,
            skip_tail_secs: 0.1,
            overlay_alpha: 0.45,
            overlay_class: "ad-dim-overlay-canvas".into(),
        }
    }
}

impl AdConfig {
    pub fn validate(&mut self) {
        self.skip_playback_rate = self.skip_playback_rate.max(1.0);
        self.fallback_playback_rate = self.fallback_playback_rate.clamp(1.0, 16.0);
        self.skip_tail_secs = self.skip_tail_secs.clamp(0.0, 1.0);
        self.overlay_alpha = self.overlay_alpha.clamp(0.0, 1.0);
    }

    /// CSS fill color of the overlay.
    pub fn overlay_fill(&self) -> String {
        format!("rgba(0, 0, 0, {})", self.overlay_alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_fill() {
        let config = AdConfig::default();
        assert_eq!(config.overlay_fill(), "rgba(0, 0, 0, 0.45)");
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = AdConfig {
            overlay_alpha: 3.0,
            fallback_playback_rate: 100.0,
            ..Default::default()
        };
        config.validate();
        assert!((config.overlay_alpha - 1.0).abs() < f64::EPSILON);
        assert!((config.fallback_playback_rate - 16.0).abs() < f64::EPSILON);
    }
}
