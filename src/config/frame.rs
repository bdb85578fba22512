//! Secondary frame location, origin allow-lists and control labels.

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the (URL-encoded) watch id in `embed_url_template`.
pub const WATCH_ID_PLACEHOLDER: &str = "{watchId}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameConfig {
    /// Captures the watch id from the page path.
    pub watch_path_pattern: String,

    /// Host of the secondary player frame.
    pub secondary_host_pattern: String,

    /// Embed URL of the secondary player.
    pub embed_url_template: String,

    /// Origin the host sends `sync`/`rate` to, and accepts `controls` from.
    pub secondary_origin: String,

    /// Origins the secondary frame accepts `sync`/`rate` from.
    pub host_origins: Vec<String>,

    /// Element the secondary frame is laid over.
    pub player_host_selector: String,

    /// Marker class of the agent's frame.
    pub frame_class: String,

    /// Marker class of the relocated control container.
    pub control_container_class: String,

    /// Label pattern of the secondary player's settings control.
    pub settings_label_pattern: String,

    /// Label pattern of the secondary player's fullscreen control.
    pub fullscreen_label_pattern: String,

    /// Label pattern of the secondary player's play control.
    pub play_label_pattern: String,

    /// Native control bar of the secondary player.
    pub controls_bar_selector: String,

    /// Horizontal gap between the relocated settings control and fullscreen.
    pub control_gap_px: f64,

    /// Re-send an unchanged controls report after this long.
    pub controls_refresh_ms: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            watch_path_pattern: r"^/watch/([A-Za-z0-9_]+)".into(),
            secondary_host_pattern: r"(?i)^embed\.nicovideo\.jp$".into(),
            embed_url_template: format!("https://embed.nicovideo.jp/watch/{WATCH_ID_PLACEHOLDER}"),
            secondary_origin: "https://embed.nicovideo.jp".into(),
            host_origins: vec![
                "https://www.nicovideo.jp".into(),
                "https://nicovideo.jp".into(),
            ],
            player_host_selector: r#"[data-name="player"]"#.into(),
            frame_class: "nicofix-secondary-frame".into(),
            control_container_class: "nicofix-control-anchor".into(),
            settings_label_pattern: r"(?i)設定|settings".into(),
            fullscreen_label_pattern: r"(?i)全画面|full\s*screen".into(),
            play_label_pattern: r"(?i)^(再生|play)$".into(),
            controls_bar_selector: r#"[class*="Controller"]"#.into(),
            control_gap_px: 8.0,
            controls_refresh_ms: 2000.0,
        }
    }
}

impl FrameConfig {
    pub fn validate(&mut self) {
        self.control_gap_px = self.control_gap_px.clamp(0.0, 200.0);
        self.controls_refresh_ms = self.controls_refresh_ms.clamp(100.0, 60_000.0);
    }

    /// Embed URL for a watch id.
    pub fn embed_url(&self, watch_id: &str) -> String {
        self.embed_url_template
            .replace(WATCH_ID_PLACEHOLDER, &urlencoding::encode(watch_id))
    }
}
