//! Drift correction and seek-intent tolerances.

use serde::{Deserialize, Serialize};

/// `HTMLMediaElement.HAVE_FUTURE_DATA`.
pub const HAVE_FUTURE_DATA: u16 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Drift above which the secondary element is seeked.
    pub drift_threshold_secs: f64,

    /// A backwards jump larger than this (while seeking) is a back-seek.
    pub seek_back_threshold_secs: f64,

    /// Margin over the expected advance that marks a forward seek.
    pub seek_forward_margin_secs: f64,

    /// How long a detected seek flag is held true.
    pub forced_window_ms: f64,

    /// Delay after a `play()` attempt before falling back to clicking the
    /// frame's own play control.
    pub play_retry_delay_ms: f64,

    /// Minimum ready state for the primary element to count as active.
    pub active_ready_state: u16,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drift_threshold_secs: 0.4,
            seek_back_threshold_secs: 0.1,
            seek_forward_margin_secs: 0.8,
            forced_window_ms: 1600.0,
            play_retry_delay_ms: 500.0,
            active_ready_state: HAVE_FUTURE_DATA,
        }
    }
}

impl SyncConfig {
    pub fn validate(&mut self) {
        self.drift_threshold_secs = self.drift_threshold_secs.clamp(0.05, 5.0);
        self.seek_back_threshold_secs = self.seek_back_threshold_secs.clamp(0.0, 5.0);
        self.seek_forward_margin_secs = self.seek_forward_margin_secs.clamp(0.0, 10.0);
        self.forced_window_ms = self.forced_window_ms.clamp(0.0, 10_000.0);
        self.play_retry_delay_ms = self.play_retry_delay_ms.clamp(0.0, 10_000.0);
        self.active_ready_state = self.active_ready_state.min(4);
    }
}
