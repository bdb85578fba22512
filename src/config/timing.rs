//! Reconciliation timer intervals.

use serde::{Deserialize, Serialize};

/// Shortest interval any timer may be configured to.
pub const MIN_INTERVAL_MS: u32 = 50;

/// One interval per subsystem timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingConfig {
    /// Player decision re-evaluation.
    pub decision_interval_ms: u32,

    /// Ad scan on the watch page.
    pub ad_scan_interval_ms: u32,

    /// Ad scan inside ad frames, which churn faster.
    pub ad_frame_scan_interval_ms: u32,

    /// Sync sample push. Far more frequent than the state changes because
    /// the channel has no acknowledgment.
    pub sync_interval_ms: u32,

    /// Relocated control positioning.
    pub layout_interval_ms: u32,

    /// Native control visibility report (secondary frame side).
    pub controls_report_interval_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            decision_interval_ms: 1000,
            ad_scan_interval_ms: 700,
            ad_frame_scan_interval_ms: 500,
            sync_interval_ms: 250,
            layout_interval_ms: 250,
            controls_report_interval_ms: 200,
        }
    }
}

impl TimingConfig {
    pub fn validate(&mut self) {
        for interval in [
            &mut self.decision_interval_ms,
            &mut self.ad_scan_interval_ms,
            &mut self.ad_frame_scan_interval_ms,
            &mut self.sync_interval_ms,
            &mut self.layout_interval_ms,
            &mut self.controls_report_interval_ms,
        ] {
            *interval = (*interval).max(MIN_INTERVAL_MS);
        }
    }

    /// Sync interval in seconds, as used by the expected-advance estimate.
    pub fn sync_interval_secs(&self) -> f64 {
        self.sync_interval_ms as f64 / 1000.0
    }
}
