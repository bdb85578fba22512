//! Timer table per agent role.

use serde::Serialize;

use super::role::AgentRole;
use crate::config::TimingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerKind {
    Decision,
    AdScan,
    Sync,
    Layout,
    ControlsReport,
}

/// Timers to register at startup, with their period in milliseconds.
pub fn schedule(role: AgentRole, timing: &TimingConfig) -> Vec<(TimerKind, u32)> {
    match role {
        AgentRole::Watch => vec![
            (TimerKind::Decision, timing.decision_interval_ms),
            (TimerKind::AdScan, timing.ad_scan_interval_ms),
            (TimerKind::Sync, timing.sync_interval_ms),
            (TimerKind::Layout, timing.layout_interval_ms),
        ],
        AgentRole::Secondary => vec![
            (TimerKind::AdScan, timing.ad_scan_interval_ms),
            (TimerKind::ControlsReport, timing.controls_report_interval_ms),
        ],
        AgentRole::AdFrame => vec![(TimerKind::AdScan, timing.ad_frame_scan_interval_ms)],
    }
}
