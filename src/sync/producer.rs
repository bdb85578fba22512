//! Sample production beside the primary element.
//!
//! Seek intent is inferred from the change in `currentTime` between ticks,
//! gated by the element's own `seeking` flag because buffering stalls can
//! produce the same deltas. A detected flag is held for the forced-correction
//! window so the receiver still sees it while its own seek is in flight.

use crate::config::SyncConfig;
use crate::dom::MediaState;
use crate::sync::protocol::SyncSample;

#[derive(Debug, Clone)]
pub struct SyncProducer {
    config: SyncConfig,
    interval_secs: f64,
    last_time: Option<f64>,
    seek_back_until_ms: Option<f64>,
    seek_forward_until_ms: Option<f64>,
}

impl SyncProducer {
    pub fn new(config: &SyncConfig, interval_secs: f64) -> Self {
        Self {
            config: config.clone(),
            interval_secs,
            last_time: None,
            seek_back_until_ms: None,
            seek_forward_until_ms: None,
        }
    }

    /// Build the sample for this tick.
    pub fn sample(&mut self, now_ms: f64, state: &MediaState, is_ad: bool) -> SyncSample {
        let time = if state.current_time.is_finite() {
            state.current_time.max(0.0)
        } else {
            0.0
        };
        let rate = if state.playback_rate.is_finite() && state.playback_rate > 0.0 {
            state.playback_rate
        } else {
            1.0
        };

        if let Some(last) = self.last_time {
            let dt = time - last;
            let expected_advance = rate * self.interval_secs;
            if state.seeking && dt < -self.config.seek_back_threshold_secs {
                log::debug!("[SYNC] seek back detected ({:.2}s)", dt);
                self.seek_back_until_ms = Some(now_ms + self.config.forced_window_ms);
            }
            if state.seeking && dt > expected_advance + self.config.seek_forward_margin_secs {
                log::debug!("[SYNC] seek forward detected ({:.2}s)", dt);
                self.seek_forward_until_ms = Some(now_ms + self.config.forced_window_ms);
            }
        }
        self.last_time = Some(time);

        SyncSample {
            time,
            rate,
            paused: state.paused || state.ended || state.seeking,
            active: !is_ad && state.ready_state >= self.config.active_ready_state,
            seeking: state.seeking,
            seek_back: held(&mut self.seek_back_until_ms, now_ms),
            seek_forward: held(&mut self.seek_forward_until_ms, now_ms),
        }
    }

    /// Forget the previous tick, e.g. after navigating to another video.
    pub fn reset(&mut self) {
        self.last_time = None;
        self.seek_back_until_ms = None;
        self.seek_forward_until_ms = None;
    }
}

/// Whether a hold window is still open; clears it on expiry.
fn held(until_ms: &mut Option<f64>, now_ms: f64) -> bool {
    match *until_ms {
        Some(until) if now_ms < until => true,
        Some(_) => {
            *until_ms = None;
            false
        }
        None => false,
    }
}
