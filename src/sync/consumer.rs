//! Sample application inside the secondary frame.
//!
//! Play is attempted this tick and verified on a later one: `play()` is fire
//! and forget, and autoplay policies often reject it silently. When the
//! element is still paused after the retry delay, the frame's own play
//! control is clicked before calling `play()` again.

use crate::config::SyncConfig;
use crate::dom::MediaDom;
use crate::error::Absorb;
use crate::sync::protocol::SyncSample;

/// What the pause/resume step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayStep {
    /// Already in the requested state.
    Idle,
    Paused,
    /// `play()` called, to be verified later.
    Attempted,
    /// Still waiting for an earlier attempt to take effect.
    Waiting,
    /// Verification failed; play control clicked and `play()` retried.
    Retried { clicked: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplyOutcome {
    pub seeked: bool,
    /// False when the element is still out of tolerance after the seek.
    pub complete: bool,
    pub drift: f64,
    pub play: PlayStep,
}

#[derive(Debug, Clone)]
pub struct SyncConsumer {
    config: SyncConfig,
    play_attempt_ms: Option<f64>,
}

impl SyncConsumer {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            config: config.clone(),
            play_attempt_ms: None,
        }
    }

    /// Converge `media` on `sample`.
    ///
    /// `find_play_control` is only called when a play retry is due.
    pub fn apply<D, F>(
        &mut self,
        dom: &D,
        media: &D::Node,
        sample: &SyncSample,
        now_ms: f64,
        find_play_control: F,
    ) -> Option<ApplyOutcome>
    where
        D: MediaDom,
        F: FnOnce() -> Option<D::Node>,
    {
        let state = dom.media_state(media)?;

        dom.set_muted(media, true).absorb("mute secondary");
        if state.volume != 0.0 {
            dom.set_volume(media, 0.0).absorb("zero secondary volume");
        }

        self.apply_rate(dom, media, sample.rate);

        let drift = (state.current_time - sample.time).abs();
        let mut seeked = false;
        let mut complete = true;
        let mut drift_after = drift;

        if drift > self.config.drift_threshold_secs || sample.forced() {
            if sample.seek_back {
                dom.pause(media).absorb("pause before back seek");
                // Our own pause: resume right away, not through verification.
                self.play_attempt_ms = None;
            }
            if dom
                .set_current_time(media, sample.time)
                .absorb("sync seek")
                .is_some()
            {
                seeked = true;
                dom.dispatch_media_event(media, "timeupdate").absorb("emit timeupdate");
                dom.dispatch_media_event(media, "seeked").absorb("emit seeked");
            }

            drift_after = dom
                .media_state(media)
                .map(|after| (after.current_time - sample.time).abs())
                .unwrap_or(drift);
            complete = drift_after <= self.config.drift_threshold_secs;
            log::debug!(
                "[SYNC] seek to {:.2}s (drift {:.2}s -> {:.2}s, forced {})",
                sample.time,
                drift,
                drift_after,
                sample.forced()
            );
        }

        let play = self.apply_play_state(dom, media, sample, now_ms, find_play_control);

        Some(ApplyOutcome {
            seeked,
            complete,
            drift: drift_after,
            play,
        })
    }

    /// Match the playback rate if it differs.
    pub fn apply_rate<D: MediaDom>(&self, dom: &D, media: &D::Node, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            return;
        }
        let current = dom.media_state(media).map(|s| s.playback_rate);
        if current != Some(rate) {
            dom.set_playback_rate(media, rate).absorb("match rate");
        }
    }

    /// Forget a pending play attempt.
    pub fn reset(&mut self) {
        self.play_attempt_ms = None;
    }

    fn apply_play_state<D, F>(
        &mut self,
        dom: &D,
        media: &D::Node,
        sample: &SyncSample,
        now_ms: f64,
        find_play_control: F,
    ) -> PlayStep
    where
        D: MediaDom,
        F: FnOnce() -> Option<D::Node>,
    {
        let paused = dom.media_state(media).map(|s| s.paused).unwrap_or(true);

        if !sample.active || sample.paused {
            self.play_attempt_ms = None;
            if paused {
                return PlayStep::Idle;
            }
            dom.pause(media).absorb("pause secondary");
            return PlayStep::Paused;
        }

        if !paused {
            self.play_attempt_ms = None;
            return PlayStep::Idle;
        }

        match self.play_attempt_ms {
            None => {
                dom.play(media).absorb("play secondary");
                self.play_attempt_ms = Some(now_ms);
                PlayStep::Attempted
            }
            Some(at) if now_ms - at < self.config.play_retry_delay_ms => PlayStep::Waiting,
            Some(_) => {
                let control = find_play_control();
                if let Some(control) = &control {
                    dom.click(control);
                }
                dom.play(media).absorb("retry play secondary");
                self.play_attempt_ms = Some(now_ms);
                log::debug!("[SYNC] play retry (control clicked: {})", control.is_some());
                PlayStep::Retried {
                    clicked: control.is_some(),
                }
            }
        }
    }
}
