//! Per media element ad state machine.
//!
//! ```text
//!            classified ad: snapshot (rate, muted), then skip every tick
//!  Content ─────────────────────────────────────────────────────────▶ Ad
//!     ▲                                                               │
//!     └───────────── classified content: restore (rate, muted) once ──┘
//! ```
//!
//! Classification is redone on every scan and never cached. Skipping means
//! mute, a very large playback rate (the duration is often unknown when an
//! ad starts, so a seek alone is not enough), a jump to the end when the end
//! is known, and resuming playback.

use std::collections::HashSet;

use regex::Regex;

use super::overlay::{reconcile_overlay, OverlayCanvas};
use super::table::ElementTable;
use crate::config::AdConfig;
use crate::dom::{MediaDom, NodeKey, PageDom};
use crate::error::{Absorb, AgentResult};

/// Saved transport state of one media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdState {
    pub is_ad: bool,
    pub saved_rate: f64,
    pub saved_muted: bool,
}

impl Default for AdState {
    fn default() -> Self {
        Self {
            is_ad: false,
            saved_rate: 1.0,
            saved_muted: false,
        }
    }
}

/// How a scan treats the media elements it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Watch page: classify each element, run the state machine.
    Watch,
    /// Inside an ad frame: every element is an ad; only dim it.
    AdFrame,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub media: usize,
    pub ads: usize,
    pub entered: usize,
    pub left: usize,
}

pub struct AdSentinel<N> {
    config: AdConfig,
    src_pattern: Regex,
    states: ElementTable<AdState>,
    overlays: ElementTable<OverlayCanvas<N>>,
}

impl<N: Clone + PartialEq> AdSentinel<N> {
    pub fn new(config: &AdConfig) -> AgentResult<Self> {
        Ok(Self {
            config: config.clone(),
            src_pattern: Regex::new(&config.src_pattern)?,
            states: ElementTable::new(),
            overlays: ElementTable::new(),
        })
    }

    /// Whether `media` is currently playing an ad.
    pub fn is_ad<D: MediaDom<Node = N>>(&self, dom: &D, media: &N) -> bool {
        if dom.closest(media, &self.config.container_selector).is_some() {
            return true;
        }
        let titled_ad = dom
            .attribute(media, "title")
            .map(|title| title.trim().eq_ignore_ascii_case("advertisement"))
            .unwrap_or(false);
        if titled_ad {
            return true;
        }
        dom.media_state(media)
            .map(|state| self.src_pattern.is_match(&state.current_src))
            .unwrap_or(false)
    }

    /// Whether the page currently shows the ad container.
    pub fn ad_container_present<D: PageDom<Node = N>>(&self, dom: &D) -> bool {
        dom.query(&self.config.container_selector).is_some()
    }

    /// Reconcile every media element in the document.
    pub fn scan<D: MediaDom<Node = N>>(&mut self, dom: &D, mode: ScanMode) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen = HashSet::new();

        for media in dom.query_all("video") {
            let key = dom.node_key(&media);
            seen.insert(key);
            report.media += 1;

            let is_ad = match mode {
                ScanMode::Watch => self.is_ad(dom, &media),
                ScanMode::AdFrame => true,
            };
            if is_ad {
                report.ads += 1;
            }

            if mode == ScanMode::Watch {
                match self.reconcile_state(dom, key, &media, is_ad) {
                    Transition::Entered => report.entered += 1,
                    Transition::Left => report.left += 1,
                    Transition::None => {}
                }
            }

            let existing = self.overlays.remove(key);
            if let Some(overlay) = reconcile_overlay(dom, &media, is_ad, existing, &self.config) {
                self.overlays.insert(key, overlay);
            }
        }

        self.states.sweep(&seen);
        for overlay in self.overlays.sweep(&seen) {
            overlay.release(dom);
        }
        report
    }

    /// Restore every element still in an ad, remove every overlay and
    /// forget all state.
    pub fn clear<D: MediaDom<Node = N>>(&mut self, dom: &D) {
        for media in dom.query_all("video") {
            let key = dom.node_key(&media);
            if let Some(state) = self.states.remove(key).filter(|state| state.is_ad) {
                restore(dom, &media, &state);
            }
        }
        for overlay in self.overlays.drain() {
            overlay.release(dom);
        }
        self.states.drain();
    }

    pub fn state(&self, key: NodeKey) -> Option<&AdState> {
        self.states.get(key)
    }

    pub fn overlay(&self, key: NodeKey) -> Option<&OverlayCanvas<N>> {
        self.overlays.get(key)
    }

    fn reconcile_state<D: MediaDom<Node = N>>(
        &mut self,
        dom: &D,
        key: NodeKey,
        media: &N,
        is_ad: bool,
    ) -> Transition {
        let state = self.states.get_or_insert_with(key, AdState::default);

        if is_ad {
            let mut transition = Transition::None;
            if !state.is_ad {
                let current = dom.media_state(media).unwrap_or_default();
                state.is_ad = true;
                state.saved_rate = if current.playback_rate.is_finite() {
                    current.playback_rate
                } else {
                    1.0
                };
                state.saved_muted = current.muted;
                log::info!(
                    "[AD] ad started (saved rate {}, muted {})",
                    state.saved_rate,
                    state.saved_muted
                );
                transition = Transition::Entered;
            }
            skip_ad(dom, media, &self.config);
            return transition;
        }

        if state.is_ad {
            restore(dom, media, state);
            state.is_ad = false;
            return Transition::Left;
        }

        Transition::None
    }
}

enum Transition {
    None,
    Entered,
    Left,
}

/// Put back the rate and mute flag saved when the ad started.
fn restore<D: MediaDom>(dom: &D, media: &D::Node, state: &AdState) {
    let rate = if state.saved_rate.is_finite() {
        state.saved_rate
    } else {
        1.0
    };
    dom.set_playback_rate(media, rate).absorb("restore rate");
    dom.set_muted(media, state.saved_muted).absorb("restore mute");
    log::info!("[AD] ad finished, restored rate {} muted {}", rate, state.saved_muted);
}

/// Force an ad toward its end. Every step is absorbed on its own so a
/// rejected rate change does not prevent the seek.
fn skip_ad<D: MediaDom>(dom: &D, media: &D::Node, config: &AdConfig) {
    dom.set_muted(media, true).absorb("mute ad");

    let current_rate = dom.media_state(media).map(|s| s.playback_rate);
    if current_rate != Some(config.skip_playback_rate)
        && current_rate != Some(config.fallback_playback_rate)
        && dom.set_playback_rate(media, config.skip_playback_rate).is_err()
    {
        dom.set_playback_rate(media, config.fallback_playback_rate)
            .absorb("ad fallback rate");
    }

    let Some(state) = dom.media_state(media) else {
        return;
    };

    if state.duration.is_finite() && state.duration > 0.0 {
        let target = (state.duration - config.skip_tail_secs).max(0.0);
        if state.current_time < target {
            dom.set_current_time(media, target).absorb("seek ad to end");
        }
    } else if let Some(end) = state.seekable_end.filter(|end| end.is_finite()) {
        if state.current_time < end {
            dom.set_current_time(media, end).absorb("seek ad to seekable end");
        }
    }

    if state.paused {
        dom.play(media).absorb("resume ad");
    }
}
