//! The single owner of all agent state.
//!
//! Every entry point is a scheduler boundary: a timer firing, a mutation
//! batch, a message, a media event or page hide. Each runs to completion
//! and absorbs its own failures, so a caller never sees an error from a
//! tick.

use regex::Regex;

use super::role::AgentRole;
use super::schedule::{schedule, TimerKind};
use crate::ads::{AdSentinel, ScanMode, SkipClicker};
use crate::config::AgentConfig;
use crate::decision::{self, Decision};
use crate::dom::Page;
use crate::error::{Absorb, AgentResult};
use crate::frame::SecondaryFrame;
use crate::label::{AttributeLabelLocator, LabelLocator};
use crate::locale::LocaleResolver;
use crate::metrics::{self, MetricsClassifier};
use crate::relocate::{ControlRelocator, ControlsReporter};
use crate::session::{SessionTracker, WatchSession};
use crate::sync::{FrameMessage, OriginAllowList, SyncConsumer, SyncProducer, SyncSample};

pub struct Reconciler<P: Page, L: LabelLocator = AttributeLabelLocator> {
    page: P,
    config: AgentConfig,
    role: AgentRole,
    locator: L,
    sessions: SessionTracker,
    metrics: MetricsClassifier,
    locale: LocaleResolver,
    sentinel: AdSentinel<P::Node>,
    skip: SkipClicker,
    frame: SecondaryFrame<P::Node>,
    producer: SyncProducer,
    consumer: SyncConsumer,
    relocator: ControlRelocator<P::Node>,
    reporter: ControlsReporter,
    /// Origins the secondary frame accepts `sync`/`rate` from.
    host_origins: OriginAllowList,
    /// Origins the watch page accepts `controls` from.
    secondary_origins: OriginAllowList,
    play_pattern: Regex,
    torn_down: bool,
}

impl<P: Page> Reconciler<P> {
    /// Build a reconciler for whatever part of the site `page` is. `None`
    /// when the location is not one the agent handles.
    pub fn for_page(page: P, config: AgentConfig) -> AgentResult<Option<Self>> {
        let Some(role) = AgentRole::detect(&page.location(), &config)? else {
            return Ok(None);
        };
        Self::with_role(page, config, role, AttributeLabelLocator::default()).map(Some)
    }
}

impl<P: Page, L: LabelLocator> Reconciler<P, L> {
    pub fn with_role(page: P, config: AgentConfig, role: AgentRole, locator: L) -> AgentResult<Self> {
        let decision = &config.decision;
        let reconciler = Self {
            sessions: SessionTracker::new(&config.frame.watch_path_pattern)?,
            metrics: MetricsClassifier::new(decision.metrics_ttl_ms),
            locale: LocaleResolver::new(decision.locale_ttl_ms, &decision.regional_locale_pattern)?,
            sentinel: AdSentinel::new(&config.ads)?,
            skip: SkipClicker::new(&config.ads),
            frame: SecondaryFrame::new(&config.frame),
            producer: SyncProducer::new(&config.sync, config.timing.sync_interval_secs()),
            consumer: SyncConsumer::new(&config.sync),
            relocator: ControlRelocator::new(&config.frame)?,
            reporter: ControlsReporter::new(&config.frame),
            host_origins: OriginAllowList::new(&config.frame.host_origins),
            secondary_origins: OriginAllowList::new([&config.frame.secondary_origin]),
            play_pattern: Regex::new(&config.frame.play_label_pattern)?,
            torn_down: false,
            page,
            config,
            role,
            locator,
        };
        log::info!("[LOOP] agent ready as {:?}", role);
        Ok(reconciler)
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&WatchSession> {
        self.sessions.current()
    }

    pub fn decision(&self) -> Decision {
        self.session()
            .map(|session| session.decision)
            .unwrap_or(Decision::Unknown)
    }

    pub fn secondary_frame(&self) -> Option<&P::Node> {
        self.frame.current()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Timers the driver must register for this role.
    pub fn timers(&self) -> Vec<(TimerKind, u32)> {
        schedule(self.role, &self.config.timing)
    }

    /// Run every timer of the role once, as soon as the document is ready.
    pub fn on_start(&mut self) {
        for (kind, _) in self.timers() {
            self.on_timer(kind);
        }
    }

    pub fn on_timer(&mut self, kind: TimerKind) {
        if self.torn_down {
            return;
        }
        match kind {
            TimerKind::Decision => self.decision_tick(),
            TimerKind::AdScan => self.ad_tick(),
            TimerKind::Sync => self.sync_tick(),
            TimerKind::Layout => self.layout_tick(),
            TimerKind::ControlsReport => self.controls_tick(),
        }
    }

    /// A mutation batch was delivered.
    pub fn on_mutation(&mut self) {
        if self.torn_down {
            return;
        }
        match self.role {
            AgentRole::Watch => {
                self.decision_tick();
                self.ad_tick();
                self.layout_tick();
            }
            AgentRole::Secondary | AgentRole::AdFrame => self.ad_tick(),
        }
    }

    /// A `message` event carrying a JSON string.
    pub fn on_message(&mut self, origin: &str, data: &str) {
        if self.torn_down || !self.accepts_origin(origin) {
            return;
        }
        match FrameMessage::from_json(data) {
            Ok(message) => self.dispatch(message),
            Err(err) => log::debug!("[SYNC] dropped message from {}: {}", origin, err),
        }
    }

    /// A `message` event whose payload was already decoded.
    pub fn on_frame_message(&mut self, origin: &str, message: FrameMessage) {
        if self.torn_down || !self.accepts_origin(origin) {
            return;
        }
        match message.validate() {
            Ok(()) => self.dispatch(message),
            Err(err) => log::debug!("[SYNC] dropped message from {}: {}", origin, err),
        }
    }

    /// The primary element fired `ratechange`.
    pub fn on_primary_rate_change(&mut self) {
        if self.torn_down || self.role != AgentRole::Watch {
            return;
        }
        let Some(frame) = self.frame.current().cloned() else {
            return;
        };
        let Some(state) = self
            .primary_media()
            .and_then(|media| self.page.media_state(&media))
        else {
            return;
        };
        let message = FrameMessage::Rate {
            rate: state.playback_rate,
        };
        if message.validate().is_ok() {
            self.page
                .post_to_frame(&frame, &message, &self.config.frame.secondary_origin)
                .absorb("post rate");
        }
    }

    /// Page hide: restore what the agent changed and ignore everything after.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.relocator.teardown(&self.page);
        self.sentinel.clear(&self.page);
        if self.role == AgentRole::Watch {
            self.frame.remove(&self.page);
        }
        self.sessions.end();
        log::info!("[LOOP] torn down");
    }

    fn accepts_origin(&self, origin: &str) -> bool {
        let allowed = match self.role {
            AgentRole::Watch => &self.secondary_origins,
            AgentRole::Secondary => &self.host_origins,
            AgentRole::AdFrame => return false,
        };
        match allowed.check(origin) {
            Ok(()) => true,
            Err(err) => {
                log::debug!("[SYNC] {}", err);
                false
            }
        }
    }

    fn dispatch(&mut self, message: FrameMessage) {
        match (self.role, message) {
            (AgentRole::Watch, FrameMessage::Controls(report)) => {
                self.relocator.apply_controls(&self.page, report);
            }
            (AgentRole::Secondary, FrameMessage::Sync(sample)) => self.apply_sync(&sample),
            (AgentRole::Secondary, FrameMessage::Rate { rate }) => {
                if let Some(media) = self.secondary_media() {
                    self.consumer.apply_rate(&self.page, &media, rate);
                }
            }
            (role, message) => {
                log::debug!("[SYNC] {:?} ignores `{}` message", role, message.kind());
            }
        }
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    fn decision_tick(&mut self) {
        if self.role != AgentRole::Watch {
            return;
        }

        let location = self.page.location();
        let change = self.sessions.observe(&location.path);
        if change.resets() {
            log::info!("[DECISION] session change: {:?}", change);
            self.metrics.invalidate();
            self.locale.invalidate();
            self.producer.reset();
            self.relocator.teardown(&self.page);
        }

        let now = self.page.now_ms();
        let page = &self.page;
        let decision_config = &self.config.decision;

        let Some(session) = self.sessions.current_mut() else {
            self.frame.remove(page);
            return;
        };

        let snapshot = self
            .metrics
            .read(now, || metrics::extract(page, decision_config))
            .clone();
        let locale = self.locale.read(now, || page.locale_hints()).clone();
        let regional = self.locale.snapshot_is_regional(&locale);
        let status = snapshot.status;
        session.metrics = Some(snapshot);
        session.locale = Some(locale);

        decision::evaluate(session, status, regional);

        if session.decision == Decision::Secondary {
            let watch_id = session.watch_id.clone();
            let before = self.frame.current().cloned();
            if let Some(frame) = self.frame.ensure(page, &watch_id).absorb("secondary frame") {
                if before.as_ref() != Some(&frame) {
                    // New frame document: anything captured from the old one is gone.
                    self.relocator.teardown(page);
                    self.producer.reset();
                }
            }
        } else {
            self.relocator.teardown(page);
            self.frame.remove(page);
        }
    }

    fn ad_tick(&mut self) {
        match self.role {
            AgentRole::Watch | AgentRole::Secondary => {
                self.sentinel.scan(&self.page, ScanMode::Watch);
                if self.sentinel.ad_container_present(&self.page) {
                    self.skip.click_skip_buttons(&self.page);
                }
            }
            AgentRole::AdFrame => {
                self.skip.click_skip_buttons(&self.page);
                self.sentinel.scan(&self.page, ScanMode::AdFrame);
            }
        }
    }

    fn sync_tick(&mut self) {
        if self.role != AgentRole::Watch {
            return;
        }
        let Some(frame) = self.frame.current().cloned() else {
            return;
        };
        let Some(media) = self.primary_media() else {
            return;
        };
        let Some(state) = self.page.media_state(&media) else {
            return;
        };

        let is_ad = self.sentinel.is_ad(&self.page, &media);
        let sample = self.producer.sample(self.page.now_ms(), &state, is_ad);
        self.page
            .post_to_frame(
                &frame,
                &FrameMessage::Sync(sample),
                &self.config.frame.secondary_origin,
            )
            .absorb("post sync");
    }

    fn layout_tick(&mut self) {
        if self.role != AgentRole::Watch {
            return;
        }
        let Some(frame) = self.frame.current().cloned() else {
            return;
        };
        let Some(host) = self.page.parent(&frame) else {
            return;
        };
        self.relocator
            .reconcile(&self.page, &self.locator, &frame, &host);
    }

    fn controls_tick(&mut self) {
        if self.role != AgentRole::Secondary {
            return;
        }
        let now = self.page.now_ms();
        if let Some(report) = self.reporter.poll(&self.page, now) {
            // Receivers check the origin; the embedding page is not known here.
            self.page
                .post_to_parent(&FrameMessage::Controls(report), "*")
                .absorb("post controls");
        }
    }

    fn apply_sync(&mut self, sample: &SyncSample) {
        let Some(media) = self.secondary_media() else {
            return;
        };
        let now = self.page.now_ms();
        let page = &self.page;
        let locator = &self.locator;
        let play_pattern = &self.play_pattern;

        let outcome = self.consumer.apply(page, &media, sample, now, || {
            locator.find_by_label_pattern(page, play_pattern, &page.document_root())
        });
        if let Some(outcome) = outcome {
            if !outcome.complete {
                log::debug!("[SYNC] still {:.2}s off after seek", outcome.drift);
            }
        }
    }

    // ------------------------------------------------------------------
    // Media lookup
    // ------------------------------------------------------------------

    /// The content element of the native player; an ad element only when
    /// nothing else is present.
    fn primary_media(&self) -> Option<P::Node> {
        let videos = match self.page.query(&self.config.frame.player_host_selector) {
            Some(host) => self.page.query_all_in(&host, "video"),
            None => self.page.query_all("video"),
        };
        videos
            .iter()
            .find(|video| !self.sentinel.is_ad(&self.page, video))
            .cloned()
            .or_else(|| videos.into_iter().next())
    }

    fn secondary_media(&self) -> Option<P::Node> {
        self.page
            .query_all("video")
            .into_iter()
            .find(|video| !self.sentinel.is_ad(&self.page, video))
    }
}
