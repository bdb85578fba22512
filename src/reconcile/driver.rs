//! Native driver for the reconciler.
//!
//! Runs on a single task: timers, page events and cancellation are awaited
//! in one `select!`, so exactly one tick executes at a time and nothing
//! suspends in the middle of a tick. The browser adapter wires the same
//! entry points to DOM callbacks instead.

use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::reconciler::Reconciler;
use super::schedule::TimerKind;
use crate::dom::Page;
use crate::label::{AttributeLabelLocator, LabelLocator};

/// Something the page reported between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Mutation,
    Message { origin: String, data: String },
    PrimaryRateChange,
    /// The page is going away; tear down and stop.
    Hide,
}

#[derive(Default)]
struct Timers {
    decision: Option<Interval>,
    ad_scan: Option<Interval>,
    sync: Option<Interval>,
    layout: Option<Interval>,
    controls: Option<Interval>,
}

impl Timers {
    fn register(schedule: &[(TimerKind, u32)]) -> Self {
        let mut timers = Timers::default();
        let now = Instant::now();
        for &(kind, period_ms) in schedule {
            let period = Duration::from_millis(u64::from(period_ms.max(1)));
            let mut interval = interval_at(now + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let slot = match kind {
                TimerKind::Decision => &mut timers.decision,
                TimerKind::AdScan => &mut timers.ad_scan,
                TimerKind::Sync => &mut timers.sync,
                TimerKind::Layout => &mut timers.layout,
                TimerKind::ControlsReport => &mut timers.controls,
            };
            *slot = Some(interval);
        }
        timers
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

pub struct AgentDriver<P: Page, L: LabelLocator = AttributeLabelLocator> {
    reconciler: Reconciler<P, L>,
    events: mpsc::UnboundedReceiver<PageEvent>,
    cancel: CancellationToken,
}

impl<P: Page, L: LabelLocator> AgentDriver<P, L> {
    pub fn new(
        reconciler: Reconciler<P, L>,
        events: mpsc::UnboundedReceiver<PageEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            reconciler,
            events,
            cancel,
        }
    }

    /// Run until cancelled, hidden, or the event channel closes. The
    /// reconciler is torn down and handed back.
    pub async fn run(mut self) -> Reconciler<P, L> {
        let mut timers = Timers::register(&self.reconciler.timers());
        self.reconciler.on_start();

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    log::info!("[LOOP] cancelled");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(PageEvent::Mutation) => self.reconciler.on_mutation(),
                    Some(PageEvent::Message { origin, data }) => {
                        self.reconciler.on_message(&origin, &data)
                    }
                    Some(PageEvent::PrimaryRateChange) => self.reconciler.on_primary_rate_change(),
                    Some(PageEvent::Hide) | None => break,
                },
                _ = tick(&mut timers.decision) => self.reconciler.on_timer(TimerKind::Decision),
                _ = tick(&mut timers.ad_scan) => self.reconciler.on_timer(TimerKind::AdScan),
                _ = tick(&mut timers.sync) => self.reconciler.on_timer(TimerKind::Sync),
                _ = tick(&mut timers.layout) => self.reconciler.on_timer(TimerKind::Layout),
                _ = tick(&mut timers.controls) => self.reconciler.on_timer(TimerKind::ControlsReport),
            }
        }

        self.reconciler.teardown();
        self.reconciler
    }
}
