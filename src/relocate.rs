//! Settings control relocation out of the secondary frame.
//!
//! The secondary frame hides its own control chrome, so its settings control
//! is moved into an overlay container owned by the host page and positioned
//! next to the frame's fullscreen control on every layout tick. The frame
//! reflows independently of the host, which is why the position is never
//! cached.
//!
//! The container does not decide its own visibility. The secondary frame
//! runs a [`ControlsReporter`] that posts a `controls` message whenever its
//! native control bar appears or disappears, and the relocated control fades
//! along with it.

use regex::Regex;

use crate::config::FrameConfig;
use crate::dom::PageDom;
use crate::error::{Absorb, AgentError, AgentResult};
use crate::label::LabelLocator;
use crate::sync::protocol::ControlsReport;

/// Where a relocated control came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlAnchor<N> {
    pub control: N,
    pub parent: N,
    pub next_sibling: Option<N>,
}

pub struct ControlRelocator<N> {
    settings_pattern: Regex,
    fullscreen_pattern: Regex,
    gap_px: f64,
    container_class: String,
    anchor: Option<ControlAnchor<N>>,
    container: Option<N>,
    report: Option<ControlsReport>,
    applied: Option<ControlsReport>,
}

impl<N: Clone + PartialEq> ControlRelocator<N> {
    pub fn new(config: &FrameConfig) -> AgentResult<Self> {
        Ok(Self {
            settings_pattern: Regex::new(&config.settings_label_pattern)?,
            fullscreen_pattern: Regex::new(&config.fullscreen_label_pattern)?,
            gap_px: config.control_gap_px,
            container_class: config.control_container_class.clone(),
            anchor: None,
            container: None,
            report: None,
            applied: None,
        })
    }

    pub fn anchor(&self) -> Option<&ControlAnchor<N>> {
        self.anchor.as_ref()
    }

    pub fn container(&self) -> Option<&N> {
        self.container.as_ref()
    }

    /// Move and position the settings control. Returns whether the control
    /// is in place after this tick.
    pub fn reconcile<D, L>(&mut self, dom: &D, locator: &L, frame: &N, host: &N) -> bool
    where
        D: PageDom<Node = N>,
        L: LabelLocator,
    {
        let root = match dom.frame_root(frame) {
            Ok(root) => root,
            Err(AgentError::CrossOriginDenied) => return false,
            Err(err) => {
                log::debug!("[RELOCATE] frame document unavailable: {}", err);
                return false;
            }
        };

        let Some(fullscreen) = locator.find_by_label_pattern(dom, &self.fullscreen_pattern, &root)
        else {
            return false;
        };

        let captured = self.anchor.as_ref().map(|anchor| anchor.control.clone());
        let control = match captured {
            Some(control) => control,
            None => {
                let Some(settings) =
                    locator.find_by_label_pattern(dom, &self.settings_pattern, &root)
                else {
                    return false;
                };
                let Some(parent) = dom.parent(&settings) else {
                    return false;
                };
                self.anchor = Some(ControlAnchor {
                    control: settings.clone(),
                    parent,
                    next_sibling: dom.next_sibling(&settings),
                });
                log::info!("[RELOCATE] settings control captured");
                settings
            }
        };

        let Some(container) = self.ensure_container(dom, host).absorb("control container") else {
            return false;
        };
        if dom.parent(&control).as_ref() != Some(&container)
            && dom.append_child(&container, &control).absorb("move settings control").is_none()
        {
            return false;
        }

        let frame_offset = dom.bounding_rect(frame).relative_to(&dom.bounding_rect(host));
        let target = dom.bounding_rect(&fullscreen);
        let width = dom.bounding_rect(&control).width;
        let left = frame_offset.left + target.left - width - self.gap_px;
        let top = frame_offset.top + target.top;
        dom.ensure_style(&container, "left", &px(left)).absorb("position control");
        dom.ensure_style(&container, "top", &px(top)).absorb("position control");

        self.apply_visibility(dom, &container);
        true
    }

    /// Record a `controls` report from the secondary frame and apply it.
    pub fn apply_controls<D: PageDom<Node = N>>(&mut self, dom: &D, report: ControlsReport) {
        self.report = Some(report);
        if let Some(container) = self.container.clone() {
            self.apply_visibility(dom, &container);
        }
    }

    /// Put the control back exactly where it was and drop the container.
    pub fn teardown<D: PageDom<Node = N>>(&mut self, dom: &D) {
        if let Some(anchor) = self.anchor.take() {
            let reference = anchor
                .next_sibling
                .filter(|next| dom.parent(next).as_ref() == Some(&anchor.parent));
            dom.insert_before(&anchor.parent, &anchor.control, reference.as_ref())
                .absorb("restore settings control");
            log::info!("[RELOCATE] settings control restored");
        }
        if let Some(container) = self.container.take() {
            dom.remove(&container);
        }
        self.report = None;
        self.applied = None;
    }

    fn ensure_container<D: PageDom<Node = N>>(&mut self, dom: &D, host: &N) -> AgentResult<N> {
        if let Some(container) = &self.container {
            if dom.parent(container).as_ref() == Some(host) {
                return Ok(container.clone());
            }
            dom.remove(container);
        }

        let container = dom.create_element("div")?;
        dom.set_attribute(&container, "class", &self.container_class)?;
        for (property, value) in [
            ("position", "absolute"),
            ("z-index", "20"),
            ("pointer-events", "auto"),
            ("opacity", "0"),
        ] {
            dom.set_style(&container, property, value)?;
        }
        dom.append_child(host, &container)?;

        self.container = Some(container.clone());
        self.applied = None;
        Ok(container)
    }

    fn apply_visibility<D: PageDom<Node = N>>(&mut self, dom: &D, container: &N) {
        let Some(report) = &self.report else {
            return;
        };
        if self.applied.as_ref() == Some(report) {
            return;
        }
        let transition = format!("opacity {}ms {}", report.fade_ms.round() as i64, report.ease);
        dom.set_style(container, "transition", &transition).absorb("control transition");
        dom.set_style(container, "opacity", if report.visible { "1" } else { "0" })
            .absorb("control opacity");
        self.applied = Some(report.clone());
    }
}

fn px(value: f64) -> String {
    format!("{}px", value.round() as i64)
}

/// Watches the secondary frame's native control bar and reports its
/// visibility to the host page.
#[derive(Debug, Clone)]
pub struct ControlsReporter {
    selector: String,
    refresh_ms: f64,
    last: Option<ControlsReport>,
    sent_at_ms: f64,
}

impl ControlsReporter {
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            selector: config.controls_bar_selector.clone(),
            refresh_ms: config.controls_refresh_ms,
            last: None,
            sent_at_ms: 0.0,
        }
    }

    /// The report to post this tick, if any: on change, and again once the
    /// refresh interval has passed so a lost message heals.
    pub fn poll<D: PageDom>(&mut self, dom: &D, now_ms: f64) -> Option<ControlsReport> {
        let bar = dom.query(&self.selector)?;
        let style = dom.computed_style(&bar)?;

        // Mid-fade counts as visible while more than half opaque.
        let visible = style.display != "none" && style.visibility != "hidden" && style.opacity > 0.5;
        let report = ControlsReport {
            visible,
            fade_ms: style.transition_duration_ms.max(0.0),
            ease: if style.transition_timing.is_empty() {
                "ease".to_string()
            } else {
                style.transition_timing.clone()
            },
        };

        let changed = self.last.as_ref() != Some(&report);
        if !changed && now_ms - self.sent_at_ms < self.refresh_ms {
            return None;
        }
        if changed {
            log::debug!("[RELOCATE] native controls visible={}", visible);
        }
        self.last = Some(report.clone());
        self.sent_at_ms = now_ms;
        Some(report)
    }
}
