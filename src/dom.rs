//! Page capabilities the agent is written against.
//!
//! The agent never touches a browser API directly. Everything it reads or
//! mutates goes through these traits, which the wasm adapter implements over
//! `web-sys` and the tests implement over an in-memory document.
//!
//! ```text
//! PageDom   tree queries, styles, layout, node creation, frame access
//!   ├── MediaDom    media element transport state and controls
//!   └── Messenger   cross-frame postMessage with explicit target origin
//! ```
//!
//! Every mutating method returns `AgentResult` so callers can absorb
//! failures individually; read methods fall back to neutral values when a
//! node has gone away.

use std::fmt;

use crate::error::AgentResult;
use crate::sync::protocol::FrameMessage;

/// Opaque identity of a node, stable for the node's lifetime.
///
/// Side tables key on this rather than on the node handle so they never keep
/// a detached element alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

/// Border box in the coordinate space of the node's own viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// This rect expressed relative to `origin`'s top-left corner.
    pub fn relative_to(&self, origin: &Rect) -> Rect {
        Rect {
            left: self.left - origin.left,
            top: self.top - origin.top,
            ..*self
        }
    }
}

/// The subset of computed style the agent reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
    pub pointer_events: String,
    /// First `transition-duration` entry, in milliseconds.
    pub transition_duration_ms: f64,
    /// First `transition-timing-function` entry.
    pub transition_timing: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".into(),
            visibility: "visible".into(),
            opacity: 1.0,
            pointer_events: "auto".into(),
            transition_duration_ms: 0.0,
            transition_timing: "ease".into(),
        }
    }
}

/// Where the agent is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLocation {
    pub origin: String,
    pub host: String,
    pub path: String,
}

/// Independent, low-confidence sources of the account locale, in priority
/// order (earlier variants win).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HintSource {
    DocumentLanguage,
    MetaTag,
    Cookie,
    Storage,
    PageState,
    Browser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleHint {
    pub source: HintSource,
    pub value: String,
}

impl LocaleHint {
    pub fn new(source: HintSource, value: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }
}

/// Point-in-time transport state of a media element.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaState {
    pub current_time: f64,
    /// NaN or infinite while unknown (live streams, metadata not loaded).
    pub duration: f64,
    pub playback_rate: f64,
    pub paused: bool,
    pub ended: bool,
    pub seeking: bool,
    pub muted: bool,
    pub volume: f64,
    pub ready_state: u16,
    /// End of the last seekable range, if any.
    pub seekable_end: Option<f64>,
    /// `currentSrc`, falling back to the `src` attribute.
    pub current_src: String,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: f64::NAN,
            playback_rate: 1.0,
            paused: true,
            ended: false,
            seeking: false,
            muted: false,
            volume: 1.0,
            ready_state: 0,
            seekable_end: None,
            current_src: String::new(),
        }
    }
}

/// Document tree, style and layout access.
pub trait PageDom {
    type Node: Clone + PartialEq + fmt::Debug;

    /// Monotonic milliseconds (`performance.now()` in a browser).
    fn now_ms(&self) -> f64;
    fn location(&self) -> PageLocation;
    fn node_key(&self, node: &Self::Node) -> NodeKey;
    /// Root element of this document.
    fn document_root(&self) -> Self::Node;

    /// All matches in document order, not descending into frames.
    fn query_all(&self, selector: &str) -> Vec<Self::Node>;
    fn query(&self, selector: &str) -> Option<Self::Node> {
        self.query_all(selector).into_iter().next()
    }
    /// All matches below `root` (which may be a frame's document root).
    fn query_all_in(&self, root: &Self::Node, selector: &str) -> Vec<Self::Node>;
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node>;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
    fn is_connected(&self, node: &Self::Node) -> bool;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> AgentResult<()>;
    fn text(&self, node: &Self::Node) -> String;
    /// Inline style property, empty when unset.
    fn inline_style(&self, node: &Self::Node, property: &str) -> String;
    fn set_style(&self, node: &Self::Node, property: &str, value: &str) -> AgentResult<()>;
    /// Write an inline style only when it differs, so a tick that changes
    /// nothing does not wake the mutation observer.
    fn ensure_style(&self, node: &Self::Node, property: &str, value: &str) -> AgentResult<()> {
        if self.inline_style(node, property) == value {
            return Ok(());
        }
        self.set_style(node, property, value)
    }
    fn computed_style(&self, node: &Self::Node) -> Option<ComputedStyle>;
    fn bounding_rect(&self, node: &Self::Node) -> Rect;
    /// `(clientWidth, clientHeight)`.
    fn client_size(&self, node: &Self::Node) -> (f64, f64);

    fn create_element(&self, tag: &str) -> AgentResult<Self::Node>;
    /// Insert `child` into `parent` before `reference`, or append when
    /// `reference` is `None`. Moves the node if it is already attached.
    fn insert_before(
        &self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> AgentResult<()>;
    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> AgentResult<()> {
        self.insert_before(parent, child, None)
    }
    fn remove(&self, node: &Self::Node);
    /// Synthetic bubbling click followed by the element's own `click()`.
    fn click(&self, node: &Self::Node);

    /// Resize the canvas backing store when it differs, clear it and fill it.
    fn fill_canvas(&self, canvas: &Self::Node, width: u32, height: u32, fill: &str)
        -> AgentResult<()>;

    /// Document root of an iframe. `CrossOriginDenied` when the browser does
    /// not allow reaching into it.
    fn frame_root(&self, frame: &Self::Node) -> AgentResult<Self::Node>;

    /// Raw locale candidates tagged with their source, in any order.
    fn locale_hints(&self) -> Vec<LocaleHint>;
}

/// Media element access.
pub trait MediaDom: PageDom {
    /// `None` when the node is not a media element or is unreadable.
    fn media_state(&self, media: &Self::Node) -> Option<MediaState>;
    fn set_current_time(&self, media: &Self::Node, time: f64) -> AgentResult<()>;
    fn set_playback_rate(&self, media: &Self::Node, rate: f64) -> AgentResult<()>;
    fn set_muted(&self, media: &Self::Node, muted: bool) -> AgentResult<()>;
    fn set_volume(&self, media: &Self::Node, volume: f64) -> AgentResult<()>;
    /// Fire and forget. Rejection of the returned promise is swallowed by the
    /// implementation; the effect is verified on a later tick.
    fn play(&self, media: &Self::Node) -> AgentResult<()>;
    fn pause(&self, media: &Self::Node) -> AgentResult<()>;
    /// Dispatch a plain (non-bubbling) event such as `timeupdate`.
    fn dispatch_media_event(&self, media: &Self::Node, event: &str) -> AgentResult<()>;
}

/// Cross-frame messaging.
pub trait Messenger: PageDom {
    fn post_to_frame(
        &self,
        frame: &Self::Node,
        message: &FrameMessage,
        target_origin: &str,
    ) -> AgentResult<()>;
    fn post_to_parent(&self, message: &FrameMessage, target_origin: &str) -> AgentResult<()>;
}

/// Everything the reconciler needs.
pub trait Page: MediaDom + Messenger {}

impl<T: MediaDom + Messenger> Page for T {}

/// Whether a control is actually interactive: displayed, visible, not fully
/// transparent and accepting pointer events.
pub fn is_clickable(style: &ComputedStyle) -> bool {
    if style.display == "none" || style.visibility == "hidden" {
        return false;
    }
    if style.pointer_events == "none" {
        return false;
    }
    style.opacity != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_clickable_default() {
        assert!(is_clickable(&ComputedStyle::default()));
    }

    #[test]
    fn test_is_clickable_rejects_hidden_controls() {
        let hidden = [
            ComputedStyle {
                display: "none".into(),
                ..Default::default()
            },
            ComputedStyle {
                visibility: "hidden".into(),
                ..Default::default()
            },
            ComputedStyle {
                opacity: 0.0,
                ..Default::default()
            },
            ComputedStyle {
                pointer_events: "none".into(),
                ..Default::default()
            },
        ];
        for style in hidden {
            assert!(!is_clickable(&style), "{:?}", style);
        }
    }

    #[test]
    fn test_rect_relative_to() {
        let host = Rect::new(100.0, 50.0, 800.0, 450.0);
        let child = Rect::new(150.0, 80.0, 20.0, 10.0);
        let rel = child.relative_to(&host);
        assert_eq!(rel, Rect::new(50.0, 30.0, 20.0, 10.0));
    }

    #[test]
    fn test_hint_source_priority() {
        assert!(HintSource::DocumentLanguage < HintSource::MetaTag);
        assert!(HintSource::PageState < HintSource::Browser);
    }
}
