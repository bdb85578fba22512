//! In-memory page used by the unit tests.
//!
//! Nodes live in an arena and are addressed by index. Selector matching is
//! deliberately shallow: a node matches a selector if it was registered for
//! it with [`FakePage::mark`], or if the selector is a compound of its tag,
//! `#id` and `.class`. Comma-separated lists match if any part matches.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::dom::{
    ComputedStyle, LocaleHint, MediaDom, MediaState, Messenger, NodeKey, PageDom, PageLocation,
    Rect,
};
use crate::error::{AgentError, AgentResult};
use crate::sync::protocol::FrameMessage;

pub(crate) type FakeNode = usize;

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attrs: HashMap<String, String>,
    styles: HashMap<String, String>,
    computed: ComputedStyle,
    rect: Rect,
    client: (f64, f64),
    parent: Option<FakeNode>,
    children: Vec<FakeNode>,
    selectors: HashSet<String>,
    text: String,
    media: Option<MediaState>,
    /// Same-origin document root of an iframe.
    frame_root: Option<FakeNode>,
    is_document: bool,
    canvas: Option<(u32, u32, String)>,
    unblocks_play: bool,
}

/// A message recorded by the fake messenger.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Posted {
    /// `None` for messages sent to the parent window.
    pub frame: Option<FakeNode>,
    pub message: FrameMessage,
    pub target_origin: String,
}

#[derive(Debug)]
struct Doc {
    nodes: Vec<NodeData>,
    root: FakeNode,
    now_ms: f64,
    location: PageLocation,
    hints: Vec<LocaleHint>,
    clicks: Vec<FakeNode>,
    events: Vec<(FakeNode, String)>,
    posted: Vec<Posted>,
    seeks: Vec<(FakeNode, f64)>,
    max_rate: f64,
    play_blocked: bool,
    seek_shortfall: f64,
}

pub(crate) struct FakePage {
    doc: RefCell<Doc>,
}

impl FakePage {
    pub fn new() -> Self {
        let root = NodeData {
            tag: "html".into(),
            is_document: true,
            ..Default::default()
        };
        Self {
            doc: RefCell::new(Doc {
                nodes: vec![root],
                root: 0,
                now_ms: 0.0,
                location: PageLocation {
                    origin: "https://www.nicovideo.jp".into(),
                    host: "www.nicovideo.jp".into(),
                    path: "/watch/sm9".into(),
                },
                hints: Vec::new(),
                clicks: Vec::new(),
                events: Vec::new(),
                posted: Vec::new(),
                seeks: Vec::new(),
                max_rate: 16.0,
                play_blocked: false,
                seek_shortfall: 0.0,
            }),
        }
    }

    pub fn at(origin: &str, host: &str, path: &str) -> Self {
        let page = Self::new();
        page.doc.borrow_mut().location = PageLocation {
            origin: origin.into(),
            host: host.into(),
            path: path.into(),
        };
        page
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    pub fn root(&self) -> FakeNode {
        self.doc.borrow().root
    }

    /// Create a detached node.
    pub fn node(&self, tag: &str) -> FakeNode {
        let mut doc = self.doc.borrow_mut();
        doc.nodes.push(NodeData {
            tag: tag.into(),
            ..Default::default()
        });
        doc.nodes.len() - 1
    }

    /// Create a node and append it to `parent`.
    pub fn add(&self, parent: FakeNode, tag: &str) -> FakeNode {
        let node = self.node(tag);
        self.attach(parent, node, None);
        node
    }

    pub fn add_video(&self, parent: FakeNode, state: MediaState) -> FakeNode {
        let node = self.add(parent, "video");
        self.doc.borrow_mut().nodes[node].media = Some(state);
        node
    }

    /// Create a same-origin iframe whose document is returned alongside it.
    pub fn add_frame(&self, parent: FakeNode) -> (FakeNode, FakeNode) {
        let frame = self.add(parent, "iframe");
        let frame_doc = self.node("html");
        let mut doc = self.doc.borrow_mut();
        doc.nodes[frame_doc].is_document = true;
        doc.nodes[frame].frame_root = Some(frame_doc);
        (frame, frame_doc)
    }

    /// Give an existing iframe a same-origin document and return its root.
    pub fn attach_frame_document(&self, frame: FakeNode) -> FakeNode {
        let frame_doc = self.node("html");
        let mut doc = self.doc.borrow_mut();
        doc.nodes[frame_doc].is_document = true;
        doc.nodes[frame].frame_root = Some(frame_doc);
        frame_doc
    }

    pub fn mark(&self, node: FakeNode, selector: &str) {
        self.doc.borrow_mut().nodes[node]
            .selectors
            .insert(selector.into());
    }

    pub fn set_attr(&self, node: FakeNode, name: &str, value: &str) {
        self.doc.borrow_mut().nodes[node]
            .attrs
            .insert(name.into(), value.into());
    }

    pub fn set_text(&self, node: FakeNode, text: &str) {
        self.doc.borrow_mut().nodes[node].text = text.into();
    }

    pub fn set_rect(&self, node: FakeNode, rect: Rect) {
        let mut doc = self.doc.borrow_mut();
        doc.nodes[node].rect = rect;
        doc.nodes[node].client = (rect.width, rect.height);
    }

    pub fn set_computed(&self, node: FakeNode, style: ComputedStyle) {
        self.doc.borrow_mut().nodes[node].computed = style;
    }

    pub fn set_unblocks_play(&self, node: FakeNode) {
        self.doc.borrow_mut().nodes[node].unblocks_play = true;
    }

    pub fn set_now(&self, now_ms: f64) {
        self.doc.borrow_mut().now_ms = now_ms;
    }

    pub fn advance(&self, ms: f64) {
        self.doc.borrow_mut().now_ms += ms;
    }

    pub fn set_path(&self, path: &str) {
        self.doc.borrow_mut().location.path = path.into();
    }

    pub fn set_hints(&self, hints: Vec<LocaleHint>) {
        self.doc.borrow_mut().hints = hints;
    }

    pub fn set_play_blocked(&self, blocked: bool) {
        self.doc.borrow_mut().play_blocked = blocked;
    }

    /// Seeks land this many seconds short of their target.
    pub fn set_seek_shortfall(&self, secs: f64) {
        self.doc.borrow_mut().seek_shortfall = secs;
    }

    pub fn update_media(&self, node: FakeNode, f: impl FnOnce(&mut MediaState)) {
        let mut doc = self.doc.borrow_mut();
        if let Some(media) = doc.nodes[node].media.as_mut() {
            f(media);
        }
    }

    pub fn detach(&self, node: FakeNode) {
        let mut doc = self.doc.borrow_mut();
        if let Some(parent) = doc.nodes[node].parent.take() {
            doc.nodes[parent].children.retain(|&c| c != node);
        }
    }

    fn attach(&self, parent: FakeNode, child: FakeNode, before: Option<FakeNode>) -> bool {
        let mut doc = self.doc.borrow_mut();
        if let Some(reference) = before {
            if doc.nodes[reference].parent != Some(parent) {
                return false;
            }
        }
        if let Some(old) = doc.nodes[child].parent.take() {
            doc.nodes[old].children.retain(|&c| c != child);
        }
        let index = match before {
            Some(reference) => doc.nodes[parent]
                .children
                .iter()
                .position(|&c| c == reference)
                .unwrap_or(doc.nodes[parent].children.len()),
            None => doc.nodes[parent].children.len(),
        };
        doc.nodes[parent].children.insert(index, child);
        doc.nodes[child].parent = Some(parent);
        true
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn media(&self, node: FakeNode) -> MediaState {
        self.doc.borrow().nodes[node]
            .media
            .clone()
            .unwrap_or_default()
    }

    pub fn children(&self, node: FakeNode) -> Vec<FakeNode> {
        self.doc.borrow().nodes[node].children.clone()
    }

    pub fn parent_of(&self, node: FakeNode) -> Option<FakeNode> {
        self.doc.borrow().nodes[node].parent
    }

    pub fn tag(&self, node: FakeNode) -> String {
        self.doc.borrow().nodes[node].tag.clone()
    }

    pub fn style(&self, node: FakeNode, property: &str) -> String {
        self.inline_style(&node, property)
    }

    pub fn attr(&self, node: FakeNode, name: &str) -> Option<String> {
        self.attribute(&node, name)
    }

    pub fn canvas(&self, node: FakeNode) -> Option<(u32, u32, String)> {
        self.doc.borrow().nodes[node].canvas.clone()
    }

    pub fn clicks(&self) -> Vec<FakeNode> {
        self.doc.borrow().clicks.clone()
    }

    pub fn events(&self) -> Vec<(FakeNode, String)> {
        self.doc.borrow().events.clone()
    }

    pub fn seeks(&self) -> Vec<(FakeNode, f64)> {
        self.doc.borrow().seeks.clone()
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.doc.borrow().posted.clone()
    }

    pub fn clear_log(&self) {
        let mut doc = self.doc.borrow_mut();
        doc.clicks.clear();
        doc.events.clear();
        doc.posted.clear();
        doc.seeks.clear();
    }

    pub fn count_tag(&self, tag: &str) -> usize {
        let root = self.root();
        self.descendants(root)
            .into_iter()
            .filter(|&n| self.doc.borrow().nodes[n].tag == tag)
            .count()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn descendants(&self, root: FakeNode) -> Vec<FakeNode> {
        let doc = self.doc.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<FakeNode> = doc.nodes[root].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(doc.nodes[node].children.iter().rev().copied());
        }
        out
    }

    fn matches(&self, node: FakeNode, selector: &str) -> bool {
        let doc = self.doc.borrow();
        let data = &doc.nodes[node];
        if data.selectors.contains(selector) {
            return true;
        }
        selector
            .split(',')
            .map(str::trim)
            .any(|part| data.selectors.contains(part) || matches_compound(data, part))
    }
}

/// `tag`, `#id`, `.class` and combinations such as `iframe.a.b`. Anything
/// with combinators or attribute selectors only matches through `mark`.
fn matches_compound(data: &NodeData, selector: &str) -> bool {
    if selector.is_empty() || selector.contains(&[' ', '[', '>', ':'][..]) {
        return false;
    }
    let split = selector.find(&['.', '#'][..]).unwrap_or(selector.len());
    let (tag, mut rest) = selector.split_at(split);
    if !tag.is_empty() && tag != data.tag {
        return false;
    }
    while !rest.is_empty() {
        let kind = rest.as_bytes()[0];
        let body = &rest[1..];
        let end = body.find(&['.', '#'][..]).unwrap_or(body.len());
        let name = &body[..end];
        let ok = match kind {
            b'#' => data.attrs.get("id").map(String::as_str) == Some(name),
            _ => data
                .attrs
                .get("class")
                .map(|c| c.split_whitespace().any(|c| c == name))
                .unwrap_or(false),
        };
        if !ok {
            return false;
        }
        rest = &body[end..];
    }
    true
}

impl PageDom for FakePage {
    type Node = FakeNode;

    fn now_ms(&self) -> f64 {
        self.doc.borrow().now_ms
    }

    fn location(&self) -> PageLocation {
        self.doc.borrow().location.clone()
    }

    fn node_key(&self, node: &FakeNode) -> NodeKey {
        NodeKey(*node as u64)
    }

    fn document_root(&self) -> FakeNode {
        self.root()
    }

    fn query_all(&self, selector: &str) -> Vec<FakeNode> {
        let root = self.root();
        self.query_all_in(&root, selector)
    }

    fn query_all_in(&self, root: &FakeNode, selector: &str) -> Vec<FakeNode> {
        self.descendants(*root)
            .into_iter()
            .filter(|&n| self.matches(n, selector))
            .collect()
    }

    fn closest(&self, node: &FakeNode, selector: &str) -> Option<FakeNode> {
        let mut current = Some(*node);
        while let Some(n) = current {
            if self.matches(n, selector) {
                return Some(n);
            }
            current = self.doc.borrow().nodes[n].parent;
        }
        None
    }

    fn parent(&self, node: &FakeNode) -> Option<FakeNode> {
        self.doc.borrow().nodes[*node].parent
    }

    fn next_sibling(&self, node: &FakeNode) -> Option<FakeNode> {
        let doc = self.doc.borrow();
        let parent = doc.nodes[*node].parent?;
        let siblings = &doc.nodes[parent].children;
        let index = siblings.iter().position(|c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn is_connected(&self, node: &FakeNode) -> bool {
        let doc = self.doc.borrow();
        let mut current = *node;
        loop {
            if doc.nodes[current].is_document {
                return true;
            }
            match doc.nodes[current].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn attribute(&self, node: &FakeNode, name: &str) -> Option<String> {
        self.doc.borrow().nodes[*node].attrs.get(name).cloned()
    }

    fn set_attribute(&self, node: &FakeNode, name: &str, value: &str) -> AgentResult<()> {
        self.set_attr(*node, name, value);
        Ok(())
    }

    fn text(&self, node: &FakeNode) -> String {
        self.doc.borrow().nodes[*node].text.clone()
    }

    fn inline_style(&self, node: &FakeNode, property: &str) -> String {
        self.doc.borrow().nodes[*node]
            .styles
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    fn set_style(&self, node: &FakeNode, property: &str, value: &str) -> AgentResult<()> {
        self.doc.borrow_mut().nodes[*node]
            .styles
            .insert(property.into(), value.into());
        Ok(())
    }

    fn computed_style(&self, node: &FakeNode) -> Option<ComputedStyle> {
        Some(self.doc.borrow().nodes[*node].computed.clone())
    }

    fn bounding_rect(&self, node: &FakeNode) -> Rect {
        self.doc.borrow().nodes[*node].rect
    }

    fn client_size(&self, node: &FakeNode) -> (f64, f64) {
        self.doc.borrow().nodes[*node].client
    }

    fn create_element(&self, tag: &str) -> AgentResult<FakeNode> {
        Ok(self.node(tag))
    }

    fn insert_before(
        &self,
        parent: &FakeNode,
        child: &FakeNode,
        reference: Option<&FakeNode>,
    ) -> AgentResult<()> {
        if self.attach(*parent, *child, reference.copied()) {
            Ok(())
        } else {
            Err(AgentError::Dom("reference node is not a child of parent".into()))
        }
    }

    fn remove(&self, node: &FakeNode) {
        self.detach(*node);
    }

    fn click(&self, node: &FakeNode) {
        let mut doc = self.doc.borrow_mut();
        doc.clicks.push(*node);
        if doc.nodes[*node].unblocks_play {
            doc.play_blocked = false;
        }
    }

    fn fill_canvas(
        &self,
        canvas: &FakeNode,
        width: u32,
        height: u32,
        fill: &str,
    ) -> AgentResult<()> {
        self.doc.borrow_mut().nodes[*canvas].canvas = Some((width, height, fill.into()));
        Ok(())
    }

    fn frame_root(&self, frame: &FakeNode) -> AgentResult<FakeNode> {
        self.doc.borrow().nodes[*frame]
            .frame_root
            .ok_or(AgentError::CrossOriginDenied)
    }

    fn locale_hints(&self) -> Vec<LocaleHint> {
        self.doc.borrow().hints.clone()
    }
}

impl MediaDom for FakePage {
    fn media_state(&self, media: &FakeNode) -> Option<MediaState> {
        self.doc.borrow().nodes[*media].media.clone()
    }

    fn set_current_time(&self, media: &FakeNode, time: f64) -> AgentResult<()> {
        let mut doc = self.doc.borrow_mut();
        let shortfall = doc.seek_shortfall;
        doc.seeks.push((*media, time));
        let state = doc.nodes[*media]
            .media
            .as_mut()
            .ok_or_else(|| AgentError::media("seek", "not a media element"))?;
        state.current_time = time - shortfall;
        Ok(())
    }

    fn set_playback_rate(&self, media: &FakeNode, rate: f64) -> AgentResult<()> {
        let mut doc = self.doc.borrow_mut();
        let max_rate = doc.max_rate;
        let state = doc.nodes[*media]
            .media
            .as_mut()
            .ok_or_else(|| AgentError::media("rate", "not a media element"))?;
        if rate > max_rate {
            return Err(AgentError::media("rate", "NotSupportedError"));
        }
        state.playback_rate = rate;
        Ok(())
    }

    fn set_muted(&self, media: &FakeNode, muted: bool) -> AgentResult<()> {
        if let Some(state) = self.doc.borrow_mut().nodes[*media].media.as_mut() {
            state.muted = muted;
        }
        Ok(())
    }

    fn set_volume(&self, media: &FakeNode, volume: f64) -> AgentResult<()> {
        if let Some(state) = self.doc.borrow_mut().nodes[*media].media.as_mut() {
            state.volume = volume;
        }
        Ok(())
    }

    fn play(&self, media: &FakeNode) -> AgentResult<()> {
        let mut doc = self.doc.borrow_mut();
        let blocked = doc.play_blocked;
        if let Some(state) = doc.nodes[*media].media.as_mut() {
            if !blocked {
                state.paused = false;
            }
        }
        Ok(())
    }

    fn pause(&self, media: &FakeNode) -> AgentResult<()> {
        if let Some(state) = self.doc.borrow_mut().nodes[*media].media.as_mut() {
            state.paused = true;
        }
        Ok(())
    }

    fn dispatch_media_event(&self, media: &FakeNode, event: &str) -> AgentResult<()> {
        self.doc.borrow_mut().events.push((*media, event.into()));
        Ok(())
    }
}

impl Messenger for FakePage {
    fn post_to_frame(
        &self,
        frame: &FakeNode,
        message: &FrameMessage,
        target_origin: &str,
    ) -> AgentResult<()> {
        self.doc.borrow_mut().posted.push(Posted {
            frame: Some(*frame),
            message: message.clone(),
            target_origin: target_origin.into(),
        });
        Ok(())
    }

    fn post_to_parent(&self, message: &FrameMessage, target_origin: &str) -> AgentResult<()> {
        self.doc.borrow_mut().posted.push(Posted {
            frame: None,
            message: message.clone(),
            target_origin: target_origin.into(),
        });
        Ok(())
    }
}
