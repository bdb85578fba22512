//! `web-sys` implementation of the agent's page traits.
//!
//! Elements from a same-origin frame belong to another JS realm, where
//! `instanceof` checks fail. Casts therefore go through `unchecked_ref`
//! after checking the node type or tag name.

use std::cell::Cell;

use js_sys::{Object, Reflect, WeakMap};
use nicofix_lib::dom::{
    ComputedStyle, HintSource, LocaleHint, MediaDom, MediaState, Messenger, NodeKey, PageDom,
    PageLocation, Rect,
};
use nicofix_lib::{AgentError, AgentResult, FrameMessage};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, CssStyleDeclaration, Document, Element, Event, HtmlCanvasElement,
    HtmlDocument, HtmlElement, HtmlIFrameElement, HtmlMediaElement, MouseEvent, MouseEventInit,
    Node, NodeList, Window,
};

/// Cookie and storage keys that may hold the account language.
const LOCALE_KEYS: [&str; 4] = ["lang", "language", "locale", "nicolanguage"];

const META_LOCALE_SELECTOR: &str =
    r#"meta[http-equiv="content-language" i], meta[name="language" i], meta[property="og:locale"]"#;

/// Embedded page state the watch page renders into a meta tag.
const PAGE_STATE_SELECTOR: &str = r#"meta[name="server-response"], #js-initial-watch-data"#;

fn dom_err(err: JsValue) -> AgentError {
    AgentError::Dom(describe(&err))
}

fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            Reflect::get(err, &JsValue::from_str("name"))
                .ok()
                .and_then(|name| name.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", err))
}

pub struct WebPage {
    window: Window,
    document: Document,
    root: Element,
    keys: WeakMap,
    next_key: Cell<u64>,
    swallow: Closure<dyn FnMut(JsValue)>,
}

impl WebPage {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;
        let root = document.document_element().ok_or("No document element")?;
        Ok(Self {
            window,
            document,
            root,
            keys: WeakMap::new(),
            next_key: Cell::new(1),
            swallow: Closure::wrap(Box::new(|_: JsValue| {}) as Box<dyn FnMut(JsValue)>),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn style_of(node: &Element) -> CssStyleDeclaration {
        node.unchecked_ref::<HtmlElement>().style()
    }

    fn as_media(node: &Element) -> Option<&HtmlMediaElement> {
        matches!(node.tag_name().to_ascii_uppercase().as_str(), "VIDEO" | "AUDIO")
            .then(|| node.unchecked_ref::<HtmlMediaElement>())
    }

    fn media(node: &Element, op: &'static str) -> AgentResult<&HtmlMediaElement> {
        Self::as_media(node).ok_or_else(|| AgentError::media(op, "not a media element"))
    }

    /// Property write through `Reflect` so a throwing setter (`playbackRate`
    /// above the browser's limit) comes back as an error instead of a trap.
    fn set_property(node: &Element, op: &'static str, name: &str, value: JsValue) -> AgentResult<()> {
        Reflect::set(node, &JsValue::from_str(name), &value)
            .map(|_| ())
            .map_err(|err| AgentError::media(op, describe(&err)))
    }

    fn elements(list: Result<NodeList, JsValue>, selector: &str) -> Vec<Element> {
        let list = match list {
            Ok(list) => list,
            Err(err) => {
                log::debug!("[DOM] bad selector {}: {}", selector, describe(&err));
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter(|node| node.node_type() == Node::ELEMENT_NODE)
            .map(|node| node.unchecked_into::<Element>())
            .collect()
    }

    fn frame_window(frame: &Element) -> Option<Window> {
        frame.unchecked_ref::<HtmlIFrameElement>().content_window()
    }

    fn to_js(message: &FrameMessage) -> AgentResult<JsValue> {
        message
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|err| AgentError::Protocol(err.to_string()))
    }

    fn cookie_hints(&self) -> Vec<LocaleHint> {
        let cookie = self
            .document
            .unchecked_ref::<HtmlDocument>()
            .cookie()
            .unwrap_or_default();
        cookie
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(key, _)| LOCALE_KEYS.contains(&key.trim().to_ascii_lowercase().as_str()))
            .map(|(_, value)| LocaleHint::new(HintSource::Cookie, value.trim()))
            .collect()
    }

    fn storage_hints(&self) -> Vec<LocaleHint> {
        let Ok(Some(storage)) = self.window.local_storage() else {
            return Vec::new();
        };
        LOCALE_KEYS
            .iter()
            .filter_map(|key| storage.get_item(key).ok().flatten())
            .map(|value| LocaleHint::new(HintSource::Storage, value))
            .collect()
    }

    fn page_state_hints(&self) -> Vec<LocaleHint> {
        self.query_all(PAGE_STATE_SELECTOR)
            .into_iter()
            .filter_map(|node| {
                node.get_attribute("content")
                    .or_else(|| node.get_attribute("data-api-data"))
            })
            .filter_map(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
            .filter_map(|value| find_language(&value, 0))
            .map(|value| LocaleHint::new(HintSource::PageState, value))
            .collect()
    }
}

/// First string under a `language`/`locale` key, depth-limited.
fn find_language(value: &serde_json::Value, depth: usize) -> Option<String> {
    if depth > 8 {
        return None;
    }
    match value {
        serde_json::Value::Object(map) => {
            for key in ["language", "locale"] {
                if let Some(serde_json::Value::String(found)) = map.get(key) {
                    return Some(found.clone());
                }
            }
            map.values().find_map(|child| find_language(child, depth + 1))
        }
        serde_json::Value::Array(items) => {
            items.iter().find_map(|child| find_language(child, depth + 1))
        }
        _ => None,
    }
}

/// Milliseconds from a CSS time list's first entry (`0.3s`, `200ms`).
fn first_duration_ms(list: &str) -> f64 {
    let first = list.split(',').next().unwrap_or("").trim();
    if let Some(ms) = first.strip_suffix("ms") {
        ms.trim().parse().unwrap_or(0.0)
    } else if let Some(s) = first.strip_suffix('s') {
        s.trim().parse::<f64>().map(|s| s * 1000.0).unwrap_or(0.0)
    } else {
        0.0
    }
}

/// First entry of a comma list whose entries may contain parenthesized
/// commas (`cubic-bezier(0.4, 0, 0.2, 1), ease`).
fn first_list_entry(list: &str) -> &str {
    let mut depth = 0usize;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return list[..i].trim(),
            _ => {}
        }
    }
    list.trim()
}

impl PageDom for WebPage {
    type Node = Element;

    fn now_ms(&self) -> f64 {
        self.window.performance().map(|p| p.now()).unwrap_or(0.0)
    }

    fn location(&self) -> PageLocation {
        let location = self.window.location();
        PageLocation {
            origin: location.origin().unwrap_or_default(),
            host: location.hostname().unwrap_or_default(),
            path: location.pathname().unwrap_or_default(),
        }
    }

    fn node_key(&self, node: &Element) -> NodeKey {
        let object: &Object = node.as_ref();
        if let Some(key) = self.keys.get(object).as_f64() {
            return NodeKey(key as u64);
        }
        let key = self.next_key.get();
        self.next_key.set(key + 1);
        self.keys.set(object, &JsValue::from_f64(key as f64));
        NodeKey(key)
    }

    fn document_root(&self) -> Element {
        self.root.clone()
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        Self::elements(self.document.query_selector_all(selector), selector)
    }

    fn query_all_in(&self, root: &Element, selector: &str) -> Vec<Element> {
        Self::elements(root.query_selector_all(selector), selector)
    }

    fn closest(&self, node: &Element, selector: &str) -> Option<Element> {
        node.closest(selector).ok().flatten()
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn next_sibling(&self, node: &Element) -> Option<Element> {
        node.next_element_sibling()
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) -> AgentResult<()> {
        node.set_attribute(name, value).map_err(dom_err)
    }

    fn text(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn inline_style(&self, node: &Element, property: &str) -> String {
        Self::style_of(node)
            .get_property_value(property)
            .unwrap_or_default()
    }

    fn set_style(&self, node: &Element, property: &str, value: &str) -> AgentResult<()> {
        Self::style_of(node)
            .set_property(property, value)
            .map_err(dom_err)
    }

    fn computed_style(&self, node: &Element) -> Option<ComputedStyle> {
        let style = self.window.get_computed_style(node).ok().flatten()?;
        let read = |name: &str| style.get_property_value(name).unwrap_or_default();
        Some(ComputedStyle {
            display: read("display"),
            visibility: read("visibility"),
            opacity: read("opacity").trim().parse().unwrap_or(1.0),
            pointer_events: read("pointer-events"),
            transition_duration_ms: first_duration_ms(&read("transition-duration")),
            transition_timing: first_list_entry(&read("transition-timing-function")).to_string(),
        })
    }

    fn bounding_rect(&self, node: &Element) -> Rect {
        let rect = node.get_bounding_client_rect();
        Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
    }

    fn client_size(&self, node: &Element) -> (f64, f64) {
        (f64::from(node.client_width()), f64::from(node.client_height()))
    }

    fn create_element(&self, tag: &str) -> AgentResult<Element> {
        self.document.create_element(tag).map_err(dom_err)
    }

    fn insert_before(
        &self,
        parent: &Element,
        child: &Element,
        reference: Option<&Element>,
    ) -> AgentResult<()> {
        let reference: Option<&Node> = reference.map(|r| r.as_ref());
        parent
            .insert_before(child, reference)
            .map(|_| ())
            .map_err(dom_err)
    }

    fn remove(&self, node: &Element) {
        node.remove();
    }

    fn click(&self, node: &Element) {
        let init = MouseEventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        init.set_view(Some(&self.window));
        if let Ok(event) = MouseEvent::new_with_mouse_event_init_dict("click", &init) {
            let _ = node.dispatch_event(&event);
        }
        node.unchecked_ref::<HtmlElement>().click();
    }

    fn fill_canvas(&self, canvas: &Element, width: u32, height: u32, fill: &str) -> AgentResult<()> {
        let canvas = canvas.unchecked_ref::<HtmlCanvasElement>();
        if canvas.width() != width {
            canvas.set_width(width);
        }
        if canvas.height() != height {
            canvas.set_height(height);
        }
        let context = canvas
            .get_context("2d")
            .map_err(dom_err)?
            .ok_or_else(|| AgentError::Dom("no 2d context".into()))?
            .unchecked_into::<CanvasRenderingContext2d>();
        context.clear_rect(0.0, 0.0, f64::from(width), f64::from(height));
        context.set_fill_style_str(fill);
        context.fill_rect(0.0, 0.0, f64::from(width), f64::from(height));
        Ok(())
    }

    fn frame_root(&self, frame: &Element) -> AgentResult<Element> {
        frame
            .unchecked_ref::<HtmlIFrameElement>()
            .content_document()
            .and_then(|document| document.document_element())
            .ok_or(AgentError::CrossOriginDenied)
    }

    fn locale_hints(&self) -> Vec<LocaleHint> {
        let mut hints = Vec::new();
        if let Some(lang) = self.root.get_attribute("lang") {
            hints.push(LocaleHint::new(HintSource::DocumentLanguage, lang));
        }
        for meta in self.query_all(META_LOCALE_SELECTOR) {
            if let Some(content) = meta.get_attribute("content") {
                hints.push(LocaleHint::new(HintSource::MetaTag, content));
            }
        }
        hints.extend(self.cookie_hints());
        hints.extend(self.storage_hints());
        hints.extend(self.page_state_hints());
        if let Some(language) = self.window.navigator().language() {
            hints.push(LocaleHint::new(HintSource::Browser, language));
        }
        hints
    }
}

impl MediaDom for WebPage {
    fn media_state(&self, media: &Element) -> Option<MediaState> {
        let element = Self::as_media(media)?;
        let seekable = element.seekable();
        let seekable_end = match seekable.length() {
            0 => None,
            n => seekable.end(n - 1).ok(),
        };
        let current_src = Some(element.current_src())
            .filter(|src| !src.is_empty())
            .or_else(|| media.get_attribute("src"))
            .unwrap_or_default();
        Some(MediaState {
            current_time: element.current_time(),
            duration: element.duration(),
            playback_rate: element.playback_rate(),
            paused: element.paused(),
            ended: element.ended(),
            seeking: element.seeking(),
            muted: element.muted(),
            volume: element.volume(),
            ready_state: element.ready_state(),
            seekable_end,
            current_src,
        })
    }

    fn set_current_time(&self, media: &Element, time: f64) -> AgentResult<()> {
        Self::media(media, "seek")?;
        Self::set_property(media, "seek", "currentTime", JsValue::from_f64(time))
    }

    fn set_playback_rate(&self, media: &Element, rate: f64) -> AgentResult<()> {
        Self::media(media, "rate")?;
        Self::set_property(media, "rate", "playbackRate", JsValue::from_f64(rate))?;
        // Some browsers clamp instead of throwing.
        let applied = Self::media(media, "rate")?.playback_rate();
        if (applied - rate).abs() > f64::EPSILON {
            return Err(AgentError::media("rate", format!("clamped to {}", applied)));
        }
        Ok(())
    }

    fn set_muted(&self, media: &Element, muted: bool) -> AgentResult<()> {
        Self::media(media, "mute")?;
        Self::set_property(media, "mute", "muted", JsValue::from_bool(muted))
    }

    fn set_volume(&self, media: &Element, volume: f64) -> AgentResult<()> {
        Self::media(media, "volume")?;
        Self::set_property(media, "volume", "volume", JsValue::from_f64(volume))
    }

    fn play(&self, media: &Element) -> AgentResult<()> {
        let promise = Self::media(media, "play")?
            .play()
            .map_err(|err| AgentError::media("play", describe(&err)))?;
        let _ = promise.catch(&self.swallow);
        Ok(())
    }

    fn pause(&self, media: &Element) -> AgentResult<()> {
        Self::media(media, "pause")?
            .pause()
            .map_err(|err| AgentError::media("pause", describe(&err)))
    }

    fn dispatch_media_event(&self, media: &Element, event: &str) -> AgentResult<()> {
        let event = Event::new(event).map_err(dom_err)?;
        media.dispatch_event(&event).map(|_| ()).map_err(dom_err)
    }
}

impl Messenger for WebPage {
    fn post_to_frame(&self, frame: &Element, message: &FrameMessage, target_origin: &str) -> AgentResult<()> {
        let target = Self::frame_window(frame).ok_or(AgentError::NodeMissing("frame window"))?;
        target
            .post_message(&Self::to_js(message)?, target_origin)
            .map_err(dom_err)
    }

    fn post_to_parent(&self, message: &FrameMessage, target_origin: &str) -> AgentResult<()> {
        let parent = self
            .window
            .parent()
            .map_err(dom_err)?
            .ok_or(AgentError::NodeMissing("parent window"))?;
        if parent == self.window {
            return Ok(());
        }
        parent
            .post_message(&Self::to_js(message)?, target_origin)
            .map_err(dom_err)
    }
}
