//! Secondary player frame lifecycle.
//!
//! Only the decision tick creates or removes the frame. The frame overlays
//! the native player inside the player host; the native element keeps
//! playing underneath and owns the audio.

use crate::config::FrameConfig;
use crate::dom::PageDom;
use crate::error::{AgentResult, OptionExt};
use crate::session::WatchId;

const FRAME_STYLE: [(&str, &str); 7] = [
    ("position", "absolute"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100%"),
    ("height", "100%"),
    ("border", "0"),
    ("z-index", "10"),
];

pub struct SecondaryFrame<N> {
    config: FrameConfig,
    frame: Option<N>,
}

impl<N: Clone + PartialEq> SecondaryFrame<N> {
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            config: config.clone(),
            frame: None,
        }
    }

    pub fn current(&self) -> Option<&N> {
        self.frame.as_ref()
    }

    /// Make sure exactly one frame for `watch_id` sits in the player host.
    pub fn ensure<D: PageDom<Node = N>>(&mut self, dom: &D, watch_id: &WatchId) -> AgentResult<N> {
        let host = dom
            .query(&self.config.player_host_selector)
            .context("player host")?;
        let src = self.config.embed_url(watch_id.as_str());

        let mut keep = None;
        for frame in dom.query_all(&self.frame_selector()) {
            let reusable = keep.is_none()
                && dom.parent(&frame).as_ref() == Some(&host)
                && dom.attribute(&frame, "src").as_deref() == Some(src.as_str());
            if reusable {
                keep = Some(frame);
            } else {
                log::debug!("[FRAME] pruning stray frame");
                dom.remove(&frame);
            }
        }

        let frame = match keep {
            Some(frame) => frame,
            None => self.create(dom, &host, &src)?,
        };
        self.frame = Some(frame.clone());
        Ok(frame)
    }

    /// Remove every frame this agent created.
    pub fn remove<D: PageDom<Node = N>>(&mut self, dom: &D) {
        let frames = dom.query_all(&self.frame_selector());
        if !frames.is_empty() {
            log::info!("[FRAME] removing secondary frame");
        }
        for frame in frames {
            dom.remove(&frame);
        }
        self.frame = None;
    }

    fn frame_selector(&self) -> String {
        format!("iframe.{}", self.config.frame_class)
    }

    fn create<D: PageDom<Node = N>>(&self, dom: &D, host: &N, src: &str) -> AgentResult<N> {
        let frame = dom.create_element("iframe")?;
        dom.set_attribute(&frame, "class", &self.config.frame_class)?;
        dom.set_attribute(&frame, "src", src)?;
        dom.set_attribute(&frame, "allow", "autoplay; fullscreen")?;
        dom.set_attribute(&frame, "allowfullscreen", "")?;
        for (property, value) in FRAME_STYLE {
            dom.set_style(&frame, property, value)?;
        }

        let position = dom.inline_style(host, "position");
        if position.is_empty() || position == "static" {
            dom.set_style(host, "position", "relative")?;
        }
        dom.append_child(host, &frame)?;

        log::info!("[FRAME] secondary frame created: {}", src);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::session::SessionTracker;
    use crate::testing::{FakeNode, FakePage};

    fn watch_id(path: &str) -> WatchId {
        SessionTracker::new(&FrameConfig::default().watch_path_pattern)
            .unwrap()
            .parse_watch_id(path)
            .unwrap()
    }

    fn page_with_host() -> (FakePage, FakeNode) {
        let page = FakePage::new();
        let host = page.add(page.root(), "div");
        page.mark(host, &FrameConfig::default().player_host_selector);
        (page, host)
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let (page, host) = page_with_host();
        let mut frame = SecondaryFrame::new(&FrameConfig::default());
        let id = watch_id("/watch/sm9");

        let first = frame.ensure(&page, &id).unwrap();
        let second = frame.ensure(&page, &id).unwrap();

        assert_eq!(first, second);
        assert_eq!(page.children(host), vec![first]);
        assert_eq!(
            page.attr(first, "src").as_deref(),
            Some("https://embed.nicovideo.jp/watch/sm9")
        );
        assert_eq!(page.attr(first, "allow").as_deref(), Some("autoplay; fullscreen"));
        assert_eq!(page.style(host, "position"), "relative");
    }

    #[test]
    fn test_new_watch_id_replaces_frame() {
        let (page, host) = page_with_host();
        let mut frame = SecondaryFrame::new(&FrameConfig::default());

        let old = frame.ensure(&page, &watch_id("/watch/sm9")).unwrap();
        let new = frame.ensure(&page, &watch_id("/watch/so42")).unwrap();

        assert_ne!(old, new);
        assert_eq!(page.children(host), vec![new]);
    }

    #[test]
    fn test_stray_frames_pruned() {
        let (page, host) = page_with_host();
        let mut frame = SecondaryFrame::new(&FrameConfig::default());
        let id = watch_id("/watch/sm9");
        let kept = frame.ensure(&page, &id).unwrap();

        let stray = page.add(host, "iframe");
        page.set_attr(stray, "class", "nicofix-secondary-frame");
        page.set_attr(stray, "src", "https://embed.nicovideo.jp/watch/sm9");

        frame.ensure(&page, &id).unwrap();
        assert_eq!(page.children(host), vec![kept]);
        assert_eq!(page.count_tag("iframe"), 1);
    }

    #[test]
    fn test_missing_host_is_transient() {
        let page = FakePage::new();
        let mut frame = SecondaryFrame::<FakeNode>::new(&FrameConfig::default());
        let err = frame.ensure(&page, &watch_id("/watch/sm9")).unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, AgentError::NodeMissing("player host")));
    }

    #[test]
    fn test_remove_clears_all() {
        let (page, host) = page_with_host();
        let mut frame = SecondaryFrame::new(&FrameConfig::default());
        frame.ensure(&page, &watch_id("/watch/sm9")).unwrap();

        frame.remove(&page);
        assert!(page.children(host).is_empty());
        assert!(frame.current().is_none());
    }
}
