//! Skip affordance clicker.
//!
//! A control is clicked only if it is actually interactive. Clicking a
//! hidden control would manipulate the page in a state the user cannot see.

use std::collections::HashSet;

use crate::config::AdConfig;
use crate::dom::{is_clickable, PageDom};
use crate::error::Absorb;

#[derive(Debug, Clone)]
pub struct SkipClicker {
    selectors: Vec<String>,
    forced_skip_id: String,
}

impl SkipClicker {
    pub fn new(config: &AdConfig) -> Self {
        Self {
            selectors: config.skip_selectors.clone(),
            forced_skip_id: config.forced_skip_id.clone(),
        }
    }

    /// Click every interactive skip control. Returns how many were clicked.
    pub fn click_skip_buttons<D: PageDom>(&self, dom: &D) -> usize {
        let mut clicked = HashSet::new();

        for selector in &self.selectors {
            for node in dom.query_all(selector) {
                let key = dom.node_key(&node);
                if clicked.contains(&key) {
                    continue;
                }
                if dom.attribute(&node, "id").as_deref() == Some(self.forced_skip_id.as_str()) {
                    self.force_visible(dom, &node);
                }
                let interactive = dom
                    .computed_style(&node)
                    .map(|style| is_clickable(&style))
                    .unwrap_or(false);
                if !interactive {
                    continue;
                }
                dom.click(&node);
                clicked.insert(key);
            }
        }

        if !clicked.is_empty() {
            log::info!("[AD] clicked {} skip control(s)", clicked.len());
        }
        clicked.len()
    }

    fn force_visible<D: PageDom>(&self, dom: &D, node: &D::Node) {
        for (property, value) in [
            ("visibility", "visible"),
            ("display", "flex"),
            ("pointer-events", "auto"),
        ] {
            dom.ensure_style(node, property, value)
                .absorb("force skip visible");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ComputedStyle;
    use crate::testing::FakePage;

    #[test]
    fn test_clicks_only_interactive_controls() {
        let page = FakePage::new();
        let clicker = SkipClicker::new(&AdConfig::default());
        let root = page.root();

        let visible = page.add(root, "button");
        page.mark(visible, ".videoAdUiSkipButton");

        let hidden = page.add(root, "button");
        page.mark(hidden, ".videoAdUiSkipButton");
        page.set_computed(
            hidden,
            ComputedStyle {
                visibility: "hidden".into(),
                ..Default::default()
            },
        );

        let inert = page.add(root, "button");
        page.mark(inert, r#"button[id*="skip" i]"#);
        page.set_computed(
            inert,
            ComputedStyle {
                pointer_events: "none".into(),
                ..Default::default()
            },
        );

        assert_eq!(clicker.click_skip_buttons(&page), 1);
        assert_eq!(page.clicks(), vec![visible]);
    }

    #[test]
    fn test_request_skip_is_forced_visible() {
        let page = FakePage::new();
        let clicker = SkipClicker::new(&AdConfig::default());
        let root = page.root();
        let skip = page.add(root, "div");
        page.set_attr(skip, "id", "request_skip");

        clicker.click_skip_buttons(&page);

        assert_eq!(page.style(skip, "display"), "flex");
        assert_eq!(page.style(skip, "visibility"), "visible");
        assert_eq!(page.style(skip, "pointer-events"), "auto");
        assert_eq!(page.clicks(), vec![skip]);
    }

    #[test]
    fn test_node_matching_several_selectors_clicked_once() {
        let page = FakePage::new();
        let clicker = SkipClicker::new(&AdConfig::default());
        let root = page.root();
        let button = page.add(root, "button");
        page.mark(button, r#"button[aria-label*="Skip" i]"#);
        page.mark(button, r#"[role="button"][aria-label*="Skip" i]"#);

        assert_eq!(clicker.click_skip_buttons(&page), 1);
    }
}
