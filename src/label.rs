//! Accessible-name lookup for player controls.
//!
//! Player controls carry no stable ids or classes, only localized labels.
//! Lookup is therefore by label pattern, behind a trait so a page adapter
//! can substitute a smarter heuristic.

use regex::Regex;

use crate::dom::PageDom;

pub trait LabelLocator {
    /// First control below `root` whose accessible name matches `pattern`.
    fn find_by_label_pattern<D: PageDom>(
        &self,
        dom: &D,
        pattern: &Regex,
        root: &D::Node,
    ) -> Option<D::Node>;
}

/// Matches `aria-label`, then `title`, then `data-title` of button-like
/// elements, in document order.
#[derive(Debug, Clone)]
pub struct AttributeLabelLocator {
    candidates: String,
}

const LABEL_ATTRIBUTES: [&str; 3] = ["aria-label", "title", "data-title"];

impl Default for AttributeLabelLocator {
    fn default() -> Self {
        Self {
            candidates: r#"button, [role="button"]"#.into(),
        }
    }
}

impl AttributeLabelLocator {
    pub fn new(candidates: impl Into<String>) -> Self {
        Self {
            candidates: candidates.into(),
        }
    }
}

impl LabelLocator for AttributeLabelLocator {
    fn find_by_label_pattern<D: PageDom>(
        &self,
        dom: &D,
        pattern: &Regex,
        root: &D::Node,
    ) -> Option<D::Node> {
        dom.query_all_in(root, &self.candidates)
            .into_iter()
            .find(|node| {
                LABEL_ATTRIBUTES.iter().any(|name| {
                    dom.attribute(node, name)
                        .map(|label| pattern.is_match(label.trim()))
                        .unwrap_or(false)
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameConfig;
    use crate::testing::FakePage;

    #[test]
    fn test_finds_by_any_label_attribute() {
        let page = FakePage::new();
        let config = FrameConfig::default();
        let root = page.root();
        let play = page.add(root, "button");
        page.set_attr(play, "aria-label", "再生");
        let settings = page.add(root, "button");
        page.set_attr(settings, "data-title", "設定");

        let locator = AttributeLabelLocator::default();
        let settings_re = Regex::new(&config.settings_label_pattern).unwrap();
        let play_re = Regex::new(&config.play_label_pattern).unwrap();

        assert_eq!(locator.find_by_label_pattern(&page, &settings_re, &root), Some(settings));
        assert_eq!(locator.find_by_label_pattern(&page, &play_re, &root), Some(play));
    }

    #[test]
    fn test_ignores_non_buttons_and_other_roots() {
        let page = FakePage::new();
        let root = page.root();
        let div = page.add(root, "div");
        page.set_attr(div, "aria-label", "Settings");
        let (_, frame_doc) = page.add_frame(root);
        let inner = page.add(frame_doc, "button");
        page.set_attr(inner, "title", "Settings");

        let locator = AttributeLabelLocator::default();
        let pattern = Regex::new("(?i)settings").unwrap();
        assert_eq!(locator.find_by_label_pattern(&page, &pattern, &root), None);
        assert_eq!(locator.find_by_label_pattern(&page, &pattern, &frame_doc), Some(inner));
    }

    #[test]
    fn test_play_pattern_is_anchored() {
        let page = FakePage::new();
        let root = page.root();
        let replay = page.add(root, "button");
        page.set_attr(replay, "aria-label", "Autoplay");

        let pattern = Regex::new(&FrameConfig::default().play_label_pattern).unwrap();
        assert_eq!(
            AttributeLabelLocator::default().find_by_label_pattern(&page, &pattern, &root),
            None
        );
    }
}
