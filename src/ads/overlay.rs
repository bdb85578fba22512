//! Dimming overlay drawn over ad-flagged media elements.

use crate::config::AdConfig;
use crate::dom::PageDom;
use crate::error::{Absorb, AgentResult};

/// A canvas inserted into an ad element's container.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayCanvas<N> {
    pub canvas: N,
    pub container: N,
}

impl<N> OverlayCanvas<N> {
    /// Remove the canvas from the page.
    pub fn release<D: PageDom<Node = N>>(&self, dom: &D) {
        dom.remove(&self.canvas);
    }
}

/// Container an overlay for `media` belongs in: the ad container if the
/// element sits in one, otherwise its parent.
pub fn overlay_container<D: PageDom>(dom: &D, media: &D::Node, config: &AdConfig) -> Option<D::Node> {
    dom.closest(media, &config.container_selector)
        .or_else(|| dom.parent(media))
}

/// Reconcile the overlay of one element.
///
/// Returns the overlay that should be tracked for the element afterwards:
/// `None` when the element is not an ad (any previous canvas is removed).
pub fn reconcile_overlay<D: PageDom>(
    dom: &D,
    media: &D::Node,
    is_ad: bool,
    existing: Option<OverlayCanvas<D::Node>>,
    config: &AdConfig,
) -> Option<OverlayCanvas<D::Node>> {
    let container = overlay_container(dom, media, config);

    let container = match (is_ad, container) {
        (true, Some(container)) => container,
        _ => {
            if let Some(old) = existing {
                old.release(dom);
            }
            return None;
        }
    };

    let overlay = match existing {
        Some(old) if dom.parent(&old.canvas).as_ref() == Some(&container) => old,
        old => {
            if let Some(old) = old {
                old.release(dom);
            }
            create_canvas(dom, &container, config).absorb("create ad overlay")?
        }
    };

    paint(dom, &overlay, media, config);
    Some(overlay)
}

fn create_canvas<D: PageDom>(
    dom: &D,
    container: &D::Node,
    config: &AdConfig,
) -> AgentResult<OverlayCanvas<D::Node>> {
    let canvas = dom.create_element("canvas")?;
    dom.set_attribute(&canvas, "class", &config.overlay_class)?;
    for (property, value) in [
        ("position", "absolute"),
        ("top", "0"),
        ("left", "0"),
        ("width", "100%"),
        ("height", "100%"),
        ("pointer-events", "none"),
        ("z-index", "9999"),
    ] {
        dom.set_style(&canvas, property, value)?;
    }

    let position = dom.inline_style(container, "position");
    if position.is_empty() || position == "static" {
        dom.set_style(container, "position", "relative")?;
    }
    dom.append_child(container, &canvas)?;

    log::debug!("[AD] overlay created");
    Ok(OverlayCanvas {
        canvas,
        container: container.clone(),
    })
}

/// Match the backing store to the container and repaint. A zero-sized
/// container is left alone until it has been laid out.
fn paint<D: PageDom>(dom: &D, overlay: &OverlayCanvas<D::Node>, media: &D::Node, config: &AdConfig) {
    let (container_w, container_h) = dom.client_size(&overlay.container);
    let (media_w, media_h) = dom.client_size(media);
    let width = container_w.max(media_w).max(0.0).round() as u32;
    let height = container_h.max(media_h).max(0.0).round() as u32;
    if width == 0 || height == 0 {
        return;
    }
    dom.fill_canvas(&overlay.canvas, width, height, &config.overlay_fill())
        .absorb("paint ad overlay");
}
