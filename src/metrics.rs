//! View/comment metrics classification.
//!
//! A video whose counters look implausible (many views and no comments, or
//! far more comments than views) is classified `Abnormal`; the decision
//! policy treats that as a reason to prefer the secondary player.

use serde::Serialize;

use crate::cache::TtlCell;
use crate::config::DecisionConfig;
use crate::dom::PageDom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricsStatus {
    Normal,
    Abnormal,
    Unknown,
}

/// Counters as extracted from the page, before classification.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawMetrics {
    pub views: Option<f64>,
    pub comments: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub views: Option<f64>,
    pub comments: Option<f64>,
    pub status: MetricsStatus,
    pub observed_at_ms: f64,
}

impl MetricsSnapshot {
    pub fn observe(raw: RawMetrics, now_ms: f64) -> Self {
        Self {
            views: raw.views,
            comments: raw.comments,
            status: classify(raw.views, raw.comments),
            observed_at_ms: now_ms,
        }
    }
}

/// Classify a (views, comments) pair. Rules are evaluated in order.
pub fn classify(views: Option<f64>, comments: Option<f64>) -> MetricsStatus {
    let (Some(views), Some(comments)) = (views, comments) else {
        return MetricsStatus::Unknown;
    };
    if !views.is_finite() || !comments.is_finite() || views < 0.0 || comments < 0.0 {
        return MetricsStatus::Unknown;
    }

    if views == 0.0 {
        return if comments == 0.0 {
            MetricsStatus::Normal
        } else {
            MetricsStatus::Abnormal
        };
    }
    if views >= 1000.0 && comments == 0.0 {
        return MetricsStatus::Abnormal;
    }
    if comments > 2.0 * views && comments > 100.0 {
        return MetricsStatus::Abnormal;
    }
    if views >= 10_000.0 && comments * 1000.0 < views {
        return MetricsStatus::Abnormal;
    }
    MetricsStatus::Normal
}

/// Parse a rendered counter such as `1,234`, `12.5万` or `3.2K`.
pub fn parse_count(text: &str) -> Option<f64> {
    let text = text.trim();
    let (number, multiplier) = match text.chars().last()? {
        '万' => (&text[..text.len() - '万'.len_utf8()], 1e4),
        '億' => (&text[..text.len() - '億'.len_utf8()], 1e8),
        'K' | 'k' => (&text[..text.len() - 1], 1e3),
        'M' | 'm' => (&text[..text.len() - 1], 1e6),
        _ => (text, 1.0),
    };

    let digits: String = number
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}'))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    digits.parse::<f64>().ok().map(|value| value * multiplier)
}

/// Read both counters from the page. Missing nodes yield `None`.
pub fn extract<D: PageDom>(dom: &D, config: &DecisionConfig) -> RawMetrics {
    let read = |selector: &str| {
        dom.query(selector)
            .and_then(|node| parse_count(&dom.text(&node)))
    };
    RawMetrics {
        views: read(&config.views_selector),
        comments: read(&config.comments_selector),
    }
}

/// Classifier with a short-lived snapshot cache.
#[derive(Debug)]
pub struct MetricsClassifier {
    cache: TtlCell<MetricsSnapshot>,
}

impl MetricsClassifier {
    pub fn new(ttl_ms: f64) -> Self {
        Self {
            cache: TtlCell::new(ttl_ms),
        }
    }

    /// Cached snapshot while fresh, otherwise a new one from `source`.
    pub fn read(&mut self, now_ms: f64, source: impl FnOnce() -> RawMetrics) -> &MetricsSnapshot {
        self.cache
            .get_or_refresh(now_ms, || MetricsSnapshot::observe(source(), now_ms))
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }
}
