//! Account locale resolution from low-confidence hints.

use regex::Regex;
use serde::Serialize;

use crate::cache::TtlCell;
use crate::dom::LocaleHint;
use crate::error::AgentResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleSnapshot {
    pub value: Option<String>,
    pub observed_at_ms: f64,
}

/// Picks the highest-priority non-empty hint and caches it.
#[derive(Debug)]
pub struct LocaleResolver {
    regional: Regex,
    cache: TtlCell<LocaleSnapshot>,
}

impl LocaleResolver {
    pub fn new(ttl_ms: f64, regional_pattern: &str) -> AgentResult<Self> {
        Ok(Self {
            regional: Regex::new(regional_pattern)?,
            cache: TtlCell::new(ttl_ms),
        })
    }

    /// Cached snapshot while fresh, otherwise resolved from `hints`.
    pub fn read(&mut self, now_ms: f64, hints: impl FnOnce() -> Vec<LocaleHint>) -> &LocaleSnapshot {
        self.cache.get_or_refresh(now_ms, || LocaleSnapshot {
            value: resolve(hints()),
            observed_at_ms: now_ms,
        })
    }

    pub fn is_regional_match(&self, locale: &str) -> bool {
        self.regional.is_match(locale.trim())
    }

    /// Whether a snapshot's value is a regional match. `None` never is.
    pub fn snapshot_is_regional(&self, snapshot: &LocaleSnapshot) -> bool {
        snapshot
            .value
            .as_deref()
            .map(|value| self.is_regional_match(value))
            .unwrap_or(false)
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }
}

/// First non-empty candidate in source priority order. Hints from the same
/// source keep their relative order.
pub fn resolve(mut hints: Vec<LocaleHint>) -> Option<String> {
    hints.sort_by_key(|hint| hint.source);
    hints
        .into_iter()
        .map(|hint| hint.value.trim().to_string())
        .find(|value| !value.is_empty())
}
