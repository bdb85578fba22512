//! Watch session tracking.
//!
//! A session is the lifetime of page state tied to one watch id. Single-page
//! navigation on the watch page changes the path without reloading the
//! document, so the tracker compares the parsed id on every tick.

use std::fmt;

use regex::Regex;

use crate::decision::Decision;
use crate::error::AgentResult;
use crate::locale::LocaleSnapshot;
use crate::metrics::MetricsSnapshot;

/// Opaque watch id (`sm9`, `so12345`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchId(String);

impl WatchId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decision state for one watch id.
#[derive(Debug, Clone)]
pub struct WatchSession {
    pub watch_id: WatchId,
    pub decision: Decision,
    pub metrics: Option<MetricsSnapshot>,
    pub locale: Option<LocaleSnapshot>,
}

impl WatchSession {
    pub fn new(watch_id: WatchId) -> Self {
        Self {
            watch_id,
            decision: Decision::Unknown,
            metrics: None,
            locale: None,
        }
    }
}

/// What a location observation did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    Started(WatchId),
    /// Navigated from one watch id to another.
    Replaced { from: WatchId, to: WatchId },
    Ended(WatchId),
}

impl SessionChange {
    /// Whether cached inputs must be thrown away.
    pub fn resets(&self) -> bool {
        !matches!(self, SessionChange::Unchanged)
    }
}

/// Owns the current session and replaces it when the watch id changes.
#[derive(Debug)]
pub struct SessionTracker {
    pattern: Regex,
    current: Option<WatchSession>,
}

impl SessionTracker {
    pub fn new(watch_path_pattern: &str) -> AgentResult<Self> {
        Ok(Self {
            pattern: Regex::new(watch_path_pattern)?,
            current: None,
        })
    }

    /// Watch id in a location path, percent-decoded.
    pub fn parse_watch_id(&self, path: &str) -> Option<WatchId> {
        let raw = self.pattern.captures(path)?.get(1)?.as_str();
        let decoded = urlencoding::decode(raw).ok()?;
        if decoded.is_empty() {
            return None;
        }
        Some(WatchId(decoded.into_owned()))
    }

    /// Compare the id in `path` with the current session; reset on change.
    pub fn observe(&mut self, path: &str) -> SessionChange {
        let next = self.parse_watch_id(path);
        let previous = self.current.as_ref().map(|s| s.watch_id.clone());

        match (previous, next) {
            (Some(prev), Some(next)) if prev == next => SessionChange::Unchanged,
            (None, None) => SessionChange::Unchanged,
            (None, Some(next)) => {
                self.current = Some(WatchSession::new(next.clone()));
                SessionChange::Started(next)
            }
            (Some(prev), Some(next)) => {
                self.current = Some(WatchSession::new(next.clone()));
                SessionChange::Replaced { from: prev, to: next }
            }
            (Some(prev), None) => {
                self.current = None;
                SessionChange::Ended(prev)
            }
        }
    }

    pub fn current(&self) -> Option<&WatchSession> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut WatchSession> {
        self.current.as_mut()
    }

    pub fn end(&mut self) {
        self.current = None;
    }
}
