//! Single-value cache with a time-to-live.
//!
//! Snapshots stored here are immutable: a read inside the TTL returns the
//! stored value unchanged, a read after it replaces the value wholesale.

/// A value together with the time it was produced.
#[derive(Debug, Clone)]
pub struct TtlCell<T> {
    ttl_ms: f64,
    entry: Option<(f64, T)>,
}

impl<T> TtlCell<T> {
    pub fn new(ttl_ms: f64) -> Self {
        Self { ttl_ms, entry: None }
    }

    /// Cached value if it is still fresh at `now_ms`.
    pub fn fresh(&self, now_ms: f64) -> Option<&T> {
        match &self.entry {
            Some((stored_at, value)) if now_ms - stored_at < self.ttl_ms => Some(value),
            _ => None,
        }
    }

    /// Return the fresh value or produce, store and return a new one.
    pub fn get_or_refresh(&mut self, now_ms: f64, produce: impl FnOnce() -> T) -> &T {
        if self.fresh(now_ms).is_none() {
            self.entry = None;
        }
        let (_, value) = self.entry.get_or_insert_with(|| (now_ms, produce()));
        value
    }

    /// Most recent value regardless of age.
    pub fn last(&self) -> Option<&T> {
        self.entry.as_ref().map(|(_, value)| value)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
