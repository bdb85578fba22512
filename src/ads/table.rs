//! Identity-keyed side table for per-element state.
//!
//! Entries are keyed by [`NodeKey`], never by the node handle, so the table
//! does not keep an element alive. There is no removal notification for
//! detached elements: an entry whose element was not seen by the latest scan
//! is swept at the end of that scan, and until then it is simply never read.

use std::collections::{HashMap, HashSet};

use crate::dom::NodeKey;

#[derive(Debug)]
pub struct ElementTable<V> {
    entries: HashMap<NodeKey, V>,
}

impl<V> Default for ElementTable<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> ElementTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: NodeKey) -> Option<&V> {
        self.entries.get(&key)
    }

    pub fn get_or_insert_with(&mut self, key: NodeKey, make: impl FnOnce() -> V) -> &mut V {
        self.entries.entry(key).or_insert_with(make)
    }

    pub fn insert(&mut self, key: NodeKey, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<V> {
        self.entries.remove(&key)
    }

    /// Drop every entry whose key is not in `seen`, returning the dropped
    /// values so the caller can release anything they own in the page.
    pub fn sweep(&mut self, seen: &HashSet<NodeKey>) -> Vec<V> {
        let stale: Vec<NodeKey> = self
            .entries
            .keys()
            .filter(|key| !seen.contains(key))
            .copied()
            .collect();
        stale
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    /// Remove and return everything.
    pub fn drain(&mut self) -> Vec<V> {
        self.entries.drain().map(|(_, value)| value).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
