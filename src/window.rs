//! Time-ordered edge store backing the sliding window.
//!
//! Entries are kept in a `BTreeMap` keyed by `(timestamp, seq)`, so equal
//! timestamps coexist and keep arrival order. The store knows nothing about
//! admission or dedup; `graph::TransactionGraph` decides what goes in.

use crate::edge::Edge;
use std::collections::BTreeMap;

/// Stable handle to one entry of a [`WindowedEdgeSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    pub timestamp: i64,
    seq: u64,
}

#[derive(Debug, Default, Clone)]
pub struct WindowedEdgeSet {
    entries: BTreeMap<EntryKey, Edge>,
    next_seq: u64,
}

impl WindowedEdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry unconditionally and returns its handle.
    pub fn insert(&mut self, timestamp: i64, edge: Edge) -> EntryKey {
        let key = EntryKey { timestamp, seq: self.next_seq };
        self.next_seq += 1;
        self.entries.insert(key, edge);
        key
    }

    /// First entry (oldest timestamp first) holding the same undirected pair.
    /// O(n) scan.
    pub fn find_edge_between(&self, edge: &Edge) -> Option<EntryKey> {
        self.entries
            .iter()
            .find(|(_, e)| *e == edge)
            .map(|(k, _)| *k)
    }

    pub fn remove(&mut self, key: EntryKey) -> Option<Edge> {
        self.entries.remove(&key)
    }

    pub fn get(&self, key: EntryKey) -> Option<&Edge> {
        self.entries.get(&key)
    }

    pub fn max_timestamp(&self) -> Option<i64> {
        self.entries.keys().next_back().map(|k| k.timestamp)
    }

    pub fn min_timestamp(&self) -> Option<i64> {
        self.entries.keys().next().map(|k| k.timestamp)
    }

    /// Removes every entry with `timestamp <= threshold`, oldest first, and
    /// hands each removed edge to `on_evict`. Stops at the first newer entry.
    pub fn evict_older_than_or_equal<F>(&mut self, threshold: i64, mut on_evict: F) -> usize
    where
        F: FnMut(&Edge),
    {
        let mut evicted = 0;
        while let Some(entry) = self.entries.first_entry() {
            if entry.key().timestamp > threshold {
                break;
            }
            let edge = entry.remove();
            on_evict(&edge);
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(timestamp, edge)` pairs in ascending timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &Edge)> + '_ {
        self.entries.iter().map(|(k, e)| (k.timestamp, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(items: &[(i64, &str, &str)]) -> WindowedEdgeSet {
        let mut set = WindowedEdgeSet::new();
        for (ts, a, b) in items {
            set.insert(*ts, Edge::new(*a, *b));
        }
        set
    }

    #[test]
    fn keeps_timestamp_order_and_duplicates() {
        let set = set_of(&[(30, "a", "b"), (10, "c", "d"), (30, "e", "f"), (20, "g", "h")]);
        let order: Vec<i64> = set.iter().map(|(ts, _)| ts).collect();
        assert_eq!(order, vec![10, 20, 30, 30]);
        // equal timestamps keep arrival order
        let at_30: Vec<&Edge> = set.iter().filter(|(ts, _)| *ts == 30).map(|(_, e)| e).collect();
        assert_eq!(at_30, vec![&Edge::new("a", "b"), &Edge::new("e", "f")]);
        assert_eq!(set.max_timestamp(), Some(30));
        assert_eq!(set.min_timestamp(), Some(10));
    }

    #[test]
    fn empty_set_has_no_max() {
        let set = WindowedEdgeSet::new();
        assert!(set.is_empty());
        assert_eq!(set.max_timestamp(), None);
    }

    #[test]
    fn find_matches_either_direction() {
        let set = set_of(&[(1, "a", "b"), (2, "b", "c")]);
        let key = set.find_edge_between(&Edge::new("c", "b")).expect("edge present");
        assert_eq!(key.timestamp, 2);
        assert!(set.find_edge_between(&Edge::new("a", "c")).is_none());
    }

    #[test]
    fn remove_by_handle() {
        let mut set = WindowedEdgeSet::new();
        let k1 = set.insert(5, Edge::new("a", "b"));
        let k2 = set.insert(5, Edge::new("c", "d"));
        assert_eq!(set.remove(k1), Some(Edge::new("a", "b")));
        assert_eq!(set.remove(k1), None);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(k2), Some(&Edge::new("c", "d")));
    }

    #[test]
    fn eviction_is_inclusive_prefix() {
        let mut set = set_of(&[(0, "a", "b"), (10, "c", "d"), (11, "e", "f"), (70, "g", "h")]);
        let mut seen = Vec::new();
        let n = set.evict_older_than_or_equal(10, |e| seen.push(e.clone()));
        assert_eq!(n, 2);
        assert_eq!(seen, vec![Edge::new("a", "b"), Edge::new("c", "d")]);
        assert_eq!(set.min_timestamp(), Some(11));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn eviction_below_everything_is_noop() {
        let mut set = set_of(&[(5, "a", "b")]);
        assert_eq!(set.evict_older_than_or_equal(4, |_| panic!("nothing to evict")), 0);
        assert_eq!(set.len(), 1);
    }
}
