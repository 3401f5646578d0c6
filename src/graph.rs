//! Sliding-window payment graph.
//!
//! `TransactionGraph` owns the edge store and the degree index and is the
//! only way to mutate either, so the two never disagree between calls.

use crate::degree::{DegreeIndex, Median};
use crate::edge::Edge;
use crate::window::WindowedEdgeSet;
use std::fmt;

pub const DEFAULT_WINDOW_SECS: i64 = 60;

/// Window length in seconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize(i64);

impl WindowSize {
    pub fn new(secs: i64) -> Option<Self> {
        (secs > 0).then_some(WindowSize(secs))
    }

    pub fn secs(&self) -> i64 {
        self.0
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize(DEFAULT_WINDOW_SECS)
    }
}

impl TryFrom<i64> for WindowSize {
    type Error = String;

    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        WindowSize::new(secs).ok_or_else(|| format!("window size must be positive, got {}", secs))
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// What happened to an admitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmitReport {
    pub median: Median,
    /// An older edge between the same two users was dropped.
    pub replaced: bool,
    /// Entries pushed out of the window by this insert.
    pub evicted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(AdmitReport),
    /// Too old relative to the newest retained timestamp; nothing changed.
    Rejected,
}

impl Admission {
    pub fn median(&self) -> Option<Median> {
        match self {
            Admission::Admitted(report) => Some(report.median),
            Admission::Rejected => None,
        }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

#[derive(Debug, Default, Clone)]
pub struct TransactionGraph {
    window: WindowSize,
    edges: WindowedEdgeSet,
    degrees: DegreeIndex,
}

impl TransactionGraph {
    pub fn new(window: WindowSize) -> Self {
        TransactionGraph {
            window,
            edges: WindowedEdgeSet::new(),
            degrees: DegreeIndex::new(),
        }
    }

    pub fn window(&self) -> WindowSize {
        self.window
    }

    /// Feed one transaction in arrival order.
    ///
    /// The first transaction is always admitted. After that a transaction is
    /// admitted iff `max_ts < timestamp + window`; an admitted edge replaces
    /// any retained edge between the same pair, then everything with
    /// `ts <= max_ts - window` is evicted.
    pub fn process_edge(&mut self, timestamp: i64, actor: &str, target: &str) -> Admission {
        let edge = Edge::new(actor, target);

        let Some(max_ts) = self.edges.max_timestamp() else {
            self.insert_edge(timestamp, edge);
            return self.admitted(false, 0);
        };

        // widened so timestamps near the i64 limits compare exactly
        if max_ts as i128 >= timestamp as i128 + self.window.secs() as i128 {
            return Admission::Rejected;
        }

        let replaced = match self.edges.find_edge_between(&edge) {
            Some(key) => {
                if let Some(old) = self.edges.remove(key) {
                    self.unlink(&old);
                }
                true
            }
            None => false,
        };

        self.insert_edge(timestamp, edge);

        let threshold = self
            .edges
            .max_timestamp()
            .and_then(|newest| newest.checked_sub(self.window.secs()));
        let evicted = match threshold {
            Some(threshold) => {
                let degrees = &mut self.degrees;
                self.edges.evict_older_than_or_equal(threshold, |old| {
                    let (a, b) = old.endpoints();
                    degrees.decrement(a);
                    degrees.decrement(b);
                })
            }
            None => 0,
        };

        self.admitted(replaced, evicted)
    }

    /// `None` while the graph is empty.
    pub fn median(&self) -> Option<Median> {
        self.degrees.median()
    }

    pub fn degree(&self, node: &str) -> Option<u64> {
        self.degrees.degree(node)
    }

    pub fn degree_values(&self) -> Vec<u64> {
        self.degrees.degree_values()
    }

    pub fn node_count(&self) -> usize {
        self.degrees.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn max_timestamp(&self) -> Option<i64> {
        self.edges.max_timestamp()
    }

    /// Retained `(timestamp, edge)` pairs, oldest first.
    pub fn edges(&self) -> impl Iterator<Item = (i64, &Edge)> + '_ {
        self.edges.iter()
    }

    fn insert_edge(&mut self, timestamp: i64, edge: Edge) {
        let (a, b) = edge.endpoints();
        self.degrees.increment(a);
        self.degrees.increment(b);
        self.edges.insert(timestamp, edge);
    }

    fn unlink(&mut self, edge: &Edge) {
        let (a, b) = edge.endpoints();
        self.degrees.decrement(a);
        self.degrees.decrement(b);
    }

    // Only called after an insert. The inserted edge is newer than the
    // eviction threshold, so its endpoints are always tracked here.
    fn admitted(&self, replaced: bool, evicted: usize) -> Admission {
        match self.degrees.median() {
            Some(median) => Admission::Admitted(AdmitReport { median, replaced, evicted }),
            None => unreachable!("admitted edge left the degree index empty"),
        }
    }
}
