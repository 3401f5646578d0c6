//! Per-node degree bookkeeping with a sorted multiset of degree values.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Exact median of a set of integer degrees.
///
/// Stored doubled so that the mean of two middle values stays an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Median {
    doubled: u64,
}

impl Median {
    pub fn from_middle(lower: u64, upper: u64) -> Self {
        Median { doubled: lower + upper }
    }

    pub fn whole(value: u64) -> Self {
        Median { doubled: value * 2 }
    }

    pub fn as_f64(&self) -> f64 {
        self.doubled as f64 / 2.0
    }
}

/// Fixed-point with two fractional digits: `1.00`, `1.50`.
impl fmt::Display for Median {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frac = if self.doubled % 2 == 1 { 50 } else { 0 };
        write!(f, "{}.{:02}", self.doubled / 2, frac)
    }
}

#[derive(Debug, Default, Clone)]
pub struct DegreeIndex {
    nodes: HashMap<String, u64>,
    // degree value -> number of nodes currently holding it
    values: BTreeMap<u64, usize>,
}

impl DegreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, node: &str) {
        match self.nodes.get_mut(node) {
            Some(degree) => {
                let old = *degree;
                *degree += 1;
                Self::take_value(&mut self.values, old);
                Self::put_value(&mut self.values, old + 1);
            }
            None => {
                self.nodes.insert(node.to_string(), 1);
                Self::put_value(&mut self.values, 1);
            }
        }
    }

    /// Returns `false` if the node was not tracked.
    pub fn decrement(&mut self, node: &str) -> bool {
        let Some(degree) = self.nodes.get_mut(node) else {
            return false;
        };
        let old = *degree;
        Self::take_value(&mut self.values, old);
        if old == 1 {
            self.nodes.remove(node);
        } else {
            *degree -= 1;
            Self::put_value(&mut self.values, old - 1);
        }
        true
    }

    /// `None` until at least one node is tracked.
    pub fn median(&self) -> Option<Median> {
        let n = self.nodes.len();
        if n == 0 {
            return None;
        }
        if n % 2 == 1 {
            self.nth_value(n / 2).map(Median::whole)
        } else {
            let lower = self.nth_value(n / 2 - 1)?;
            let upper = self.nth_value(n / 2)?;
            Some(Median::from_middle(lower, upper))
        }
    }

    pub fn degree(&self, node: &str) -> Option<u64> {
        self.nodes.get(node).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All degree values in ascending order, one per node.
    pub fn degree_values(&self) -> Vec<u64> {
        self.values
            .iter()
            .flat_map(|(value, count)| std::iter::repeat(*value).take(*count))
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.nodes.iter().map(|(name, d)| (name.as_str(), *d))
    }

    // Zero-based position in the sorted multiset.
    fn nth_value(&self, index: usize) -> Option<u64> {
        let mut seen = 0usize;
        for (value, count) in &self.values {
            seen += count;
            if index < seen {
                return Some(*value);
            }
        }
        None
    }

    fn put_value(values: &mut BTreeMap<u64, usize>, value: u64) {
        *values.entry(value).or_insert(0) += 1;
    }

    fn take_value(values: &mut BTreeMap<u64, usize>, value: u64) {
        if let Some(count) = values.get_mut(&value) {
            *count -= 1;
            if *count == 0 {
                values.remove(&value);
            }
        }
    }
}
