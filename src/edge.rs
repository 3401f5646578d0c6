use std::fmt;

/// An undirected payment edge between two users.
///
/// The endpoints are kept in sorted order, so `Edge::new("a", "b")` and
/// `Edge::new("b", "a")` compare and hash equal. `new` is the only
/// constructor, so every `Edge` is in that order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    lo: String,
    hi: String,
}

impl Edge {
    pub fn new(actor: impl Into<String>, target: impl Into<String>) -> Self {
        let (a, b) = (actor.into(), target.into());
        if a <= b {
            Edge { lo: a, hi: b }
        } else {
            Edge { lo: b, hi: a }
        }
    }

    /// Both endpoints, smaller name first.
    pub fn endpoints(&self) -> (&str, &str) {
        (&self.lo, &self.hi)
    }

    pub fn touches(&self, node: &str) -> bool {
        self.lo == node || self.hi == node
    }

    pub fn is_loop(&self) -> bool {
        self.lo == self.hi
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.lo, self.hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_does_not_matter() {
        assert_eq!(Edge::new("alice", "bob"), Edge::new("bob", "alice"));
        assert_eq!(Edge::new("bob", "alice").endpoints(), ("alice", "bob"));
    }

    #[test]
    fn different_pairs_differ() {
        assert_ne!(Edge::new("alice", "bob"), Edge::new("alice", "carol"));
        assert!(Edge::new("alice", "bob").touches("bob"));
        assert!(!Edge::new("alice", "bob").touches("carol"));
    }

    #[test]
    fn endpoints_always_sorted() {
        for (a, b) in [("zed", "amy"), ("amy", "zed"), ("B", "a"), ("same", "same"), ("", "x")] {
            let edge = Edge::new(a, b);
            let (lo, hi) = edge.endpoints();
            assert!(lo <= hi, "{} > {}", lo, hi);
            assert_eq!(Edge::new(a, b), Edge::new(b, a));
        }
    }

    #[test]
    fn loop_edge() {
        let e = Edge::new("alice", "alice");
        assert!(e.is_loop());
        assert_eq!(e.to_string(), "alice <-> alice");
    }
}
