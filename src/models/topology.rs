use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Undirected adjacency between two display names
///
/// The pair is stored sorted, so `(A, B)` and `(B, A)` are the same edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct TopologyEdge(String, String);

impl From<(String, String)> for TopologyEdge {
    fn from((a, b): (String, String)) -> Self {
        Self::new(a, b)
    }
}

impl From<TopologyEdge> for (String, String) {
    fn from(edge: TopologyEdge) -> Self {
        (edge.0, edge.1)
    }
}

impl TopologyEdge {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.0, &self.1)
    }

    pub fn is_self_loop(&self) -> bool {
        self.0 == self.1
    }

    pub fn touches(&self, name: &str) -> bool {
        self.0 == name || self.1 == name
    }
}

/// Deduplicated set of edges, serialized as a list of two-name lists
///
/// Loading goes through [`TopologySnapshot::insert`], so stored files with
/// unsorted pairs or self-loops come back canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TopologyEdge>", into = "Vec<TopologyEdge>")]
pub struct TopologySnapshot {
    edges: BTreeSet<TopologyEdge>,
}

impl TopologySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge; self-loops are rejected. Returns true if the edge was new
    pub fn insert(&mut self, edge: TopologyEdge) -> bool {
        if edge.is_self_loop() {
            return false;
        }
        self.edges.insert(edge)
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.edges.contains(&TopologyEdge::new(a, b))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopologyEdge> {
        self.edges.iter()
    }
}

impl FromIterator<TopologyEdge> for TopologySnapshot {
    fn from_iter<I: IntoIterator<Item = TopologyEdge>>(iter: I) -> Self {
        let mut snapshot = TopologySnapshot::new();
        for edge in iter {
            snapshot.insert(edge);
        }
        snapshot
    }
}

impl From<Vec<TopologyEdge>> for TopologySnapshot {
    fn from(edges: Vec<TopologyEdge>) -> Self {
        edges.into_iter().collect()
    }
}

impl From<TopologySnapshot> for Vec<TopologyEdge> {
    fn from(snapshot: TopologySnapshot) -> Self {
        snapshot.edges.into_iter().collect()
    }
}
