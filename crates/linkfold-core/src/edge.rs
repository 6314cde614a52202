//! Canonical undirected edges.
//!
//! Every split and sampling decision in this crate is made on a single,
//! order-independent representation of an undirected edge: the pair
//! `(min(u, v), max(u, v))`. Set membership, deduplication and fold
//! assignment all key on it, so `(3, 1)` and `(1, 3)` are the same edge
//! everywhere.
//!
//! | Helper | Output | Used by |
//! |--------|--------|---------|
//! | [`canonicalize`] | sorted, deduplicated `u < v` pairs | fold splitting |
//! | [`symmetrize`] | both directions of each edge | message passing |
//! | [`with_self_loops`] | directed pairs plus `(i, i)` for all nodes | encoder input |

use std::fmt;

use serde::{Deserialize, Serialize};

/// An undirected edge stored as `(u, v)` with `u < v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalEdge {
    u: usize,
    v: usize,
}

impl CanonicalEdge {
    /// Canonicalize an endpoint pair.
    ///
    /// Returns `None` for self-loops, which have no canonical form.
    pub fn new(a: usize, b: usize) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { u: a, v: b }),
            std::cmp::Ordering::Greater => Some(Self { u: b, v: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Smaller endpoint.
    pub fn u(&self) -> usize {
        self.u
    }

    /// Larger endpoint.
    pub fn v(&self) -> usize {
        self.v
    }

    pub fn as_pair(&self) -> (usize, usize) {
        (self.u, self.v)
    }
}

impl fmt::Display for CanonicalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.u, self.v)
    }
}

/// Canonicalize an edge enumeration.
///
/// Maps every pair to `(min, max)`, drops self-loops, sorts ascending and
/// removes duplicates. The sort order is fixed so that seeded fold
/// assignment downstream is reproducible.
pub fn canonicalize<I>(edges: I) -> Vec<CanonicalEdge>
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut out: Vec<CanonicalEdge> = edges
        .into_iter()
        .filter_map(|(a, b)| CanonicalEdge::new(a, b))
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Both directions of every edge: `(u, v), (v, u), ...`.
pub fn symmetrize(edges: &[CanonicalEdge]) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(edges.len() * 2);
    for e in edges {
        out.push((e.u, e.v));
        out.push((e.v, e.u));
    }
    out
}

/// Append one `(i, i)` self-loop for every node in `0..num_nodes`.
pub fn with_self_loops(mut pairs: Vec<(usize, usize)>, num_nodes: usize) -> Vec<(usize, usize)> {
    pairs.reserve(num_nodes);
    pairs.extend((0..num_nodes).map(|i| (i, i)));
    pairs
}
