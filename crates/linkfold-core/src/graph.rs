//! Graph loading and statistics.
//!
//! Edge lists are whitespace-separated `u v` pairs. Ids are remapped to
//! `0..N-1` in sorted order; the original id of every node is kept.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::edge::{canonicalize, CanonicalEdge};
use crate::{Error, Result};

/// An undirected, unweighted graph with dense node ids.
///
/// Node ids are `0..num_nodes`, assigned by sorted order of the ids in the
/// source edge list. The edge set is canonical (see [`crate::edge`]).
///
/// # Example
///
/// ```rust
/// use linkfold_core::Graph;
///
/// let text = "10 20\n20 30\n30 10\n";
/// let g = Graph::from_edge_list(text.as_bytes()).unwrap();
///
/// assert_eq!(g.num_nodes(), 3);
/// assert_eq!(g.num_edges(), 3);
/// assert_eq!(g.original_id(0), Some(10));
/// ```
#[derive(Debug, Clone)]
pub struct Graph {
    num_nodes: usize,
    edges: Vec<CanonicalEdge>,
    /// original_ids[i] is the source id remapped to `i`.
    original_ids: Vec<i64>,
}

/// Summary statistics about a graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphStats {
    pub num_nodes: usize,
    pub num_edges: usize,
    /// Number of unordered node pairs `N(N-1)/2`.
    pub num_pairs: usize,
    /// Pairs that are not edges.
    pub num_non_edges: usize,
    pub density: f64,
    pub avg_degree: f64,
    pub max_degree: usize,
}

impl Graph {
    /// Build a graph from already-dense node ids.
    ///
    /// Self-loops are dropped; duplicate and reversed edges collapse.
    pub fn from_edges(num_nodes: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Result<Self> {
        let edges = canonicalize(edges);
        if let Some(bad) = edges.iter().find(|e| e.v() >= num_nodes) {
            return Err(Error::InvalidConfig(format!(
                "edge {} out of range for {} nodes",
                bad, num_nodes
            )));
        }
        Ok(Self {
            num_nodes,
            edges,
            original_ids: (0..num_nodes as i64).collect(),
        })
    }

    /// Parse a plain-text edge list: one `u v` integer pair per line.
    ///
    /// Blank lines and lines starting with `#` are skipped; extra columns are
    /// ignored. Node ids need not be contiguous and are remapped to
    /// `0..N-1` by sorted order. Self-loops are dropped with a warning.
    pub fn from_edge_list<R: std::io::Read>(reader: R) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut raw: Vec<(i64, i64)> = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let parsed = match (parts.next(), parts.next()) {
                (Some(a), Some(b)) => a.parse::<i64>().ok().zip(b.parse::<i64>().ok()),
                _ => None,
            };
            match parsed {
                Some(pair) => raw.push(pair),
                None => {
                    return Err(Error::Parse {
                        line: idx + 1,
                        content: line.clone(),
                    })
                }
            }
        }

        let ids: BTreeSet<i64> = raw.iter().flat_map(|&(a, b)| [a, b]).collect();
        let original_ids: Vec<i64> = ids.into_iter().collect();
        let remap: HashMap<i64, usize> = original_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let self_loops = raw.iter().filter(|(a, b)| a == b).count();
        if self_loops > 0 {
            tracing::warn!(self_loops, "dropping self-loops from edge list");
        }

        let edges = canonicalize(raw.iter().map(|(a, b)| (remap[a], remap[b])));

        Ok(Self {
            num_nodes: original_ids.len(),
            edges,
            original_ids,
        })
    }

    /// Load an edge list file. See [`Graph::from_edge_list`].
    pub fn from_edge_list_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_edge_list(file)
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Canonical edges, sorted ascending.
    pub fn edges(&self) -> &[CanonicalEdge] {
        &self.edges
    }

    /// Source id for a dense node id.
    pub fn original_id(&self, node: usize) -> Option<i64> {
        self.original_ids.get(node).copied()
    }

    /// The canonical edge set, for membership queries.
    pub fn edge_set(&self) -> HashSet<CanonicalEdge> {
        self.edges.iter().copied().collect()
    }

    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        CanonicalEdge::new(a, b).is_some_and(|e| self.edges.binary_search(&e).is_ok())
    }

    /// Undirected degree per node.
    pub fn degrees(&self) -> Vec<usize> {
        let mut deg = vec![0usize; self.num_nodes];
        for e in &self.edges {
            deg[e.u()] += 1;
            deg[e.v()] += 1;
        }
        deg
    }

    pub fn stats(&self) -> GraphStats {
        let n = self.num_nodes;
        let num_pairs = n * n.saturating_sub(1) / 2;
        let degrees = self.degrees();
        GraphStats {
            num_nodes: n,
            num_edges: self.edges.len(),
            num_pairs,
            num_non_edges: num_pairs - self.edges.len(),
            density: if num_pairs == 0 {
                0.0
            } else {
                self.edges.len() as f64 / num_pairs as f64
            },
            avg_degree: if n == 0 {
                0.0
            } else {
                2.0 * self.edges.len() as f64 / n as f64
            },
            max_degree: degrees.into_iter().max().unwrap_or(0),
        }
    }
}
