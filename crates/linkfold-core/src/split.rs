//! Leakage-free k-fold edge splitting.
//!
//! The canonical edge set is shuffled once and cut into `k` near-equal
//! contiguous groups. Fold `i` tests on group `i`; the remaining groups are
//! shuffled again and a validation slice is carved off the front. Held-out
//! negatives are then drawn against the full positive set, test first, so
//! neither negative pool can contain a real edge or each other's pairs.
//!
//! # Example
//!
//! ```rust
//! use linkfold_core::edge::canonicalize;
//! use linkfold_core::split::{split, SplitConfig};
//!
//! let edges = canonicalize((0..20).map(|i| (i, (i + 1) % 20)));
//! let folds = split(&edges, 20, &SplitConfig::default().with_folds(4)).unwrap();
//!
//! assert_eq!(folds.len(), 4);
//! for fold in &folds {
//!     assert_eq!(fold.test_pos.len(), fold.test_neg.len());
//!     assert_eq!(fold.val_pos.len(), fold.val_neg.len());
//! }
//! ```

use std::collections::HashSet;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::edge::{symmetrize, with_self_loops, CanonicalEdge};
use crate::sampling::{derive_seed, seeded_rng, NegativeSampler, SamplerConfig};
use crate::{Error, Result};

/// Stream ids mixed into the split seed.
const PARTITION_STREAM: u64 = 0;
const TRAIN_SHUFFLE_STREAM: u64 = 1;
const NEGATIVE_STREAM: u64 = 2;

/// Fold splitting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Number of folds `k` (default: 5).
    pub folds: usize,
    /// Fraction of each fold's training edges held out for validation
    /// (default: 0.1). At least one edge is always held out.
    pub val_fraction: f64,
    /// Base seed for shuffles and negative sampling (default: 42).
    pub seed: u64,
    /// Draw budget for held-out negative sampling.
    #[serde(skip)]
    pub sampler: SamplerConfig,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            val_fraction: 0.1,
            seed: 42,
            sampler: SamplerConfig::default(),
        }
    }
}

impl SplitConfig {
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_val_fraction(mut self, val_fraction: f64) -> Self {
        self.val_fraction = val_fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerConfig) -> Self {
        self.sampler = sampler;
        self
    }

    /// Check ranges that do not depend on the edge count.
    pub fn validate(&self) -> Result<()> {
        if self.folds < 2 {
            return Err(Error::InvalidConfig(format!(
                "need at least 2 folds, got {}",
                self.folds
            )));
        }
        if !(self.val_fraction > 0.0 && self.val_fraction < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "val_fraction must be in (0, 1), got {}",
                self.val_fraction
            )));
        }
        Ok(())
    }
}

/// One train/validation/test partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    pub train_pos: Vec<CanonicalEdge>,
    pub val_pos: Vec<CanonicalEdge>,
    pub val_neg: Vec<CanonicalEdge>,
    pub test_pos: Vec<CanonicalEdge>,
    pub test_neg: Vec<CanonicalEdge>,
}

impl Fold {
    /// Validation and test negatives together.
    pub fn held_out_negatives(&self) -> impl Iterator<Item = &CanonicalEdge> {
        self.val_neg.iter().chain(self.test_neg.iter())
    }

    /// The message-passing graph for this fold.
    pub fn training_graph(&self, num_nodes: usize) -> TrainingGraph {
        TrainingGraph::new(&self.train_pos, num_nodes)
    }
}

/// Directed message-passing structure for one fold.
///
/// Holds both directions of every training positive plus one self-loop per
/// node. Validation and test edges never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingGraph {
    num_nodes: usize,
    pairs: Vec<(usize, usize)>,
}

impl TrainingGraph {
    pub fn new(train_pos: &[CanonicalEdge], num_nodes: usize) -> Self {
        Self {
            num_nodes,
            pairs: with_self_loops(symmetrize(train_pos), num_nodes),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Directed `(source, target)` pairs, self-loops included.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }
}

/// Split canonical edges into `config.folds` folds.
///
/// Input is canonicalized again, so any orientation or duplicate is fine.
/// Identical inputs and seed produce identical folds.
pub fn split(edges: &[CanonicalEdge], num_nodes: usize, config: &SplitConfig) -> Result<Vec<Fold>> {
    config.validate()?;

    let mut edges = edges.to_vec();
    edges.sort_unstable();
    edges.dedup();

    if edges.is_empty() {
        return Err(Error::EmptyGraph);
    }
    if let Some(bad) = edges.iter().find(|e| e.v() >= num_nodes) {
        return Err(Error::InvalidConfig(format!(
            "edge {} out of range for {} nodes",
            bad, num_nodes
        )));
    }

    let n = edges.len();
    let k = config.folds;
    if k > n {
        return Err(Error::InvalidConfig(format!(
            "{} folds requested but only {} edges",
            k, n
        )));
    }

    let positives: HashSet<CanonicalEdge> = edges.iter().copied().collect();
    let sampler = NegativeSampler::new(num_nodes).with_config(config.sampler);

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut seeded_rng(derive_seed(config.seed, PARTITION_STREAM)));

    let base = n / k;
    let extra = n % k;
    let mut bounds = Vec::with_capacity(k + 1);
    bounds.push(0);
    for i in 0..k {
        let size = base + usize::from(i < extra);
        bounds.push(bounds[i] + size);
    }

    let mut folds = Vec::with_capacity(k);
    for i in 0..k {
        let (start, end) = (bounds[i], bounds[i + 1]);
        let test_pos: Vec<CanonicalEdge> = order[start..end].iter().map(|&j| edges[j]).collect();
        let mut train_raw: Vec<CanonicalEdge> = order[..start]
            .iter()
            .chain(order[end..].iter())
            .map(|&j| edges[j])
            .collect();

        let fold_seed = derive_seed(config.seed, i as u64 + 1);
        train_raw.shuffle(&mut seeded_rng(derive_seed(fold_seed, TRAIN_SHUFFLE_STREAM)));

        let n_val = ((config.val_fraction * train_raw.len() as f64).floor() as usize).max(1);
        let n_val = n_val.min(train_raw.len());
        let train_pos = train_raw.split_off(n_val);
        let val_pos = train_raw;

        for (name, set) in [("test", &test_pos), ("validation", &val_pos), ("train", &train_pos)] {
            if set.is_empty() {
                return Err(Error::InsufficientPositives {
                    split: format!("fold {} {}", i, name),
                    positives: 0,
                    negatives: 0,
                });
            }
        }

        let mut rng = seeded_rng(derive_seed(fold_seed, NEGATIVE_STREAM));
        let test_neg = sampler.sample(test_pos.len(), &positives, &mut rng)?;

        let mut forbidden = positives.clone();
        forbidden.extend(test_neg.iter().copied());
        let val_neg = sampler.sample(val_pos.len(), &forbidden, &mut rng)?;

        tracing::debug!(
            fold = i,
            train = train_pos.len(),
            val = val_pos.len(),
            test = test_pos.len(),
            "built fold"
        );

        folds.push(Fold {
            index: i,
            train_pos,
            val_pos,
            val_neg,
            test_pos,
            test_neg,
        });
    }

    tracing::info!(folds = k, edges = n, nodes = num_nodes, "split edges into folds");
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::canonicalize;

    fn ring(n: usize) -> Vec<CanonicalEdge> {
        canonicalize((0..n).map(|i| (i, (i + 1) % n)))
    }

    #[test]
    fn test_group_sizes_are_near_equal() {
        let edges = ring(23);
        let folds = split(&edges, 23, &SplitConfig::default()).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.test_pos.len()).collect();
        assert_eq!(sizes, vec![5, 5, 5, 4, 4]);
    }

    #[test]
    fn test_validation_floor() {
        // 10 edges, k=5 -> 8 training edges, 0.1 * 8 floors to 0, held out 1.
        let edges = ring(10);
        let folds = split(&edges, 10, &SplitConfig::default()).unwrap();
        for f in &folds {
            assert_eq!(f.val_pos.len(), 1);
            assert_eq!(f.train_pos.len(), 7);
        }
    }

    #[test]
    fn test_rejects_bad_config() {
        let edges = ring(6);
        assert!(matches!(
            split(&edges, 6, &SplitConfig::default().with_folds(1)),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            split(&edges, 6, &SplitConfig::default().with_folds(7)),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            split(&edges, 6, &SplitConfig::default().with_val_fraction(1.0)),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            split(&[], 6, &SplitConfig::default()),
            Err(Error::EmptyGraph)
        ));
    }

    #[test]
    fn test_empty_training_split_is_an_error() {
        // Two edges, two folds: one test edge, the other goes to validation.
        let edges = canonicalize(vec![(0, 1), (2, 3)]);
        let res = split(&edges, 4, &SplitConfig::default().with_folds(2));
        assert!(matches!(res, Err(Error::InsufficientPositives { .. })));
    }

    #[test]
    fn test_dense_graph_exhausts_negatives() {
        // K4 minus one edge: 5 edges, 1 free pair, but test negatives need more.
        let edges = canonicalize(vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3)]);
        let res = split(&edges, 4, &SplitConfig::default().with_folds(2));
        assert!(matches!(res, Err(Error::NonEdgeSpaceExhausted { .. })));
    }

    #[test]
    fn test_training_graph_has_no_held_out_edges() {
        let edges = ring(15);
        let folds = split(&edges, 15, &SplitConfig::default()).unwrap();
        let f = &folds[0];
        let tg = f.training_graph(15);

        assert_eq!(tg.pairs().len(), 2 * f.train_pos.len() + 15);
        for e in f.val_pos.iter().chain(f.test_pos.iter()) {
            assert!(!tg.pairs().contains(&(e.u(), e.v())));
            assert!(!tg.pairs().contains(&(e.v(), e.u())));
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let edges = ring(40);
        let a = split(&edges, 40, &SplitConfig::default().with_seed(1)).unwrap();
        let b = split(&edges, 40, &SplitConfig::default().with_seed(2)).unwrap();
        assert_ne!(a, b);
    }
}
