//! Negative sampling over the non-edge space.
//!
//! A negative is an unordered node pair `(u, v)`, `u != v`, that is not a
//! known edge. Each sampling context (validation, test, per-epoch training)
//! passes its own forbidden set so that negatives never collide with
//! positives, and held-out negatives never collide with each other.
//!
//! # Key Types
//!
//! - [`NegativeSampler`] - rejection sampler bound to a node universe
//! - [`sample_negatives`] - one-shot convenience wrapper
//! - [`seeded_rng`] / [`derive_seed`] - explicit, reproducible random streams
//!
//! # Exhaustion
//!
//! Rejection sampling never terminates when fewer free pairs exist than
//! requested (dense or complete graphs). The sampler counts the free pair
//! space up front and also caps the number of draws, failing with
//! [`Error::NonEdgeSpaceExhausted`] instead of spinning.

use std::collections::HashSet;

use rand::prelude::*;
use rand_xorshift::XorShiftRng;

use crate::edge::CanonicalEdge;
use crate::{Error, Result};

/// Sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Draw budget per requested negative (default: 1000).
    ///
    /// The sampler gives up after `count * max_draws_per_sample` draws.
    pub max_draws_per_sample: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_draws_per_sample: 1000,
        }
    }
}

/// Rejection sampler for non-edges over the node universe `0..num_nodes`.
#[derive(Debug, Clone)]
pub struct NegativeSampler {
    num_nodes: usize,
    config: SamplerConfig,
}

impl NegativeSampler {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            config: SamplerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of unordered pairs in the universe that are not forbidden.
    pub fn free_pairs(&self, forbidden: &HashSet<CanonicalEdge>) -> usize {
        let n = self.num_nodes;
        let total = n * n.saturating_sub(1) / 2;
        let blocked = forbidden.iter().filter(|e| e.v() < n).count();
        total - blocked
    }

    /// Draw `count` distinct negatives, none of them in `forbidden`.
    ///
    /// Nodes are drawn uniformly; self-loops, forbidden pairs and pairs
    /// already drawn in this call are rejected. Output is in draw order.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        count: usize,
        forbidden: &HashSet<CanonicalEdge>,
        rng: &mut R,
    ) -> Result<Vec<CanonicalEdge>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let available = self.free_pairs(forbidden);
        if available < count {
            return Err(Error::NonEdgeSpaceExhausted {
                requested: count,
                available,
            });
        }

        let max_draws = count.saturating_mul(self.config.max_draws_per_sample.max(1));
        let mut drawn: HashSet<CanonicalEdge> = HashSet::with_capacity(count);
        let mut out = Vec::with_capacity(count);
        let mut draws = 0usize;

        while out.len() < count {
            if draws >= max_draws {
                tracing::warn!(count, draws, found = out.len(), "negative sampling hit draw ceiling");
                return Err(Error::NonEdgeSpaceExhausted {
                    requested: count,
                    available: out.len(),
                });
            }
            draws += 1;

            let a = rng.gen_range(0..self.num_nodes);
            let b = rng.gen_range(0..self.num_nodes);
            let Some(pair) = CanonicalEdge::new(a, b) else {
                continue;
            };
            if forbidden.contains(&pair) || !drawn.insert(pair) {
                continue;
            }
            out.push(pair);
        }

        tracing::debug!(count, draws, "sampled negatives");
        Ok(out)
    }
}

/// Draw `count` negatives from `0..num_nodes` avoiding `forbidden`.
pub fn sample_negatives<R: Rng + ?Sized>(
    count: usize,
    forbidden: &HashSet<CanonicalEdge>,
    num_nodes: usize,
    rng: &mut R,
) -> Result<Vec<CanonicalEdge>> {
    NegativeSampler::new(num_nodes).sample(count, forbidden, rng)
}

/// Deterministic RNG for a seed.
pub fn seeded_rng(seed: u64) -> XorShiftRng {
    XorShiftRng::seed_from_u64(seed)
}

/// Mix a base seed and a stream id into an independent seed (splitmix64).
///
/// Components derive their streams from the experiment seed instead of
/// sharing one generator, so results do not depend on call order.
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base
        .wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
