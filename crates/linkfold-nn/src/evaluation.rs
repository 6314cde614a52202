//! Batched scoring of a fold's held-out pairs.
//!
//! Embeddings are computed once per evaluation, without dropout and detached
//! from the autograd graph. Positive and negative pairs are scored in chunks
//! of `batch_size`, concatenated, and reduced to AUC and AP.

use candle_core::Tensor;
use linkfold_core::{CanonicalEdge, Evaluation, Fold, LinkScores};

use crate::error::{Error, Result};
use crate::graph_tensors::GraphTensors;
use crate::model::EdgeModel;

/// Score `pairs` in chunks of `batch_size`.
pub fn score_pairs<M: EdgeModel + ?Sized>(
    model: &M,
    embeddings: &Tensor,
    pairs: &[CanonicalEdge],
    batch_size: usize,
) -> Result<Vec<f64>> {
    if batch_size == 0 {
        return Err(Error::InvalidConfig("batch_size must be positive".to_string()));
    }
    let mut scores = Vec::with_capacity(pairs.len());
    for chunk in pairs.chunks(batch_size) {
        let probs: Vec<f32> = model.score(embeddings, chunk, false)?.to_vec1()?;
        if probs.len() != chunk.len() {
            return Err(Error::DimensionMismatch {
                expected: chunk.len(),
                got: probs.len(),
            });
        }
        scores.extend(probs.into_iter().map(f64::from));
    }
    Ok(scores)
}

/// AUC/AP of one split.
pub fn evaluate_split<M: EdgeModel + ?Sized>(
    model: &M,
    embeddings: &Tensor,
    name: &str,
    positives: &[CanonicalEdge],
    negatives: &[CanonicalEdge],
    batch_size: usize,
) -> Result<LinkScores> {
    let pos = score_pairs(model, embeddings, positives, batch_size)?;
    let neg = score_pairs(model, embeddings, negatives, batch_size)?;
    Ok(LinkScores::from_scores(name, &pos, &neg)?)
}

/// Validation and test scores for `fold` under the current parameters.
pub fn evaluate<M: EdgeModel + ?Sized>(
    model: &M,
    features: &Tensor,
    graph: &GraphTensors,
    fold: &Fold,
    batch_size: usize,
) -> Result<Evaluation> {
    let z = model.embed(features, graph, false)?.detach();
    let valid = evaluate_split(model, &z, "valid", &fold.val_pos, &fold.val_neg, batch_size)?;
    let test = evaluate_split(model, &z, "test", &fold.test_pos, &fold.test_neg, batch_size)?;
    Ok(Evaluation { valid, test })
}
