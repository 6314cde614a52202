//! One epoch of training on one fold.
//!
//! Each epoch draws a fresh set of negatives (one per training positive),
//! shuffles the training positives, and walks them in mini-batches. Batch
//! `b` pairs positives `perm[b]` with negatives `perm[b]`, so every negative
//! is used exactly once per epoch.
//!
//! Node embeddings are computed once per epoch over the fixed training graph
//! and shared by every batch of that epoch. With the default batch size a
//! fold is a single batch.

use std::collections::HashSet;

use candle_core::{Tensor, D};
use linkfold_core::sampling::NegativeSampler;
use linkfold_core::CanonicalEdge;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};
use crate::graph_tensors::GraphTensors;
use crate::model::EdgeModel;
use crate::optim::{Adam, CosineAnnealing};

/// Probability clamp before taking logs in the BCE loss.
const PROB_EPS: f64 = 1e-7;

/// Fixed inputs of one fold's training.
#[derive(Clone, Copy)]
pub struct TrainingData<'a> {
    /// Node features `(N, F)`.
    pub features: &'a Tensor,
    /// Message-passing structure built from `positives`.
    pub graph: &'a GraphTensors,
    /// Supervision edges.
    pub positives: &'a [CanonicalEdge],
    /// Pairs online negatives must avoid.
    pub forbidden: &'a HashSet<CanonicalEdge>,
}

/// Outcome of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLoss {
    /// Loss of the final mini-batch.
    pub last_batch: f32,
    pub batches: usize,
    /// Learning rate after the last schedule step.
    pub learning_rate: f64,
}

/// Mean binary cross-entropy of `probs` against a constant label.
pub fn binary_cross_entropy(probs: &Tensor, target: bool) -> Result<Tensor> {
    let p = probs.clamp(PROB_EPS, 1.0 - PROB_EPS)?;
    let log_likelihood = if target {
        p.log()?
    } else {
        p.affine(-1.0, 1.0)?.log()?
    };
    Ok(log_likelihood.mean(D::Minus1)?.neg()?)
}

/// Run one epoch; returns the last batch's loss.
pub fn train_epoch<M, R>(
    model: &M,
    data: &TrainingData<'_>,
    sampler: &NegativeSampler,
    optimizer: &mut Adam,
    schedule: &mut CosineAnnealing,
    batch_size: usize,
    rng: &mut R,
) -> Result<EpochLoss>
where
    M: EdgeModel + ?Sized,
    R: Rng + ?Sized,
{
    if batch_size == 0 {
        return Err(Error::InvalidConfig("batch_size must be positive".to_string()));
    }
    let n = data.positives.len();
    if n == 0 {
        return Err(Error::Training("no training positives".to_string()));
    }

    let negatives = sampler.sample(n, data.forbidden, rng)?;

    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);

    let z = model.embed(data.features, data.graph, true)?;

    let mut last_batch = 0f32;
    let mut batches = 0usize;
    for chunk in perm.chunks(batch_size) {
        let pos: Vec<CanonicalEdge> = chunk.iter().map(|&i| data.positives[i]).collect();
        let neg: Vec<CanonicalEdge> = chunk.iter().map(|&i| negatives[i]).collect();

        let pos_out = model.score(&z, &pos, true)?;
        let neg_out = model.score(&z, &neg, true)?;
        let loss = (binary_cross_entropy(&pos_out, true)? + binary_cross_entropy(&neg_out, false)?)?;

        let grad_norm = optimizer.backward_step(&loss)?;
        optimizer.set_learning_rate(schedule.step());

        last_batch = loss.to_scalar::<f32>()?;
        batches += 1;
        tracing::debug!(batch = batches, loss = last_batch, grad_norm, "batch");
    }

    if !last_batch.is_finite() {
        return Err(Error::Training(format!("loss diverged: {last_batch}")));
    }

    Ok(EpochLoss {
        last_batch,
        batches,
        learning_rate: optimizer.learning_rate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderKind;
    use crate::graph_tensors::{node_features, FeatureMode};
    use crate::model::{LinkModel, ModelSpec};
    use crate::optim::AdamConfig;
    use candle_core::Device;
    use linkfold_core::edge::canonicalize;
    use linkfold_core::sampling::seeded_rng;
    use linkfold_core::TrainingGraph;

    #[test]
    fn test_bce_values() {
        let device = Device::Cpu;
        let p = Tensor::new(&[0.5f32, 0.5], &device).unwrap();
        let pos: f32 = binary_cross_entropy(&p, true).unwrap().to_scalar().unwrap();
        assert!((pos - 2f32.ln()).abs() < 1e-5);

        // Saturated predictions stay finite.
        let p = Tensor::new(&[0.0f32, 1.0], &device).unwrap();
        let pos: f32 = binary_cross_entropy(&p, true).unwrap().to_scalar().unwrap();
        let neg: f32 = binary_cross_entropy(&p, false).unwrap().to_scalar().unwrap();
        assert!(pos.is_finite() && neg.is_finite());
        assert!(pos > 5.0);
    }

    fn setup() -> (Vec<CanonicalEdge>, TrainingGraph, LinkModel) {
        // Hub 0 joined to 1..=8, plus a short tail 9-10-11 and one chord.
        let edges = canonicalize((1..=8).map(|i| (0, i)).chain(vec![(9, 10), (10, 11), (1, 2)]));
        let tg = TrainingGraph::new(&edges, 12);
        let spec = ModelSpec {
            encoder: EncoderKind::Gcn,
            in_channels: 1,
            encoder_channels: 8,
            hidden_channels: 8,
            encoder_dropout: 0.0,
            decoder_dropout: 0.0,
        };
        let model = LinkModel::new(&spec, 1, &Device::Cpu).unwrap();
        (edges, tg, model)
    }

    #[test]
    fn test_one_step_per_batch() {
        let (edges, tg, model) = setup();
        let features = node_features(&tg, FeatureMode::TrainDegree, &Device::Cpu).unwrap();
        let graph = GraphTensors::new(&tg, EncoderKind::Gcn.propagation(), &Device::Cpu).unwrap();
        let forbidden: HashSet<_> = edges.iter().copied().collect();
        let data = TrainingData {
            features: &features,
            graph: &graph,
            positives: &edges,
            forbidden: &forbidden,
        };

        let mut opt = Adam::new(model.parameters(), AdamConfig::default()).unwrap();
        let mut schedule = CosineAnnealing::new(1e-3, 10);
        let sampler = NegativeSampler::new(12);
        let mut rng = seeded_rng(0);

        // 11 positives in batches of 5 -> 3 batches.
        let out = train_epoch(&model, &data, &sampler, &mut opt, &mut schedule, 5, &mut rng).unwrap();
        assert_eq!(out.batches, 3);
        assert_eq!(opt.global_step(), 3);
        assert_eq!(schedule.current_step(), 3);
        assert!((out.learning_rate - schedule.lr()).abs() < 1e-15);
        assert!(out.last_batch.is_finite() && out.last_batch > 0.0);
    }

    #[test]
    fn test_loss_decreases_with_training() {
        let (edges, tg, model) = setup();
        let features = node_features(&tg, FeatureMode::TrainDegree, &Device::Cpu).unwrap();
        let graph = GraphTensors::new(&tg, EncoderKind::Gcn.propagation(), &Device::Cpu).unwrap();
        let forbidden: HashSet<_> = edges.iter().copied().collect();
        let data = TrainingData {
            features: &features,
            graph: &graph,
            positives: &edges,
            forbidden: &forbidden,
        };

        let mut opt = Adam::new(model.parameters(), AdamConfig { learning_rate: 0.01, ..Default::default() }).unwrap();
        let mut schedule = CosineAnnealing::new(0.01, 1000);
        let sampler = NegativeSampler::new(12);
        let mut rng = seeded_rng(4);

        let first = train_epoch(&model, &data, &sampler, &mut opt, &mut schedule, 1 << 20, &mut rng).unwrap();
        let mut last = first;
        for _ in 0..100 {
            last = train_epoch(&model, &data, &sampler, &mut opt, &mut schedule, 1 << 20, &mut rng).unwrap();
        }
        assert_eq!(first.batches, 1);
        assert!(last.last_batch < first.last_batch, "{} !< {}", last.last_batch, first.last_batch);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let (edges, tg, model) = setup();
        let features = node_features(&tg, FeatureMode::Ones, &Device::Cpu).unwrap();
        let graph = GraphTensors::new(&tg, EncoderKind::Gcn.propagation(), &Device::Cpu).unwrap();
        let forbidden: HashSet<_> = edges.iter().copied().collect();
        let data = TrainingData {
            features: &features,
            graph: &graph,
            positives: &edges,
            forbidden: &forbidden,
        };
        let mut opt = Adam::new(model.parameters(), AdamConfig::default()).unwrap();
        let mut schedule = CosineAnnealing::new(1e-3, 10);
        let res = train_epoch(
            &model,
            &data,
            &NegativeSampler::new(12),
            &mut opt,
            &mut schedule,
            0,
            &mut seeded_rng(0),
        );
        assert!(matches!(res, Err(Error::InvalidConfig(_))));
    }
}
