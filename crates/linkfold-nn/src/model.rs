//! Encoder-decoder link prediction model and its parameter handling.
//!
//! The harness only needs three capabilities from a model, captured by
//! [`EdgeModel`]: embed nodes, score pairs from embeddings, and expose the
//! parameters for optimization and snapshotting. [`LinkModel`] is the
//! concrete GNN encoder + MLP decoder implementation.
//!
//! Parameters are initialized from an explicit seed rather than candle's
//! process-wide generator, so two models built with the same seed are
//! identical.

use std::collections::BTreeMap;

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use linkfold_core::sampling::seeded_rng;
use linkfold_core::CanonicalEdge;
use rand::Rng;

use crate::decoder::EdgeDecoder;
use crate::encoder::{Encoder, EncoderKind};
use crate::error::{Error, Result};
use crate::graph_tensors::GraphTensors;

/// What the training loop and evaluator need from a model.
pub trait EdgeModel {
    /// Node embeddings `(N, d)` for the given features and graph.
    fn embed(&self, features: &Tensor, graph: &GraphTensors, train: bool) -> Result<Tensor>;

    /// Link probabilities `(B,)` in `[0, 1]` for `pairs`.
    fn score(&self, embeddings: &Tensor, pairs: &[CanonicalEdge], train: bool) -> Result<Tensor>;

    /// Trainable parameters.
    fn parameters(&self) -> &VarMap;
}

/// Architecture hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpec {
    pub encoder: EncoderKind,
    pub in_channels: usize,
    pub encoder_channels: usize,
    pub hidden_channels: usize,
    pub encoder_dropout: f32,
    pub decoder_dropout: f32,
}

/// GNN encoder followed by an MLP edge decoder.
pub struct LinkModel {
    varmap: VarMap,
    encoder: Encoder,
    decoder: EdgeDecoder,
    encoder_dropout: f32,
    device: Device,
}

impl LinkModel {
    /// Build a model with fresh parameters drawn from `seed`.
    pub fn new(spec: &ModelSpec, seed: u64, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let encoder = Encoder::new(spec.encoder, spec.in_channels, spec.encoder_channels, vb.pp("encoder"))?;
        let decoder = EdgeDecoder::new(
            spec.encoder_channels,
            spec.hidden_channels,
            spec.decoder_dropout,
            vb.pp("decoder"),
        )?;

        init_parameters(&varmap, &mut seeded_rng(seed))?;

        Ok(Self {
            varmap,
            encoder,
            decoder,
            encoder_dropout: spec.encoder_dropout,
            device: device.clone(),
        })
    }

    pub fn encoder_kind(&self) -> EncoderKind {
        self.encoder.kind()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Total number of scalar parameters.
    pub fn num_parameters(&self) -> Result<usize> {
        Ok(named_vars(&self.varmap)?
            .iter()
            .map(|(_, v)| v.as_tensor().elem_count())
            .sum())
    }
}

impl EdgeModel for LinkModel {
    fn embed(&self, features: &Tensor, graph: &GraphTensors, train: bool) -> Result<Tensor> {
        let z = self.encoder.forward(features, graph)?;
        if train && self.encoder_dropout > 0.0 {
            Ok(candle_nn::ops::dropout(&z, self.encoder_dropout)?)
        } else {
            Ok(z)
        }
    }

    fn score(&self, embeddings: &Tensor, pairs: &[CanonicalEdge], train: bool) -> Result<Tensor> {
        let (src, dst) = pair_indices(pairs, embeddings.device())?;
        Ok(self.decoder.forward(embeddings, &src, &dst, train)?)
    }

    fn parameters(&self) -> &VarMap {
        &self.varmap
    }
}

/// `u32` index vectors for the two endpoints of each pair.
pub fn pair_indices(pairs: &[CanonicalEdge], device: &Device) -> Result<(Tensor, Tensor)> {
    let src: Vec<u32> = pairs.iter().map(|e| e.u() as u32).collect();
    let dst: Vec<u32> = pairs.iter().map(|e| e.v() as u32).collect();
    let n = pairs.len();
    Ok((
        Tensor::from_vec(src, n, device)?,
        Tensor::from_vec(dst, n, device)?,
    ))
}

/// Variables of a `VarMap`, sorted by name.
pub fn named_vars(varmap: &VarMap) -> Result<Vec<(String, Var)>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|e| Error::Training(format!("parameter map lock poisoned: {e}")))?;
    let mut vars: Vec<(String, Var)> = data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(vars)
}

/// Overwrite every variable: Glorot-uniform for tensors of rank >= 2, zeros
/// for vectors. Variables are visited in name order.
pub fn init_parameters<R: Rng + ?Sized>(varmap: &VarMap, rng: &mut R) -> Result<()> {
    for (name, var) in named_vars(varmap)? {
        let t = var.as_tensor();
        let dims = t.dims().to_vec();
        let count = t.elem_count();

        let values: Vec<f32> = if dims.len() >= 2 {
            let fan = dims[dims.len() - 1] + dims[dims.len() - 2];
            let limit = (6.0 / fan.max(1) as f32).sqrt();
            (0..count).map(|_| rng.gen_range(-limit..=limit)).collect()
        } else {
            vec![0.0; count]
        };

        let fresh = Tensor::from_vec(values, dims.as_slice(), t.device())?.to_dtype(t.dtype())?;
        var.set(&fresh)?;
        tracing::trace!(name = %name, ?dims, "initialized parameter");
    }
    Ok(())
}

/// Deep copy of every parameter, keyed by name.
#[derive(Debug, Clone)]
pub struct ParameterSnapshot {
    tensors: BTreeMap<String, Tensor>,
}

impl ParameterSnapshot {
    /// Copy the current parameter values out of `varmap`.
    pub fn capture(varmap: &VarMap) -> Result<Self> {
        let mut tensors = BTreeMap::new();
        for (name, var) in named_vars(varmap)? {
            tensors.insert(name, var.as_tensor().detach().copy()?);
        }
        Ok(Self { tensors })
    }

    /// Write the snapshot back into the live variables.
    pub fn restore(&self, varmap: &VarMap) -> Result<()> {
        for (name, var) in named_vars(varmap)? {
            let saved = self
                .tensors
                .get(&name)
                .ok_or_else(|| Error::Training(format!("snapshot has no parameter {name}")))?;
            var.set(saved)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_tensors::{node_features, FeatureMode};
    use linkfold_core::edge::canonicalize;
    use linkfold_core::TrainingGraph;

    fn spec(kind: EncoderKind) -> ModelSpec {
        ModelSpec {
            encoder: kind,
            in_channels: 1,
            encoder_channels: 8,
            hidden_channels: 8,
            encoder_dropout: 0.0,
            decoder_dropout: 0.0,
        }
    }

    fn flat(t: &Tensor) -> Vec<f32> {
        t.flatten_all().unwrap().to_vec1().unwrap()
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let a = LinkModel::new(&spec(EncoderKind::Gcn), 9, &Device::Cpu).unwrap();
        let b = LinkModel::new(&spec(EncoderKind::Gcn), 9, &Device::Cpu).unwrap();
        let c = LinkModel::new(&spec(EncoderKind::Gcn), 10, &Device::Cpu).unwrap();

        let va = named_vars(a.parameters()).unwrap();
        let vb = named_vars(b.parameters()).unwrap();
        let vc = named_vars(c.parameters()).unwrap();
        assert_eq!(va.len(), vb.len());
        for ((na, ta), (nb, tb)) in va.iter().zip(vb.iter()) {
            assert_eq!(na, nb);
            assert_eq!(flat(ta.as_tensor()), flat(tb.as_tensor()));
        }
        let weights_differ = va
            .iter()
            .zip(vc.iter())
            .any(|((_, x), (_, y))| flat(x.as_tensor()) != flat(y.as_tensor()));
        assert!(weights_differ);
    }

    #[test]
    fn test_parameter_count() {
        let m = LinkModel::new(&spec(EncoderKind::Gcn), 0, &Device::Cpu).unwrap();
        assert_eq!(m.encoder_kind(), EncoderKind::Gcn);
        assert!(matches!(m.device(), Device::Cpu));
        // GCN 1x8 + 8, fc1 8x8 + 8, fc2 8x1 + 1.
        assert_eq!(m.num_parameters().unwrap(), 16 + 72 + 9);
    }

    #[test]
    fn test_biases_start_at_zero() {
        let m = LinkModel::new(&spec(EncoderKind::Sage), 1, &Device::Cpu).unwrap();
        for (name, var) in named_vars(m.parameters()).unwrap() {
            if var.as_tensor().rank() == 1 {
                assert!(flat(var.as_tensor()).iter().all(|&v| v == 0.0), "{name} not zero");
            }
        }
    }

    #[test]
    fn test_snapshot_restores_values() {
        let m = LinkModel::new(&spec(EncoderKind::Gat), 3, &Device::Cpu).unwrap();
        let snap = ParameterSnapshot::capture(m.parameters()).unwrap();
        let before: Vec<Vec<f32>> = named_vars(m.parameters())
            .unwrap()
            .iter()
            .map(|(_, v)| flat(v.as_tensor()))
            .collect();

        init_parameters(m.parameters(), &mut seeded_rng(77)).unwrap();
        for (name, var) in named_vars(m.parameters()).unwrap() {
            // Snapshot is a copy, not an alias of the live storage.
            if var.as_tensor().rank() >= 2 {
                assert_ne!(flat(snap.get(&name).unwrap()), flat(var.as_tensor()));
            }
        }

        snap.restore(m.parameters()).unwrap();
        let after: Vec<Vec<f32>> = named_vars(m.parameters())
            .unwrap()
            .iter()
            .map(|(_, v)| flat(v.as_tensor()))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_every_encoder_scores_pairs() {
        let edges = canonicalize(vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
        let tg = TrainingGraph::new(&edges, 5);
        let x = node_features(&tg, FeatureMode::TrainDegree, &Device::Cpu).unwrap();
        let pairs = canonicalize(vec![(0, 2), (1, 4), (3, 4)]);

        for kind in EncoderKind::ALL {
            let m = LinkModel::new(&spec(kind), 5, &Device::Cpu).unwrap();
            let g = GraphTensors::new(&tg, kind.propagation(), &Device::Cpu).unwrap();
            let z = m.embed(&x, &g, false).unwrap();
            assert_eq!(z.dims(), &[5, 8]);

            let p = flat(&m.score(&z, &pairs, false).unwrap());
            assert_eq!(p.len(), 3);
            assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_wrong_propagation_is_rejected() {
        let tg = TrainingGraph::new(&canonicalize(vec![(0, 1)]), 2);
        let x = node_features(&tg, FeatureMode::Ones, &Device::Cpu).unwrap();
        let g = GraphTensors::new(&tg, EncoderKind::Sage.propagation(), &Device::Cpu).unwrap();
        let m = LinkModel::new(&spec(EncoderKind::Gcn), 0, &Device::Cpu).unwrap();
        assert!(matches!(m.embed(&x, &g, false), Err(Error::InvalidConfig(_))));
    }
}
