//! Dense tensor views of a fold's training graph, and node features.
//!
//! Message passing runs on an `N x N` matrix derived from the directed,
//! self-looped training pairs. Row `i` holds the messages node `i`
//! receives, so `A[i][j] = 1` for every pair `(j, i)`.
//!
//! | Propagation | Matrix | Used by |
//! |-------------|--------|---------|
//! | [`Propagation::SymNorm`] | `D^{-1/2} A D^{-1/2}` | GCN |
//! | [`Propagation::RowMean`] | `D^{-1} A` | GraphSAGE (mean) |
//! | [`Propagation::AttentionMask`] | `0` on edges, `-1e9` elsewhere | GAT |
//!
//! Node features ([`FeatureMode`]) default to `log1p` of the full-graph degree,
//! built once per experiment by [`graph_features`].

use std::fmt;
use std::str::FromStr;

use candle_core::{DType, Device, Tensor};
use linkfold_core::{Graph, TrainingGraph};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Additive attention bias for non-neighbors.
const MASKED: f32 = -1e9;

/// How the adjacency is turned into a propagation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    SymNorm,
    RowMean,
    AttentionMask,
}

/// Propagation matrix for one training graph, on one device.
#[derive(Debug, Clone)]
pub struct GraphTensors {
    num_nodes: usize,
    propagation: Propagation,
    matrix: Tensor,
}

impl GraphTensors {
    pub fn new(graph: &TrainingGraph, propagation: Propagation, device: &Device) -> Result<Self> {
        let n = graph.num_nodes();
        let adj = dense_adjacency(graph);
        let deg: Vec<f32> = adj.chunks(n.max(1)).map(|row| row.iter().sum()).collect();

        let values: Vec<f32> = match propagation {
            Propagation::SymNorm => {
                let inv_sqrt: Vec<f32> = deg
                    .iter()
                    .map(|&d| if d > 0.0 { d.powf(-0.5) } else { 0.0 })
                    .collect();
                adj.iter()
                    .enumerate()
                    .map(|(k, &a)| a * inv_sqrt[k / n] * inv_sqrt[k % n])
                    .collect()
            }
            Propagation::RowMean => adj
                .iter()
                .enumerate()
                .map(|(k, &a)| if deg[k / n] > 0.0 { a / deg[k / n] } else { 0.0 })
                .collect(),
            Propagation::AttentionMask => adj
                .iter()
                .map(|&a| if a > 0.0 { 0.0 } else { MASKED })
                .collect(),
        };

        let matrix = Tensor::from_vec(values, (n, n), device)?;
        Ok(Self {
            num_nodes: n,
            propagation,
            matrix,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// The `N x N` propagation matrix.
    pub fn matrix(&self) -> &Tensor {
        &self.matrix
    }
}

/// Row-major `N x N` 0/1 adjacency, `a[target * N + source]`.
///
/// Duplicate pairs collapse to a single 1.
pub fn dense_adjacency(graph: &TrainingGraph) -> Vec<f32> {
    let n = graph.num_nodes();
    let mut adj = vec![0f32; n * n];
    for &(source, target) in graph.pairs() {
        adj[target * n + source] = 1.0;
    }
    adj
}

/// Input node features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureMode {
    /// `log1p(degree)` in the full input graph, shared by every fold.
    #[default]
    #[serde(alias = "degree")]
    FullDegree,
    /// `log1p(degree)` in each fold's training graph, self-loops not counted.
    TrainDegree,
    /// Constant 1 for every node.
    Ones,
}

impl FeatureMode {
    /// Whether the features must be rebuilt for every fold.
    pub fn per_fold(self) -> bool {
        matches!(self, FeatureMode::TrainDegree)
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureMode::FullDegree => write!(f, "full_degree"),
            FeatureMode::TrainDegree => write!(f, "train_degree"),
            FeatureMode::Ones => write!(f, "ones"),
        }
    }
}

impl FromStr for FeatureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "full_degree" | "degree" => Ok(FeatureMode::FullDegree),
            "train_degree" => Ok(FeatureMode::TrainDegree),
            "ones" => Ok(FeatureMode::Ones),
            other => Err(Error::UnknownFeatureMode(other.to_string())),
        }
    }
}

fn log_degree_tensor(degrees: impl IntoIterator<Item = usize>, device: &Device) -> Result<Tensor> {
    let values: Vec<f32> = degrees.into_iter().map(|d| (d as f32).ln_1p()).collect();
    let n = values.len();
    Ok(Tensor::from_vec(values, (n, 1), device)?)
}

/// `N x 1` features of the whole input graph, or `None` for
/// [`FeatureMode::TrainDegree`], which depends on the fold.
pub fn graph_features(graph: &Graph, mode: FeatureMode, device: &Device) -> Result<Option<Tensor>> {
    match mode {
        FeatureMode::FullDegree => log_degree_tensor(graph.degrees(), device).map(Some),
        FeatureMode::Ones => Ok(Some(Tensor::ones((graph.num_nodes(), 1), DType::F32, device)?)),
        FeatureMode::TrainDegree => Ok(None),
    }
}

/// `N x 1` features computed from one fold's training graph.
///
/// [`FeatureMode::FullDegree`] needs the full graph; use [`graph_features`].
pub fn node_features(graph: &TrainingGraph, mode: FeatureMode, device: &Device) -> Result<Tensor> {
    let n = graph.num_nodes();
    match mode {
        FeatureMode::Ones => Ok(Tensor::ones((n, 1), DType::F32, device)?),
        FeatureMode::TrainDegree => {
            let mut deg = vec![0usize; n];
            for &(source, target) in graph.pairs() {
                if source != target {
                    deg[source] += 1;
                }
            }
            log_degree_tensor(deg, device)
        }
        FeatureMode::FullDegree => Err(Error::InvalidConfig(
            "full_degree features are computed from the full graph".to_string(),
        )),
    }
}
