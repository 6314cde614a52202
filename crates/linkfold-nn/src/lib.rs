//! # linkfold-nn
//!
//! Model side of cross-validated link prediction, on
//! [candle](https://github.com/huggingface/candle): a one-layer GNN encoder
//! (GCN, GAT or GraphSAGE), an MLP edge decoder, Adam with gradient
//! clipping and cosine annealing, the per-epoch training loop, the evaluator
//! and the cross-validation driver.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`graph_tensors`] | dense propagation matrices, node features |
//! | [`conv`] | `GCNConv`, `GATConv`, `SAGEConv` |
//! | [`encoder`] / [`decoder`] | encoder selection, edge decoder |
//! | [`model`] | [`EdgeModel`] trait, [`LinkModel`], parameter snapshots |
//! | [`optim`] | [`Adam`], [`CosineAnnealing`] |
//! | [`training`] | [`train_epoch`] |
//! | [`evaluation`] | [`evaluate`] |
//! | [`cross_validation`] | [`cross_validate`] |
//!
//! ## Example
//!
//! ```rust,no_run
//! use linkfold_core::Graph;
//! use linkfold_nn::{cross_validate, EncoderKind, ExperimentConfig};
//!
//! let graph = Graph::from_edge_list_file("data/karate_edges.txt")?;
//! let config = ExperimentConfig::new("karate")
//!     .with_encoder(EncoderKind::Gcn)
//!     .with_epochs(200);
//!
//! let report = cross_validate(&graph, &config)?;
//! report.write_to("results")?;
//! # Ok::<(), linkfold_nn::Error>(())
//! ```

pub mod config;
pub mod conv;
pub mod cross_validation;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod evaluation;
pub mod graph_tensors;
pub mod model;
pub mod optim;
pub mod training;

pub use config::ExperimentConfig;
pub use cross_validation::{cross_validate, run_fold, ExperimentReport, SharedInputs};
pub use encoder::{Encoder, EncoderKind};
pub use error::{Error, Result};
pub use evaluation::evaluate;
pub use graph_tensors::{graph_features, node_features, FeatureMode, GraphTensors, Propagation};
pub use model::{EdgeModel, LinkModel, ModelSpec, ParameterSnapshot};
pub use optim::{Adam, AdamConfig, CosineAnnealing};
pub use training::{train_epoch, EpochLoss, TrainingData};
