//! # linkfold-core
//!
//! Data side of cross-validated link prediction: everything that decides
//! *which* pairs a model trains and is judged on, and how the judgement is
//! recorded. Nothing here knows about tensors.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`edge`] | canonical `(min, max)` edges, symmetrization, self-loops |
//! | [`graph`] | edge-list parsing, id remapping, statistics |
//! | [`sampling`] | rejection sampling of non-edges, seed derivation |
//! | [`split`] | k-fold train/validation/test splits with held-out negatives |
//! | [`metrics`] | AUC and average precision |
//! | [`early_stop`] | patience-based early stopping with best snapshot |
//! | [`record`] | epoch/fold/run records and their log |
//! | [`report`] | CSV/JSON output and directory summaries |
//!
//! ## Leakage
//!
//! Validation and test positives are removed from the training graph, and
//! held-out negatives are drawn against the *full* positive set, so no
//! evaluated pair is seen as an edge during training and no negative is a
//! real edge.
//!
//! ## Example
//!
//! ```rust
//! use linkfold_core::{Graph, split::{split, SplitConfig}};
//!
//! let text: String = (0..30).map(|i| format!("{} {}\n", i, (i + 1) % 30)).collect();
//! let graph = Graph::from_edge_list(text.as_bytes()).unwrap();
//! let folds = split(graph.edges(), graph.num_nodes(), &SplitConfig::default()).unwrap();
//!
//! let tested: usize = folds.iter().map(|f| f.test_pos.len()).sum();
//! assert_eq!(tested, graph.num_edges());
//! ```

pub mod early_stop;
pub mod edge;
mod error;
pub mod graph;
pub mod metrics;
pub mod record;
pub mod report;
pub mod sampling;
pub mod split;

pub use edge::CanonicalEdge;
pub use error::{Error, Result};
pub use graph::{Graph, GraphStats};
pub use metrics::{Evaluation, LinkScores};
pub use split::{Fold, SplitConfig, TrainingGraph};
