//! Graph encoders: one convolution from node features to embeddings.

use std::fmt;
use std::str::FromStr;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use serde::{Deserialize, Serialize};

use crate::conv::{GATConv, GCNConv, SAGEConv};
use crate::error::{Error, Result};
use crate::graph_tensors::{GraphTensors, Propagation};

/// Attention heads used by the GAT encoder.
pub const GAT_HEADS: usize = 4;
/// LeakyReLU slope for GAT attention logits.
pub const GAT_NEGATIVE_SLOPE: f64 = 0.2;

/// Encoder selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncoderKind {
    #[default]
    #[serde(rename = "gcn")]
    Gcn,
    #[serde(rename = "gat")]
    Gat,
    #[serde(rename = "graphsage", alias = "sage")]
    Sage,
}

impl EncoderKind {
    pub const ALL: [EncoderKind; 3] = [EncoderKind::Gcn, EncoderKind::Gat, EncoderKind::Sage];

    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderKind::Gcn => "gcn",
            EncoderKind::Gat => "gat",
            EncoderKind::Sage => "graphsage",
        }
    }

    /// Propagation matrix the encoder consumes.
    pub fn propagation(&self) -> Propagation {
        match self {
            EncoderKind::Gcn => Propagation::SymNorm,
            EncoderKind::Gat => Propagation::AttentionMask,
            EncoderKind::Sage => Propagation::RowMean,
        }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncoderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gcn" => Ok(EncoderKind::Gcn),
            "gat" => Ok(EncoderKind::Gat),
            "graphsage" | "sage" => Ok(EncoderKind::Sage),
            other => Err(Error::UnknownEncoder(other.to_string())),
        }
    }
}

/// A single-layer graph encoder.
pub enum Encoder {
    Gcn(GCNConv),
    Gat(GATConv),
    Sage(SAGEConv),
}

impl Encoder {
    pub fn new(kind: EncoderKind, in_channels: usize, out_channels: usize, vb: VarBuilder) -> Result<Self> {
        let encoder = match kind {
            EncoderKind::Gcn => Encoder::Gcn(GCNConv::new(in_channels, out_channels, true, vb.pp("gcn"))?),
            EncoderKind::Gat => Encoder::Gat(GATConv::new(
                in_channels,
                out_channels,
                GAT_HEADS,
                GAT_NEGATIVE_SLOPE,
                vb.pp("gat"),
            )?),
            EncoderKind::Sage => Encoder::Sage(SAGEConv::new(in_channels, out_channels, false, vb.pp("sage"))?),
        };
        Ok(encoder)
    }

    pub fn kind(&self) -> EncoderKind {
        match self {
            Encoder::Gcn(_) => EncoderKind::Gcn,
            Encoder::Gat(_) => EncoderKind::Gat,
            Encoder::Sage(_) => EncoderKind::Sage,
        }
    }

    /// Node embeddings `(N, out_channels)`.
    pub fn forward(&self, x: &Tensor, graph: &GraphTensors) -> Result<Tensor> {
        if graph.propagation() != self.kind().propagation() {
            return Err(Error::InvalidConfig(format!(
                "{} encoder needs {:?} propagation, graph has {:?}",
                self.kind(),
                self.kind().propagation(),
                graph.propagation()
            )));
        }
        let out = match self {
            Encoder::Gcn(conv) => conv.forward(x, graph.matrix())?,
            Encoder::Gat(conv) => conv.forward(x, graph.matrix())?,
            Encoder::Sage(conv) => conv.forward(x, graph.matrix())?,
        };
        Ok(out)
    }
}
