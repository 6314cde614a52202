//! Message-passing convolutional layers over dense propagation matrices.
//!
//! - [`GCNConv`]: Graph Convolutional Network (Kipf & Welling, 2017)
//! - [`GATConv`]: Graph Attention Network (Velickovic et al., 2018)
//! - [`SAGEConv`]: GraphSAGE with mean aggregation (Hamilton et al., 2017)
//!
//! All layers follow the message-passing paradigm:
//!
//! ```text
//! h_i^{(l+1)} = UPDATE(h_i^{(l)}, AGGREGATE({MESSAGE(h_j^{(l)}) : j in N(i)}))
//! ```
//!
//! The neighborhood `N(i)` already contains `i` itself: training graphs
//! carry explicit self-loops, so no layer adds its own.

use candle_core::{Result, Tensor, D};
use candle_nn::{linear, linear_no_bias, Init, Linear, Module, VarBuilder};

/// Graph Convolutional Network layer.
///
/// Implements: H' = D^{-1/2} A D^{-1/2} H W + b
///
/// # Reference
///
/// Kipf & Welling, "Semi-Supervised Classification with Graph Convolutional
/// Networks", ICLR 2017.
pub struct GCNConv {
    linear: Linear,
    bias: Option<Tensor>,
}

impl GCNConv {
    /// Create a new GCN layer.
    ///
    /// The bias is added after aggregation, not inside the linear map.
    pub fn new(in_features: usize, out_features: usize, bias: bool, vb: VarBuilder) -> Result<Self> {
        let linear = linear_no_bias(in_features, out_features, vb.pp("lin"))?;
        let bias = if bias {
            Some(vb.get_with_hints(out_features, "bias", Init::Const(0.0))?)
        } else {
            None
        };
        Ok(Self { linear, bias })
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `norm_adj`: Symmetrically normalized adjacency (N x N)
    pub fn forward(&self, x: &Tensor, norm_adj: &Tensor) -> Result<Tensor> {
        let h = self.linear.forward(x)?;
        let out = norm_adj.matmul(&h)?;
        match &self.bias {
            Some(b) => out.broadcast_add(b),
            None => Ok(out),
        }
    }
}

/// Graph Attention Network layer.
///
/// Implements attention-weighted aggregation, heads averaged:
/// h_i' = mean_k sum_{j in N(i)} alpha^k_{ij} W^k h_j + b
///
/// Where alpha^k_{ij} = softmax_j(LeakyReLU(a_dst^k . W^k h_i + a_src^k . W^k h_j))
///
/// # Reference
///
/// Velickovic et al., "Graph Attention Networks", ICLR 2018.
pub struct GATConv {
    linear: Linear,
    att_src: Tensor, // (heads, 1, out)
    att_dst: Tensor, // (heads, 1, out)
    bias: Tensor,
    negative_slope: f64,
    num_heads: usize,
    out_features: usize,
}

impl GATConv {
    /// Create a new GAT layer.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension (per head and after averaging)
    /// - `num_heads`: Number of attention heads
    /// - `negative_slope`: LeakyReLU negative slope (typically 0.2)
    /// - `vb`: Variable builder
    pub fn new(
        in_features: usize,
        out_features: usize,
        num_heads: usize,
        negative_slope: f64,
        vb: VarBuilder,
    ) -> Result<Self> {
        let linear = linear_no_bias(in_features, out_features * num_heads, vb.pp("lin"))?;
        let att_src = vb.get((num_heads, 1, out_features), "att_src")?;
        let att_dst = vb.get((num_heads, 1, out_features), "att_dst")?;
        let bias = vb.get_with_hints(out_features, "bias", Init::Const(0.0))?;

        Ok(Self {
            linear,
            att_src,
            att_dst,
            bias,
            negative_slope,
            num_heads,
            out_features,
        })
    }

    /// Forward pass with masked dense attention.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `mask`: Additive attention mask (N x N), 0 on edges and a large
    ///   negative value elsewhere
    ///
    /// # Returns
    /// - Node embeddings (N x out_features)
    pub fn forward(&self, x: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let n = x.dim(0)?;

        // (N, in) -> (heads, N, out)
        let h = self
            .linear
            .forward(x)?
            .reshape((n, self.num_heads, self.out_features))?
            .transpose(0, 1)?
            .contiguous()?;

        // (heads, N)
        let alpha_src = h.broadcast_mul(&self.att_src)?.sum(D::Minus1)?;
        let alpha_dst = h.broadcast_mul(&self.att_dst)?.sum(D::Minus1)?;

        // e[k, i, j] = alpha_dst[k, i] + alpha_src[k, j]
        let e = alpha_dst
            .unsqueeze(2)?
            .broadcast_add(&alpha_src.unsqueeze(1)?)?;
        let e = e.maximum(&(&e * self.negative_slope)?)?;
        let e = e.broadcast_add(mask)?;
        let attn = candle_nn::ops::softmax(&e, D::Minus1)?;

        attn.matmul(&h)?.mean(0)?.broadcast_add(&self.bias)
    }
}

/// GraphSAGE convolutional layer with mean aggregation.
///
/// Implements: h_i' = W_l * mean({h_j : j in N(i)}) + b + W_r * h_i
///
/// # Reference
///
/// Hamilton et al., "Inductive Representation Learning on Large Graphs",
/// NeurIPS 2017.
pub struct SAGEConv {
    lin_neighbor: Linear,
    lin_self: Linear,
    normalize: bool,
}

impl SAGEConv {
    /// Create a new GraphSAGE layer.
    ///
    /// Only the neighbor transform carries a bias.
    pub fn new(in_features: usize, out_features: usize, normalize: bool, vb: VarBuilder) -> Result<Self> {
        let lin_neighbor = linear(in_features, out_features, vb.pp("lin_neighbor"))?;
        let lin_self = linear_no_bias(in_features, out_features, vb.pp("lin_self"))?;

        Ok(Self {
            lin_neighbor,
            lin_self,
            normalize,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `mean_adj`: Row-normalized adjacency (N x N)
    pub fn forward(&self, x: &Tensor, mean_adj: &Tensor) -> Result<Tensor> {
        let h_agg = mean_adj.matmul(x)?;
        let out = (self.lin_neighbor.forward(&h_agg)? + self.lin_self.forward(x)?)?;

        if self.normalize {
            let norm = out.sqr()?.sum_keepdim(1)?.sqrt()?;
            let norm = (norm + 1e-6)?;
            out.broadcast_div(&norm)
        } else {
            Ok(out)
        }
    }
}
