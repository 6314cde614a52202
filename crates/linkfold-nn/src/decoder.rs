//! Edge decoder: endpoint embeddings to a link probability.
//!
//! ```text
//! p(u, v) = sigmoid(drop(fc2(mish(drop(fc1(z_u * z_v))))))
//! ```

use candle_core::{Result, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Two-layer MLP over the Hadamard product of endpoint embeddings.
pub struct EdgeDecoder {
    fc1: Linear,
    fc2: Linear,
    dropout: f32,
}

impl EdgeDecoder {
    pub fn new(in_channels: usize, hidden_channels: usize, dropout: f32, vb: VarBuilder) -> Result<Self> {
        let fc1 = linear(in_channels, hidden_channels, vb.pp("fc1"))?;
        let fc2 = linear(hidden_channels, 1, vb.pp("fc2"))?;
        Ok(Self { fc1, fc2, dropout })
    }

    /// Probabilities `(B,)` for the pairs `(src[b], dst[b])`.
    ///
    /// `src` and `dst` are `u32` node index vectors of equal length.
    pub fn forward(&self, z: &Tensor, src: &Tensor, dst: &Tensor, train: bool) -> Result<Tensor> {
        let x = (z.index_select(src, 0)? * z.index_select(dst, 0)?)?;
        let x = self.fc1.forward(&x)?;
        let x = self.maybe_dropout(&x, train)?;
        let x = mish(&x)?;
        let x = self.fc2.forward(&x)?;
        let x = self.maybe_dropout(&x, train)?;
        sigmoid(&x)?.squeeze(1)
    }

    fn maybe_dropout(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        if train && self.dropout > 0.0 {
            candle_nn::ops::dropout(x, self.dropout)
        } else {
            Ok(x.clone())
        }
    }
}

/// `1 / (1 + exp(-x))`, differentiable through basic ops.
pub fn sigmoid(x: &Tensor) -> Result<Tensor> {
    (x.neg()?.exp()? + 1.0)?.recip()
}

/// `x * tanh(softplus(x))` with `softplus(x) = relu(x) + ln(1 + exp(-|x|))`.
pub fn mish(x: &Tensor) -> Result<Tensor> {
    let softplus = (x.relu()? + (x.abs()?.neg()?.exp()? + 1.0)?.log()?)?;
    x * softplus.tanh()?
}
