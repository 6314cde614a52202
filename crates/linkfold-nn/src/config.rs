//! Experiment configuration.
//!
//! # Example
//!
//! ```rust
//! use linkfold_nn::{EncoderKind, ExperimentConfig};
//!
//! let config = ExperimentConfig::new("football")
//!     .with_encoder(EncoderKind::Gat)
//!     .with_epochs(100)
//!     .with_learning_rate(0.005);
//!
//! assert_eq!(config.patience(), 25);
//! assert!(config.validate().is_ok());
//! ```

use candle_core::Device;
use linkfold_core::early_stop::patience_from_budget;
use linkfold_core::SplitConfig;
use serde::{Deserialize, Serialize};

use crate::encoder::EncoderKind;
use crate::error::{Error, Result};
use crate::graph_tensors::FeatureMode;
use crate::model::ModelSpec;
use crate::optim::AdamConfig;

/// Full configuration of a cross-validated experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Dataset label, used in the results directory name.
    pub dataset: String,
    /// Encoder architecture (default: gcn).
    pub encoder: EncoderKind,
    /// Embedding width (default: 128).
    pub encoder_channels: usize,
    /// Decoder hidden width (default: 128).
    pub hidden_channels: usize,
    /// Dropout on encoder output during training (default: 0).
    pub encoder_dropout: f32,
    /// Dropout inside the decoder during training (default: 0).
    pub decoder_dropout: f32,
    /// Adam learning rate (default: 0.001).
    pub learning_rate: f64,
    /// Maximum epochs per fold (default: 500).
    pub epochs: usize,
    /// Mini-batch size for training and evaluation (default: 2^20).
    pub batch_size: usize,
    /// Schedule divisor: cosine period `epochs / t`, patience `epochs / t / 2`
    /// (default: 2).
    pub t: usize,
    /// Explicit patience; `None` derives it from `epochs` and `t`.
    pub patience: Option<usize>,
    /// Global gradient norm bound (default: 1.0).
    pub max_grad_norm: f64,
    /// Number of folds (default: 5).
    pub folds: usize,
    /// Repetitions of the whole cross-validation (default: 2).
    pub runs: usize,
    /// Validation fraction of each fold's training edges (default: 0.1).
    pub val_fraction: f64,
    /// Seed of the fold partition and held-out negatives (default: 42).
    pub split_seed: u64,
    /// Seed of parameter init and online negatives (default: 42).
    pub seed: u64,
    /// Input node features (default: full_degree).
    pub features: FeatureMode,
    /// Also keep validation/test negatives out of online training negatives
    /// (default: false).
    pub exclude_held_out_negatives: bool,
    /// CUDA ordinal to use if available; `None` runs on CPU.
    pub cuda_device: Option<usize>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset: "graph".to_string(),
            encoder: EncoderKind::Gcn,
            encoder_channels: 128,
            hidden_channels: 128,
            encoder_dropout: 0.0,
            decoder_dropout: 0.0,
            learning_rate: 0.001,
            epochs: 500,
            batch_size: 1 << 20,
            t: 2,
            patience: None,
            max_grad_norm: 1.0,
            folds: 5,
            runs: 2,
            val_fraction: 0.1,
            split_seed: 42,
            seed: 42,
            features: FeatureMode::FullDegree,
            exclude_held_out_negatives: false,
            cuda_device: None,
        }
    }
}

impl ExperimentConfig {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    pub fn with_encoder(mut self, encoder: EncoderKind) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_channels(mut self, encoder_channels: usize, hidden_channels: usize) -> Self {
        self.encoder_channels = encoder_channels;
        self.hidden_channels = hidden_channels;
        self
    }

    pub fn with_dropout(mut self, encoder_dropout: f32, decoder_dropout: f32) -> Self {
        self.encoder_dropout = encoder_dropout;
        self.decoder_dropout = decoder_dropout;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_t(mut self, t: usize) -> Self {
        self.t = t;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = Some(patience);
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_split_seed(mut self, split_seed: u64) -> Self {
        self.split_seed = split_seed;
        self
    }

    pub fn with_features(mut self, features: FeatureMode) -> Self {
        self.features = features;
        self
    }

    pub fn with_exclude_held_out_negatives(mut self, exclude: bool) -> Self {
        self.exclude_held_out_negatives = exclude;
        self
    }

    pub fn with_cuda_device(mut self, ordinal: Option<usize>) -> Self {
        self.cuda_device = ordinal;
        self
    }

    /// Early-stopping patience; 0 disables early stopping.
    pub fn patience(&self) -> usize {
        self.patience
            .unwrap_or_else(|| patience_from_budget(self.epochs, self.t))
    }

    /// Cosine schedule period in batches.
    pub fn schedule_period(&self) -> usize {
        self.epochs / self.t.max(1)
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig::default()
            .with_folds(self.folds)
            .with_val_fraction(self.val_fraction)
            .with_seed(self.split_seed)
    }

    pub fn model_spec(&self, in_channels: usize) -> ModelSpec {
        ModelSpec {
            encoder: self.encoder,
            in_channels,
            encoder_channels: self.encoder_channels,
            hidden_channels: self.hidden_channels,
            encoder_dropout: self.encoder_dropout,
            decoder_dropout: self.decoder_dropout,
        }
    }

    pub fn adam_config(&self) -> AdamConfig {
        AdamConfig {
            learning_rate: self.learning_rate,
            max_grad_norm: self.max_grad_norm,
            ..AdamConfig::default()
        }
    }

    /// Device to train on: the requested GPU if CUDA is available, else CPU.
    pub fn device(&self) -> Result<Device> {
        match self.cuda_device {
            Some(ordinal) => Ok(Device::cuda_if_available(ordinal)?),
            None => Ok(Device::Cpu),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("encoder_channels", self.encoder_channels),
            ("hidden_channels", self.hidden_channels),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("t", self.t),
            ("runs", self.runs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be positive")));
            }
        }
        for (name, p) in [("encoder_dropout", self.encoder_dropout), ("decoder_dropout", self.decoder_dropout)] {
            if !(0.0..1.0).contains(&p) {
                return Err(Error::InvalidConfig(format!("{name} must be in [0, 1), got {p}")));
            }
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.max_grad_norm <= 0.0 {
            return Err(Error::InvalidConfig("max_grad_norm must be positive".to_string()));
        }
        self.split_config().validate()?;
        Ok(())
    }

    /// Directory name encoding the hyperparameters of this experiment.
    pub fn results_dir_name(&self) -> String {
        format!(
            "{}-model_{}-cv{}-lr_{:?}-epochs_{}-bz_{}-patience_{}-enc_{}-hic_{}-end_{:?}-ded_{:?}-t_{}",
            self.dataset,
            self.encoder,
            self.folds,
            self.learning_rate,
            self.epochs,
            self.batch_size,
            self.patience(),
            self.encoder_channels,
            self.hidden_channels,
            self.encoder_dropout,
            self.decoder_dropout,
            self.t,
        )
    }
}
