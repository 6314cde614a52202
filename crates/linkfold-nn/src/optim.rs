//! Adam over candle `Var`s with global-norm gradient clipping, and a cosine
//! annealing learning-rate schedule.
//!
//! One training step is:
//!
//! 1. `loss.backward()`
//! 2. rescale all gradients so their global L2 norm is at most `max_grad_norm`
//! 3. Adam update with bias-corrected moments
//!
//! The schedule is stepped by the caller once per mini-batch and its new rate
//! handed to the optimizer with [`Adam::set_learning_rate`].

use candle_core::{Tensor, Var};
use candle_nn::VarMap;

use crate::error::Result;
use crate::model::named_vars;

/// Adam configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig {
    /// Learning rate (default: 0.001).
    pub learning_rate: f64,
    /// First moment decay rate.
    pub beta1: f64,
    /// Second moment decay rate.
    pub beta2: f64,
    /// Numerical stability constant.
    pub epsilon: f64,
    /// Maximum global gradient norm (default: 1.0).
    pub max_grad_norm: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            max_grad_norm: 1.0,
        }
    }
}

/// A tracked parameter with its moment estimates.
struct TrackedParam {
    var: Var,
    m: Tensor,
    v: Tensor,
}

/// Adam optimizer.
pub struct Adam {
    config: AdamConfig,
    params: Vec<TrackedParam>,
    step: usize,
}

impl Adam {
    /// Track every variable of `varmap`, in name order.
    pub fn new(varmap: &VarMap, config: AdamConfig) -> Result<Self> {
        let mut params = Vec::new();
        for (_, var) in named_vars(varmap)? {
            let m = var.as_tensor().zeros_like()?;
            let v = var.as_tensor().zeros_like()?;
            params.push(TrackedParam { var, m, v });
        }
        Ok(Self {
            config,
            params,
            step: 0,
        })
    }

    pub fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    pub fn set_learning_rate(&mut self, lr: f64) {
        self.config.learning_rate = lr;
    }

    /// Number of updates taken so far.
    pub fn global_step(&self) -> usize {
        self.step
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    /// Back-propagate `loss`, clip, and update all parameters.
    ///
    /// Returns the global gradient norm before clipping.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<f64> {
        let grads = loss.backward()?;
        self.step += 1;
        let t = self.step as i32;

        let mut total_sq = 0.0f64;
        for param in &self.params {
            if let Some(grad) = grads.get(param.var.as_tensor()) {
                let sq: f32 = grad.sqr()?.sum_all()?.to_scalar()?;
                total_sq += sq as f64;
            }
        }
        let total_norm = total_sq.sqrt();
        let clip_scale = (self.config.max_grad_norm / (total_norm + 1e-6)).min(1.0);

        let AdamConfig {
            learning_rate: lr,
            beta1,
            beta2,
            epsilon,
            ..
        } = self.config;
        let bc1 = 1.0 - beta1.powi(t);
        let bc2 = 1.0 - beta2.powi(t);

        for param in &mut self.params {
            let Some(grad) = grads.get(param.var.as_tensor()) else {
                continue;
            };
            let grad = if clip_scale < 1.0 {
                grad.affine(clip_scale, 0.0)?
            } else {
                grad.clone()
            };

            param.m = (param.m.affine(beta1, 0.0)? + grad.affine(1.0 - beta1, 0.0)?)?.detach();
            param.v = (param.v.affine(beta2, 0.0)? + grad.sqr()?.affine(1.0 - beta2, 0.0)?)?.detach();

            let m_hat = param.m.affine(1.0 / bc1, 0.0)?;
            let denom = (param.v.affine(1.0 / bc2, 0.0)?.sqrt()? + epsilon)?;
            let update = m_hat.div(&denom)?.affine(-lr, 0.0)?;

            let next = (param.var.as_tensor() + update)?.detach();
            param.var.set(&next)?;
        }

        Ok(total_norm)
    }
}

/// Cosine annealing from `base_lr` to zero over `t_max` steps.
///
/// Closed form `base_lr * (1 + cos(pi * step / t_max)) / 2`,
/// so past `t_max` the rate climbs back up with period `2 * t_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosineAnnealing {
    base_lr: f64,
    t_max: usize,
    step: usize,
}

impl CosineAnnealing {
    /// `t_max` of 0 is treated as 1.
    pub fn new(base_lr: f64, t_max: usize) -> Self {
        Self {
            base_lr,
            t_max: t_max.max(1),
            step: 0,
        }
    }

    pub fn t_max(&self) -> usize {
        self.t_max
    }

    /// Steps taken so far.
    pub fn current_step(&self) -> usize {
        self.step
    }

    /// Learning rate at an arbitrary step.
    pub fn lr_at(&self, step: usize) -> f64 {
        let progress = step as f64 / self.t_max as f64;
        self.base_lr * (1.0 + (std::f64::consts::PI * progress).cos()) / 2.0
    }

    /// Current learning rate.
    pub fn lr(&self) -> f64 {
        self.lr_at(self.step)
    }

    /// Advance one step and return the new rate.
    pub fn step(&mut self) -> f64 {
        self.step += 1;
        self.lr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    fn scalar_var(varmap: &VarMap, name: &str, value: f32) -> Var {
        let var = Var::from_tensor(&Tensor::new(&[value], &Device::Cpu).unwrap()).unwrap();
        varmap.data().lock().unwrap().insert(name.to_string(), var.clone());
        var
    }

    #[test]
    fn test_cosine_schedule() {
        let mut s = CosineAnnealing::new(1e-3, 100);
        assert!((s.lr() - 1e-3).abs() < 1e-12);
        assert!((s.lr_at(50) - 0.5e-3).abs() < 1e-9);
        assert!(s.lr_at(100) < 1e-12);
        // Periodic past t_max.
        assert!((s.lr_at(200) - 1e-3).abs() < 1e-12);
        assert!((s.lr_at(150) - s.lr_at(50)).abs() < 1e-12);

        let lr1 = s.step();
        assert_eq!(s.current_step(), 1);
        assert!(lr1 < 1e-3);
    }

    #[test]
    fn test_zero_t_max() {
        let s = CosineAnnealing::new(0.1, 0);
        assert_eq!(s.t_max(), 1);
    }

    #[test]
    fn test_adam_moves_against_gradient() {
        let varmap = VarMap::new();
        let w = scalar_var(&varmap, "w", 3.0);
        let mut opt = Adam::new(&varmap, AdamConfig { learning_rate: 0.1, ..Default::default() }).unwrap();

        // loss = w^2, gradient 6 > 0.
        let loss = w.as_tensor().sqr().unwrap().sum_all().unwrap();
        opt.backward_step(&loss).unwrap();

        let v: Vec<f32> = w.as_tensor().to_vec1().unwrap();
        // First Adam step moves by ~lr regardless of gradient scale.
        assert!((v[0] - 2.9).abs() < 1e-4);
        assert_eq!(opt.global_step(), 1);
    }

    #[test]
    fn test_clipping_reports_raw_norm() {
        let varmap = VarMap::new();
        let a = scalar_var(&varmap, "a", 0.0);
        let b = scalar_var(&varmap, "b", 0.0);
        let mut opt = Adam::new(&varmap, AdamConfig::default()).unwrap();

        // d/da = 3, d/db = 4 -> norm 5.
        let loss = ((a.as_tensor() * 3.0).unwrap() + (b.as_tensor() * 4.0).unwrap())
            .unwrap()
            .sum_all()
            .unwrap();
        let norm = opt.backward_step(&loss).unwrap();
        assert!((norm - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_minimizes_quadratic() {
        let varmap = VarMap::new();
        let w = scalar_var(&varmap, "w", 1.0);
        let mut opt = Adam::new(&varmap, AdamConfig { learning_rate: 0.05, ..Default::default() }).unwrap();

        for _ in 0..300 {
            let loss = (w.as_tensor() - 0.25f64).unwrap().sqr().unwrap().sum_all().unwrap();
            opt.backward_step(&loss).unwrap();
        }
        let v: f32 = w.as_tensor().to_dtype(DType::F32).unwrap().to_vec1::<f32>().unwrap()[0];
        assert!((v - 0.25).abs() < 0.05, "w = {v}");
    }
}
