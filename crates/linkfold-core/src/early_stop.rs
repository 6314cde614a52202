//! Patience-based early stopping on validation AUC.
//!
//! The controller keeps the best validation AUC seen so far together with a
//! snapshot of whatever state produced it. Only a strictly greater AUC counts
//! as an improvement; after `patience` consecutive non-improving epochs it
//! moves to [`StopState::Stopped`] and ignores further observations.
//!
//! ```rust
//! use linkfold_core::early_stop::{EarlyStopping, StopState};
//!
//! let mut es = EarlyStopping::new(2);
//! assert_eq!(es.observe(1, 0.7, || "epoch 1"), StopState::Improving);
//! assert_eq!(es.observe(2, 0.6, || "epoch 2"), StopState::Waiting);
//! assert_eq!(es.observe(3, 0.7, || "epoch 3"), StopState::Stopped);
//! assert_eq!(es.into_best(), Some((1, "epoch 1")));
//! ```

use std::convert::Infallible;

/// Controller state after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopState {
    /// The last epoch set a new best.
    Improving,
    /// The last epoch did not improve; patience not yet exhausted.
    Waiting,
    /// Patience exhausted. Terminal.
    Stopped,
}

/// Early-stopping controller holding the best snapshot `S`.
#[derive(Debug, Clone)]
pub struct EarlyStopping<S> {
    patience: usize,
    best: f64,
    best_epoch: Option<usize>,
    wait: usize,
    state: StopState,
    snapshot: Option<S>,
    history: Vec<f64>,
}

impl<S> EarlyStopping<S> {
    /// A controller that stops after `patience` non-improving epochs.
    ///
    /// `patience == 0` never stops.
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: 0.0,
            best_epoch: None,
            wait: 0,
            state: StopState::Improving,
            snapshot: None,
            history: Vec::new(),
        }
    }

    /// Record one epoch's validation AUC.
    ///
    /// `snapshot` runs only when the epoch is a new best.
    pub fn observe<F>(&mut self, epoch: usize, valid_auc: f64, snapshot: F) -> StopState
    where
        F: FnOnce() -> S,
    {
        match self.try_observe(epoch, valid_auc, || Ok::<_, Infallible>(snapshot())) {
            Ok(state) => state,
            Err(never) => match never {},
        }
    }

    /// Like [`observe`](Self::observe), for snapshots that can fail.
    ///
    /// On error the controller is left as it was before the call.
    pub fn try_observe<F, E>(&mut self, epoch: usize, valid_auc: f64, snapshot: F) -> Result<StopState, E>
    where
        F: FnOnce() -> Result<S, E>,
    {
        if self.state == StopState::Stopped {
            return Ok(self.state);
        }

        if valid_auc > self.best {
            let snap = snapshot()?;
            self.best = valid_auc;
            self.best_epoch = Some(epoch);
            self.snapshot = Some(snap);
            self.wait = 0;
            self.state = StopState::Improving;
        } else {
            self.wait += 1;
            self.state = if self.patience > 0 && self.wait >= self.patience {
                tracing::warn!(epoch, best_epoch = ?self.best_epoch, best = self.best, "early stopping");
                StopState::Stopped
            } else {
                StopState::Waiting
            };
        }
        self.history.push(self.best);
        Ok(self.state)
    }

    pub fn state(&self) -> StopState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == StopState::Stopped
    }

    pub fn patience(&self) -> usize {
        self.patience
    }

    /// Consecutive non-improving epochs so far.
    pub fn wait(&self) -> usize {
        self.wait
    }

    /// Best validation AUC, 0.0 before any improvement.
    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Best AUC after each observation. Non-decreasing.
    pub fn best_history(&self) -> &[f64] {
        &self.history
    }

    pub fn best_snapshot(&self) -> Option<&S> {
        self.snapshot.as_ref()
    }

    /// The best epoch and its snapshot, if any epoch improved on 0.0.
    pub fn into_best(self) -> Option<(usize, S)> {
        self.best_epoch.zip(self.snapshot)
    }
}

/// Patience derived from the epoch budget and schedule divisor `t`:
/// `floor((epochs / t) / 2)`.
pub fn patience_from_budget(epochs: usize, t: usize) -> usize {
    epochs / t.max(1) / 2
}
