//! Experiment records and their append-only log.

use serde::{Deserialize, Serialize};

use crate::metrics::Evaluation;

/// One training epoch of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub run: usize,
    pub fold: usize,
    pub epoch: usize,
    /// Loss of the last mini-batch of the epoch.
    pub loss: f32,
    pub valid_auc: f64,
    pub valid_ap: f64,
    pub test_auc: f64,
    pub test_ap: f64,
    /// Wall time spent in the training step.
    pub train_seconds: f64,
}

impl EpochRecord {
    pub fn new(run: usize, fold: usize, epoch: usize, loss: f32, eval: &Evaluation, train_seconds: f64) -> Self {
        Self {
            run,
            fold,
            epoch,
            loss,
            valid_auc: eval.valid.auc,
            valid_ap: eval.valid.ap,
            test_auc: eval.test.auc,
            test_ap: eval.test.ap,
            train_seconds,
        }
    }
}

/// Final scores of one fold after the best snapshot was restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldRecord {
    pub run: usize,
    pub fold: usize,
    /// Epoch whose parameters were restored, 0 if no epoch improved.
    pub best_epoch: usize,
    pub epochs_trained: usize,
    pub stopped_early: bool,
    pub valid_auc: f64,
    pub valid_ap: f64,
    pub test_auc: f64,
    pub test_ap: f64,
}

/// Mean test scores of one run over its folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run: usize,
    pub folds: usize,
    pub test_auc: f64,
    pub test_ap: f64,
}

/// Mean and population standard deviation of run means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub runs: usize,
    pub test_auc_mean: f64,
    pub test_auc_std: f64,
    pub test_ap_mean: f64,
    pub test_ap_std: f64,
}

/// Append-only log of everything an experiment produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultLog {
    epochs: Vec<EpochRecord>,
    folds: Vec<FoldRecord>,
    runs: Vec<RunRecord>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_epoch(&mut self, record: EpochRecord) {
        self.epochs.push(record);
    }

    pub fn push_fold(&mut self, record: FoldRecord) {
        self.folds.push(record);
    }

    /// Close a run: average the test scores of its folds and append the
    /// run record. Returns `None` if no fold of `run` was logged.
    pub fn finish_run(&mut self, run: usize) -> Option<RunRecord> {
        let folds: Vec<&FoldRecord> = self.folds.iter().filter(|f| f.run == run).collect();
        if folds.is_empty() {
            return None;
        }
        let n = folds.len() as f64;
        let record = RunRecord {
            run,
            folds: folds.len(),
            test_auc: folds.iter().map(|f| f.test_auc).sum::<f64>() / n,
            test_ap: folds.iter().map(|f| f.test_ap).sum::<f64>() / n,
        };
        self.runs.push(record.clone());
        Some(record)
    }

    pub fn epochs(&self) -> &[EpochRecord] {
        &self.epochs
    }

    pub fn folds(&self) -> &[FoldRecord] {
        &self.folds
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// Summary over finished runs, `None` before the first one.
    pub fn summary(&self) -> Option<ExperimentSummary> {
        if self.runs.is_empty() {
            return None;
        }
        let auc: Vec<f64> = self.runs.iter().map(|r| r.test_auc).collect();
        let ap: Vec<f64> = self.runs.iter().map(|r| r.test_ap).collect();
        let (test_auc_mean, test_auc_std) = mean_std(&auc);
        let (test_ap_mean, test_ap_std) = mean_std(&ap);
        Some(ExperimentSummary {
            runs: self.runs.len(),
            test_auc_mean,
            test_auc_std,
            test_ap_mean,
            test_ap_std,
        })
    }
}

/// Mean and population standard deviation. `(0, 0)` for an empty slice.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
