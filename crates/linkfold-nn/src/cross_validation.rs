//! Cross-validated link prediction experiments.
//!
//! The edge set is split once; every run reuses the same folds and only
//! re-draws model parameters and online negatives. Each fold trains a fresh
//! model from scratch:
//!
//! ```text
//! for run in 0..runs:
//!     for fold in folds:
//!         model, optimizer, schedule = new(seed(run, fold))
//!         for epoch in 1..=epochs:
//!             train_epoch -> evaluate -> early stopping (snapshot on best)
//!             break if stopped
//!         restore best snapshot -> evaluate -> fold record
//!     run record = mean over folds
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use linkfold_core::early_stop::{EarlyStopping, StopState};
use linkfold_core::record::{EpochRecord, ExperimentSummary, FoldRecord, ResultLog, RunRecord};
use linkfold_core::report::{write_json, write_result_log};
use linkfold_core::sampling::{derive_seed, seeded_rng, NegativeSampler};
use linkfold_core::split::split;
use linkfold_core::{CanonicalEdge, Fold, Graph, TrainingGraph};

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::evaluation::evaluate;
use crate::graph_tensors::{graph_features, node_features, GraphTensors};
use crate::model::{EdgeModel, LinkModel, ParameterSnapshot};
use crate::optim::{Adam, CosineAnnealing};
use crate::training::{train_epoch, TrainingData};

/// Node feature width of every [`FeatureMode`](crate::FeatureMode).
const FEATURE_CHANNELS: usize = 1;

/// Fold-independent inputs, built once per experiment.
#[derive(Debug, Clone)]
pub struct SharedInputs {
    pub num_nodes: usize,
    /// Every positive edge; online negatives avoid all of them.
    pub positives: HashSet<CanonicalEdge>,
    /// Node features when they do not depend on the fold.
    pub features: Option<Tensor>,
    pub device: Device,
}

impl SharedInputs {
    pub fn new(graph: &Graph, config: &ExperimentConfig) -> Result<Self> {
        let device = config.device()?;
        let features = graph_features(graph, config.features, &device)?;
        Ok(Self {
            num_nodes: graph.num_nodes(),
            positives: graph.edge_set(),
            features,
            device,
        })
    }

    fn fold_features(&self, training_graph: &TrainingGraph, config: &ExperimentConfig) -> Result<Tensor> {
        match &self.features {
            Some(x) => Ok(x.clone()),
            None => node_features(training_graph, config.features, &self.device),
        }
    }
}

/// Everything an experiment produced, with the configuration that produced it.
#[derive(Debug, Clone)]
pub struct ExperimentReport {
    pub config: ExperimentConfig,
    pub log: ResultLog,
}

impl ExperimentReport {
    pub fn runs(&self) -> &[RunRecord] {
        self.log.runs()
    }

    pub fn summary(&self) -> Option<ExperimentSummary> {
        self.log.summary()
    }

    /// Write `config.json` and the result tables under
    /// `root/<dataset>/<results_dir_name>/`. Returns that directory.
    pub fn write_to(&self, root: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = root
            .as_ref()
            .join(&self.config.dataset)
            .join(self.config.results_dir_name());
        write_result_log(&dir, &self.log)?;
        write_json(dir.join("config.json"), &self.config)?;
        Ok(dir)
    }
}

/// Run the full experiment described by `config` on `graph`.
pub fn cross_validate(graph: &Graph, config: &ExperimentConfig) -> Result<ExperimentReport> {
    config.validate()?;
    let shared = SharedInputs::new(graph, config)?;
    let folds = split(graph.edges(), graph.num_nodes(), &config.split_config())?;

    tracing::info!(
        dataset = %config.dataset,
        encoder = %config.encoder,
        features = %config.features,
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        folds = folds.len(),
        runs = config.runs,
        patience = config.patience(),
        device = ?shared.device,
        "starting cross-validation"
    );

    let mut log = ResultLog::new();

    for run in 0..config.runs {
        let run_seed = derive_seed(config.seed, run as u64);
        for fold in &folds {
            let record = run_fold(&shared, fold, config, run, run_seed, &mut log)?;
            tracing::info!(
                run,
                fold = fold.index,
                best_epoch = record.best_epoch,
                test_auc = record.test_auc,
                test_ap = record.test_ap,
                "fold finished"
            );
            log.push_fold(record);
        }
        if let Some(r) = log.finish_run(run) {
            tracing::info!(run, test_auc = r.test_auc, test_ap = r.test_ap, "run finished");
        }
    }

    if let Some(s) = log.summary() {
        tracing::info!(
            runs = s.runs,
            test_auc = s.test_auc_mean,
            test_auc_std = s.test_auc_std,
            test_ap = s.test_ap_mean,
            test_ap_std = s.test_ap_std,
            "experiment finished"
        );
    }

    Ok(ExperimentReport {
        config: config.clone(),
        log,
    })
}

/// Train and evaluate one fold with a freshly built model.
///
/// Per-epoch records are appended to `log`; the fold record is returned.
pub fn run_fold(
    shared: &SharedInputs,
    fold: &Fold,
    config: &ExperimentConfig,
    run: usize,
    run_seed: u64,
    log: &mut ResultLog,
) -> Result<FoldRecord> {
    let stream = 2 * fold.index as u64;
    let model_seed = derive_seed(run_seed, stream);
    let mut rng = seeded_rng(derive_seed(run_seed, stream + 1));
    let num_nodes = shared.num_nodes;

    let training_graph = fold.training_graph(num_nodes);
    let features = shared.fold_features(&training_graph, config)?;
    let graph = GraphTensors::new(&training_graph, config.encoder.propagation(), &shared.device)?;

    let model = LinkModel::new(&config.model_spec(FEATURE_CHANNELS), model_seed, &shared.device)?;
    let mut optimizer = Adam::new(model.parameters(), config.adam_config())?;
    let mut schedule = CosineAnnealing::new(config.learning_rate, config.schedule_period());
    let parameters = model.num_parameters()?;
    tracing::debug!(
        run,
        fold = fold.index,
        encoder = %model.encoder_kind(),
        parameters,
        device = ?model.device(),
        train_edges = fold.train_pos.len(),
        "model built"
    );

    let mut forbidden = shared.positives.clone();
    if config.exclude_held_out_negatives {
        forbidden.extend(fold.held_out_negatives().copied());
    }
    let sampler = NegativeSampler::new(num_nodes);
    let data = TrainingData {
        features: &features,
        graph: &graph,
        positives: &fold.train_pos,
        forbidden: &forbidden,
    };

    let mut stopper: EarlyStopping<ParameterSnapshot> = EarlyStopping::new(config.patience());
    let mut epochs_trained = 0;

    for epoch in 1..=config.epochs {
        let start = Instant::now();
        let loss = train_epoch(
            &model,
            &data,
            &sampler,
            &mut optimizer,
            &mut schedule,
            config.batch_size,
            &mut rng,
        )?;
        let train_seconds = start.elapsed().as_secs_f64();

        let eval = evaluate(&model, &features, &graph, fold, config.batch_size)?;
        epochs_trained = epoch;
        log.push_epoch(EpochRecord::new(run, fold.index, epoch, loss.last_batch, &eval, train_seconds));
        tracing::info!(
            run,
            fold = fold.index,
            epoch,
            loss = loss.last_batch,
            lr = loss.learning_rate,
            valid_auc = eval.valid.auc,
            valid_ap = eval.valid.ap,
            test_auc = eval.test.auc,
            test_ap = eval.test.ap,
            secs = train_seconds,
            "epoch"
        );

        let state = stopper.try_observe(epoch, eval.valid.auc, || ParameterSnapshot::capture(model.parameters()))?;
        if state == StopState::Stopped {
            break;
        }
    }

    let stopped_early = stopper.is_stopped();
    let best_epoch = stopper.best_epoch().unwrap_or(0);
    match stopper.into_best() {
        Some((epoch, snapshot)) => {
            snapshot.restore(model.parameters())?;
            tracing::debug!(fold = fold.index, epoch, "restored best parameters");
        }
        None => tracing::warn!(fold = fold.index, "validation AUC never improved, keeping final parameters"),
    }

    let last = evaluate(&model, &features, &graph, fold, config.batch_size)?;
    Ok(FoldRecord {
        run,
        fold: fold.index,
        best_epoch,
        epochs_trained,
        stopped_early,
        valid_auc: last.valid.auc,
        valid_ap: last.valid.ap,
        test_auc: last.test.auc,
        test_ap: last.test.ap,
    })
}
