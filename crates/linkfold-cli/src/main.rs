//! linkfold CLI - cross-validated link prediction from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Node/edge counts, density, free non-edge pairs
//! linkfold stats data/karate.txt
//!
//! # 5-fold CV, two runs, GCN encoder
//! linkfold run data/karate.txt --model gcn --epochs 200 -o results
//!
//! # Start from a saved config, override one field
//! linkfold run data/karate.txt --config results/karate/.../config.json --runs 5
//!
//! # Average every results CSV under a directory
//! linkfold summarize results
//! ```
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG=debug` for
//! per-batch losses.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::ProgressBar;
use linkfold_core::report::summarize_directory;
use linkfold_core::Graph;
use linkfold_nn::{cross_validate, EncoderKind, ExperimentConfig, FeatureMode};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "linkfold")]
#[command(about = "Cross-validated link prediction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about an edge list
    Stats {
        /// Edge list file (`u v` per line)
        input: PathBuf,
    },

    /// Run a cross-validated link prediction experiment
    Run(RunArgs),

    /// Average the numeric columns of every results CSV under a directory
    Summarize {
        /// Results root directory
        root: PathBuf,
    },
}

/// Flags left unset fall back to `--config`, then to the built-in defaults.
#[derive(Args)]
struct RunArgs {
    /// Edge list file (`u v` per line)
    input: PathBuf,

    /// Results root directory
    #[arg(short, long, default_value = "results")]
    output: PathBuf,

    /// JSON experiment config to start from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset label (default: input file stem)
    #[arg(long)]
    dataset: Option<String>,

    /// Encoder: gcn, gat or graphsage
    #[arg(short, long)]
    model: Option<String>,

    /// Embedding width
    #[arg(long)]
    encoder_channels: Option<usize>,

    /// Decoder hidden width
    #[arg(long)]
    hidden_channels: Option<usize>,

    /// Dropout on encoder output
    #[arg(long)]
    encoder_dropout: Option<f32>,

    /// Dropout inside the decoder
    #[arg(long)]
    decoder_dropout: Option<f32>,

    /// Learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Maximum epochs per fold
    #[arg(long)]
    epochs: Option<usize>,

    /// Mini-batch size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Schedule divisor (cosine period epochs/t, patience epochs/t/2)
    #[arg(long)]
    t: Option<usize>,

    /// Early-stopping patience (0 disables)
    #[arg(long)]
    patience: Option<usize>,

    /// Gradient norm bound
    #[arg(long)]
    max_grad_norm: Option<f64>,

    /// Number of folds
    #[arg(long)]
    folds: Option<usize>,

    /// Number of runs
    #[arg(long)]
    runs: Option<usize>,

    /// Validation fraction of each fold's training edges
    #[arg(long)]
    val_fraction: Option<f64>,

    /// Seed of the fold partition
    #[arg(long)]
    split_seed: Option<u64>,

    /// Seed of parameter init and training negatives
    #[arg(long)]
    seed: Option<u64>,

    /// Node features: full_degree (default), train_degree or ones
    #[arg(long)]
    features: Option<String>,

    /// Keep validation/test negatives out of training negatives
    #[arg(long)]
    exclude_held_out_negatives: bool,

    /// CUDA device ordinal (falls back to CPU if unavailable)
    #[arg(long)]
    cuda: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { input } => cmd_stats(&input),
        Commands::Run(args) => cmd_run(args),
        Commands::Summarize { root } => cmd_summarize(&root),
    }
}

fn load_graph(path: &Path) -> Result<Graph> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", path.display()));

    let graph = Graph::from_edge_list_file(path)
        .with_context(|| format!("Failed to load edge list {}", path.display()))?;

    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(graph)
}

fn cmd_stats(input: &Path) -> Result<()> {
    let graph = load_graph(input)?;
    let stats = graph.stats();

    println!("Graph Statistics");
    println!("================");
    println!("Nodes:          {}", stats.num_nodes);
    println!("Edges:          {}", stats.num_edges);
    println!("Node pairs:     {}", stats.num_pairs);
    println!("Free non-edges: {}", stats.num_non_edges);
    println!("Density:        {:.6}", stats.density);
    println!("Avg degree:     {:.2}", stats.avg_degree);
    println!("Max degree:     {}", stats.max_degree);

    Ok(())
}

fn build_config(args: &RunArgs) -> Result<ExperimentConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text =
                fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => ExperimentConfig::default(),
    };

    if let Some(dataset) = &args.dataset {
        config.dataset = dataset.clone();
    } else if args.config.is_none() {
        if let Some(stem) = args.input.file_stem() {
            config.dataset = stem.to_string_lossy().into_owned();
        }
    }
    if let Some(model) = &args.model {
        config.encoder = model.parse::<EncoderKind>()?;
    }
    if let Some(features) = &args.features {
        config.features = features.parse::<FeatureMode>()?;
    }

    macro_rules! override_with {
        ($($flag:ident => $field:ident),* $(,)?) => {
            $(if let Some(v) = args.$flag { config.$field = v; })*
        };
    }
    override_with!(
        encoder_channels => encoder_channels,
        hidden_channels => hidden_channels,
        encoder_dropout => encoder_dropout,
        decoder_dropout => decoder_dropout,
        lr => learning_rate,
        epochs => epochs,
        batch_size => batch_size,
        t => t,
        max_grad_norm => max_grad_norm,
        folds => folds,
        runs => runs,
        val_fraction => val_fraction,
        split_seed => split_seed,
        seed => seed,
    );
    if args.patience.is_some() {
        config.patience = args.patience;
    }
    if args.cuda.is_some() {
        config.cuda_device = args.cuda;
    }
    if args.exclude_held_out_negatives {
        config.exclude_held_out_negatives = true;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let graph = load_graph(&args.input)?;

    let start = Instant::now();
    let report = cross_validate(&graph, &config)?;
    let elapsed = start.elapsed();

    let dir = report
        .write_to(&args.output)
        .with_context(|| format!("Failed to write results under {}", args.output.display()))?;

    println!("Cross-validation ({}, {} folds)", config.encoder, config.folds);
    println!("=================================");
    for r in report.runs() {
        println!("Run {}: test AUC {:.4}, test AP {:.4}", r.run, r.test_auc, r.test_ap);
    }
    if let Some(s) = report.summary() {
        println!("Test AUC: {:.4} +/- {:.4}", s.test_auc_mean, s.test_auc_std);
        println!("Test AP:  {:.4} +/- {:.4}", s.test_ap_mean, s.test_ap_std);
    }
    println!("Finished in {:.2?}", elapsed);
    println!("Results written to {}", dir.display());

    Ok(())
}

fn cmd_summarize(root: &Path) -> Result<()> {
    let summaries =
        summarize_directory(root).with_context(|| format!("Failed to summarize {}", root.display()))?;

    for s in &summaries {
        let cols: Vec<String> = s
            .means
            .iter()
            .filter(|(name, _)| name.contains("auc") || name.contains("ap"))
            .map(|(name, mean)| format!("{name}={mean:.4}"))
            .collect();
        println!("{}: {}", s.file, cols.join(" "));
    }
    println!(
        "Wrote {} ({} files)",
        root.join(linkfold_core::report::OVERALL_METRICS_FILE).display(),
        summaries.len()
    );

    Ok(())
}
