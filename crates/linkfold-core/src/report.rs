//! CSV/JSON result files and cross-experiment summaries.
//!
//! An experiment directory holds:
//!
//! | File | Rows |
//! |------|------|
//! | `epochs.csv` | one [`EpochRecord`](crate::record::EpochRecord) per fold epoch |
//! | `folds.csv` | one [`FoldRecord`](crate::record::FoldRecord) per fold and run |
//! | `runs.csv` | one [`RunRecord`](crate::record::RunRecord) per run |
//! | `summary.json` | [`ExperimentSummary`](crate::record::ExperimentSummary) |
//!
//! [`summarize_directory`] walks a tree of such directories and averages
//! every numeric column of every CSV it finds into `overall_metrics.csv`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::record::ResultLog;
use crate::Result;

/// File written by [`summarize_directory`].
pub const OVERALL_METRICS_FILE: &str = "overall_metrics.csv";

/// Serialize rows to a headered CSV file.
pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Serialize a value to a pretty-printed JSON file.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let file = fs::File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// Write the tables of a result log into `dir`, creating it if needed.
pub fn write_result_log(dir: impl AsRef<Path>, log: &ResultLog) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_csv(dir.join("epochs.csv"), log.epochs())?;
    write_csv(dir.join("folds.csv"), log.folds())?;
    write_csv(dir.join("runs.csv"), log.runs())?;
    if let Some(summary) = log.summary() {
        write_json(dir.join("summary.json"), &summary)?;
    }
    tracing::info!(dir = %dir.display(), "wrote results");
    Ok(())
}

/// Column means of one CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    /// Path relative to the summarized root.
    pub file: String,
    /// Mean of every column whose non-empty cells all parse as numbers.
    pub means: BTreeMap<String, f64>,
}

/// Average the numeric columns of every CSV under `root`.
///
/// Files are visited recursively in sorted path order. Earlier
/// `overall_metrics.csv` files are skipped, as are files that fail to parse
/// (logged as warnings). The result is also written to
/// `root/overall_metrics.csv`, one row per file, columns unioned.
pub fn summarize_directory(root: impl AsRef<Path>) -> Result<Vec<FileSummary>> {
    let root = root.as_ref();
    let mut files = Vec::new();
    collect_csv_files(root, &mut files)?;

    let mut summaries = Vec::with_capacity(files.len());
    for path in &files {
        let means = match column_means(path) {
            Ok(means) => means,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable CSV");
                continue;
            }
        };
        if means.is_empty() {
            tracing::debug!(file = %path.display(), "no numeric columns");
            continue;
        }
        let file = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        summaries.push(FileSummary { file, means });
    }

    write_overall(&root.join(OVERALL_METRICS_FILE), &summaries)?;
    tracing::info!(files = summaries.len(), root = %root.display(), "summarized results");
    Ok(summaries)
}

fn collect_csv_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_csv_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "csv")
            && path.file_name().is_some_and(|name| name != OVERALL_METRICS_FILE)
        {
            out.push(path);
        }
    }
    Ok(())
}

fn column_means(path: &Path) -> Result<BTreeMap<String, f64>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut sums = vec![0.0f64; headers.len()];
    let mut counts = vec![0usize; headers.len()];
    let mut numeric = vec![true; headers.len()];

    for record in reader.records() {
        let record = record?;
        for (i, cell) in record.iter().enumerate().take(headers.len()) {
            let cell = cell.trim();
            if cell.is_empty() || !numeric[i] {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(v) => {
                    sums[i] += v;
                    counts[i] += 1;
                }
                Err(_) => numeric[i] = false,
            }
        }
    }

    Ok(headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| numeric[i] && counts[i] > 0)
        .map(|(i, name)| (name.to_string(), sums[i] / counts[i] as f64))
        .collect())
}

fn write_overall(path: &Path, summaries: &[FileSummary]) -> Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    for s in summaries {
        for name in s.means.keys() {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["file"];
    header.extend(columns.iter().copied());
    writer.write_record(&header)?;

    for s in summaries {
        let mut row = vec![s.file.clone()];
        row.extend(
            columns
                .iter()
                .map(|c| s.means.get(*c).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
