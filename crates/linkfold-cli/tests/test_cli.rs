use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// 24-node ring plus chords, written with 1-based ids.
fn write_ring(dir: &Path) -> PathBuf {
    let n = 24;
    let mut text = String::from("# ring with chords\n");
    for i in 0..n {
        text.push_str(&format!("{} {}\n", i + 1, (i + 1) % n + 1));
    }
    for i in (0..n).step_by(2) {
        text.push_str(&format!("{} {}\n", i + 1, (i + 5) % n + 1));
    }
    let path = dir.join("ring.txt");
    fs::write(&path, text).unwrap();
    path
}

fn tiny_run(cmd: &mut Command, input: &Path, output: &Path) {
    cmd.arg("run")
        .arg(input)
        .arg("-o")
        .arg(output)
        .args(["--epochs", "2", "--folds", "3", "--runs", "1"])
        .args(["--encoder-channels", "8", "--hidden-channels", "8", "--lr", "0.01"]);
}

#[test]
fn test_cli_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("linkfold")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("summarize"));
    Ok(())
}

#[test]
fn test_cli_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("triangle.txt");
    // Triangle plus a pendant, one duplicate and one self-loop.
    fs::write(&file, "1 2\n2 3\n3 1\n3 4\n2 1\n4 4\n")?;

    let mut cmd = Command::cargo_bin("linkfold")?;
    cmd.arg("stats").arg(&file);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Nodes:          4"))
        .stdout(predicate::str::contains("Edges:          4"))
        .stdout(predicate::str::contains("Free non-edges: 2"));
    Ok(())
}

#[test]
fn test_cli_stats_missing_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("linkfold")?;
    cmd.arg("stats").arg("does/not/exist.txt");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load edge list"));
    Ok(())
}

#[test]
fn test_cli_unknown_encoder_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = write_ring(dir.path());

    let mut cmd = Command::cargo_bin("linkfold")?;
    cmd.arg("run").arg(&input).args(["--model", "transformer"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown encoder"));
    Ok(())
}

#[test]
fn test_cli_run_then_summarize() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = write_ring(dir.path());
    let results = dir.path().join("results");

    let mut cmd = Command::cargo_bin("linkfold")?;
    tiny_run(&mut cmd, &input, &results);
    cmd.args(["--model", "graphsage"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Run 0: test AUC"))
        .stdout(predicate::str::contains("Test AUC:"))
        .stdout(predicate::str::contains("Results written to"));

    let runs: Vec<_> = fs::read_dir(results.join("ring"))?.collect::<Result<_, _>>()?;
    assert_eq!(runs.len(), 1);
    let run_dir = runs[0].path();
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("ring-model_graphsage-cv3-"));
    for file in ["epochs.csv", "folds.csv", "runs.csv", "summary.json", "config.json"] {
        assert!(run_dir.join(file).exists(), "missing {file}");
    }

    let mut cmd = Command::cargo_bin("linkfold")?;
    cmd.arg("summarize").arg(&results);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("folds.csv"))
        .stdout(predicate::str::contains("test_auc="));
    assert!(results.join("overall_metrics.csv").exists());
    Ok(())
}

#[test]
fn test_cli_run_from_saved_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = write_ring(dir.path());
    let config = dir.path().join("config.json");
    fs::write(
        &config,
        r#"{"dataset": "saved", "encoder": "gat", "encoder_channels": 4, "hidden_channels": 4,
            "epochs": 1, "folds": 2, "runs": 1, "features": "ones"}"#,
    )?;
    let results = dir.path().join("out");

    let mut cmd = Command::cargo_bin("linkfold")?;
    cmd.arg("run")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .arg("-o")
        .arg(&results)
        .args(["--patience", "0"]);
    cmd.assert().success();

    let runs: Vec<_> = fs::read_dir(results.join("saved"))?.collect::<Result<_, _>>()?;
    assert_eq!(runs.len(), 1);
    let name = runs[0].file_name().to_string_lossy().into_owned();
    assert!(name.starts_with("saved-model_gat-cv2-"), "{name}");
    assert!(name.contains("-patience_0-"), "{name}");
    Ok(())
}
