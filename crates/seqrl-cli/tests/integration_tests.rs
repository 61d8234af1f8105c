use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("seqrl").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reinforcement learning for sequence generators"));
}

#[test]
fn test_cli_tasks() {
    let mut cmd = Command::cargo_bin("seqrl").unwrap();
    cmd.arg("tasks")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available tasks:"))
        .stdout(predicate::str::contains("similarity"));
}

#[test]
fn test_cli_config_then_validate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    Command::cargo_bin("seqrl")
        .unwrap()
        .arg("config")
        .arg("--output")
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    Command::cargo_bin("seqrl")
        .unwrap()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"));
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"num_lanes": 0}"#).unwrap();

    Command::cargo_bin("seqrl")
        .unwrap()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("num_lanes"));
}

#[test]
fn test_cli_sample() {
    let output = Command::cargo_bin("seqrl")
        .unwrap()
        .arg("sample")
        .arg("length")
        .arg("--num")
        .arg("5")
        .arg("--seed")
        .arg("1")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(output).unwrap();
    // Log lines share stdout with the scores
    let lines: Vec<&str> = text.lines().filter(|l| l.contains('\t')).collect();
    assert_eq!(lines.len(), 5);
    for line in lines {
        let score: f32 = line.split('\t').next().unwrap().parse().unwrap();
        assert!((0.0..=1.0).contains(&score));
    }
}

#[test]
fn test_cli_sample_unknown_task() {
    Command::cargo_bin("seqrl")
        .unwrap()
        .arg("sample")
        .arg("docking")
        .assert()
        .failure();
}

#[test]
#[cfg(feature = "torch")]
fn test_cli_train_short_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"num_lanes": 4, "max_length": 12, "progress": false, "replay": {"capacity": 8, "batch_size": 2}}"#,
    )
    .unwrap();

    Command::cargo_bin("seqrl")
        .unwrap()
        .arg("train")
        .arg("length")
        .arg("--config")
        .arg(&path)
        .arg("--sequences")
        .arg("8")
        .assert()
        .success()
        .stdout(predicate::str::contains("Finished 2 iterations"));
}
