//! Smoke tests for subcommands that need no recognition models.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `coinscan` command whose config directory lives in `home`.
fn coinscan(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("coinscan").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    coinscan(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn config_path_reports_missing_file() {
    let home = TempDir::new().unwrap();
    coinscan(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn config_show_prints_defaults() {
    let home = TempDir::new().unwrap();
    coinscan(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"direct_min_confidence\": 0.08"))
        .stdout(predicate::str::contains("\"grouped_ceiling\": 9999999"));
}

#[test]
fn config_init_set_get() {
    let home = TempDir::new().unwrap();

    coinscan(&home).args(["config", "init"]).assert().success();
    coinscan(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    coinscan(&home)
        .args(["config", "set", "candidates.bare_ceiling", "150000"])
        .assert()
        .success();
    coinscan(&home)
        .args(["config", "get", "candidates.bare_ceiling"])
        .assert()
        .success()
        .stdout(predicate::str::contains("150000"));

    coinscan(&home)
        .args(["config", "get", "regions.boxes.0.x1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.68"));
}

#[test]
fn config_set_rejects_invalid_region() {
    let home = TempDir::new().unwrap();
    coinscan(&home)
        .args(["config", "set", "regions.boxes.0.x2", "0.1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("regions.boxes[0]"));
}

#[test]
fn config_get_unknown_key() {
    let home = TempDir::new().unwrap();
    coinscan(&home)
        .args(["config", "get", "nope.missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn extract_missing_file_fails() {
    let home = TempDir::new().unwrap();
    coinscan(&home)
        .args(["extract", "/nonexistent/balance.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn extract_unresolvable_record_fails() {
    let home = TempDir::new().unwrap();
    coinscan(&home)
        .args(["extract", "--json", r#"{"size": 3}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not resolve"));
}

#[test]
fn extract_undecodable_file_fails() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("broken.png");
    std::fs::write(&path, b"not an image").unwrap();

    coinscan(&home)
        .arg("extract")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to decode"));
}

#[test]
fn extract_without_models_fails() {
    let home = TempDir::new().unwrap();
    let models = TempDir::new().unwrap();
    let path = home.path().join("balance.png");
    image::GrayImage::from_pixel(120, 40, image::Luma([200]))
        .save(&path)
        .unwrap();

    coinscan(&home)
        .arg("extract")
        .arg(&path)
        .arg("--model-dir")
        .arg(models.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Balance").not())
        .stderr(predicate::str::contains("Cannot load OCR models"))
        .stderr(predicate::str::contains("failed to load model"));
}

#[test]
fn batch_without_matches_fails() {
    let home = TempDir::new().unwrap();
    let pattern = home.path().join("*.png");

    coinscan(&home)
        .arg("batch")
        .arg(pattern.to_string_lossy().as_ref())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching images"));
}
