use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Small simulated frame and a short measurement keep each run fast
fn write_config(dir: &tempfile::TempDir, gate: &str) -> PathBuf {
    let settings = dir.path().join("settings.json");
    let toml = format!(
        r#"
[measure]
frames = 3
delay_ms = 1

[quality]
profile = "{gate}"

[capture]
device_tag = "bench-1"
width = 200
height = 120

[storage]
settings_path = "{}"
"#,
        settings.display().to_string().replace('\\', "/")
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["analyze"], 0, "L*=", "stdout")]
#[case(&["measure"], 0, "Agtron", "stdout")]
#[case(&["calibrate", "white"], 0, "gains", "stdout")]
#[case(&["self-check"], 0, "OK", "stdout")]
#[case(&["fit"], 2, "required", "stderr")]
#[case(&["--sim-glare", "0.5", "measure"], 3, "quality gate", "stderr")]
#[case(&["fit", "poly"], 4, "Not enough calibration points", "stderr")]
#[case(&["--image", "does-not-exist.png", "self-check"], 6, "could not be opened", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "normal");

    let mut cmd = Command::cargo_bin("roastcam").unwrap();
    cmd.current_dir(dir.path());
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case::strict("strict")]
#[case::relaxed("relaxed")]
fn glare_is_rejected_by_every_gate(#[case] gate: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, gate);
    let csv = dir.path().join("log.csv");

    Command::cargo_bin("roastcam")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["--sim-glare", "0.5", "measure", "--csv"])
        .arg(&csv)
        .assert()
        .code(3);
    assert!(!csv.exists(), "rejected measurement must not write a log");
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("roastcam")
        .unwrap()
        .current_dir(dir.path())
        .args(["--config", "nope.toml", "point", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no calibration points"));
}

#[test]
fn unknown_config_key_is_explained() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[model]\nslope = 2.0\n").unwrap();

    Command::cargo_bin("roastcam")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not valid TOML"));
}

#[test]
fn out_of_range_config_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[stability]\nema_alpha = 1.5\n").unwrap();

    Command::cargo_bin("roastcam")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ema_alpha"));
}

#[test]
fn bad_calibration_header_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "normal");
    let bad_csv = dir.path().join("points.csv");
    fs::write(&bad_csv, "score,L,a,b\n60,50,5,15\n").unwrap();

    Command::cargo_bin("roastcam")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["point", "import"])
        .arg(&bad_csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn measure_writes_csv_log() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "normal");
    let csv = dir.path().join("log.csv");

    Command::cargo_bin("roastcam")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["measure", "--frames", "2", "--csv"])
        .arg(&csv)
        .assert()
        .success();

    let text = fs::read_to_string(&csv).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        r#""time","L","a","b","Agtron","category","model","scale","offset","glare","wbDev","ready","gate","mode","device""#
    );
    let row = lines.next().unwrap();
    assert!(row.contains(r#""formula""#), "{row}");
    assert!(row.ends_with(r#""normal","ground","bench-1""#), "{row}");
    assert!(lines.next().is_none());
}

#[test]
fn snapshot_writes_png() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "normal");
    let out = dir.path().join("snap.png");

    Command::cargo_bin("roastcam")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["snapshot", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("written"));

    let bytes = fs::read(&out).unwrap();
    assert_eq!(&bytes[..4], b"\x89PNG");
}
