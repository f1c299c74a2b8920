use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
    let settings = dir.path().join("settings.json");
    let toml = format!(
        r#"
[measure]
frames = 2
delay_ms = 1

[capture]
width = 160
height = 120

[storage]
settings_path = "{}"
"#,
        settings.display().to_string().replace('\\', "/")
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    (path, settings)
}

fn roastcam(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("roastcam").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

fn points(cfg: &Path) -> Vec<serde_json::Value> {
    let out = roastcam(cfg)
        .args(["--json", "point", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    v["points"].as_array().unwrap().clone()
}

#[test]
fn points_fit_and_reset_persist_across_runs() {
    let dir = tempdir().unwrap();
    let (cfg, settings) = write_config(&dir);

    for (agtron, lab) in [("80", "60,2,20"), ("55", "45,5,16"), ("35", "30,7,11")] {
        roastcam(&cfg)
            .args(["point", "add", "--agtron", agtron, "--lab", lab])
            .assert()
            .success();
    }
    assert_eq!(points(&cfg).len(), 3);
    assert!(settings.exists());

    roastcam(&cfg)
        .args(["fit", "linear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("linear fit over 3 points"));

    // The fitted model is used by later runs
    roastcam(&cfg)
        .args(["--json", "measure"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""model":"linear""#));

    roastcam(&cfg).args(["model", "clear"]).assert().success();
    roastcam(&cfg)
        .args(["--json", "measure"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""model":"formula""#));

    roastcam(&cfg).arg("reset").assert().success();
    assert!(!settings.exists());
    assert!(points(&cfg).is_empty());
}

#[test]
fn captured_point_uses_the_live_sample() {
    let dir = tempdir().unwrap();
    let (cfg, _) = write_config(&dir);

    roastcam(&cfg)
        .args(["--sim-sample", "200,200,200", "point", "add", "--agtron", "90"])
        .assert()
        .success();
    let p = points(&cfg);
    assert_eq!(p.len(), 1);
    // neutral gray 200 is L* ≈ 80.6
    let l = p[0]["L"].as_f64().unwrap();
    assert!((l - 80.6).abs() < 0.1, "L = {l}");
    assert_eq!(p[0]["agtron"].as_f64(), Some(90.0));
}

#[test]
fn csv_import_appends_points() {
    let dir = tempdir().unwrap();
    let (cfg, _) = write_config(&dir);
    let csv = dir.path().join("points.csv");
    fs::write(&csv, "agtron,L,a,b\n72.0,51.3,6.1,18.4\n48.5,33.0,8.8,14.2\n").unwrap();

    roastcam(&cfg)
        .args(["point", "import"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 points imported"));
    assert_eq!(points(&cfg).len(), 2);

    roastcam(&cfg).args(["point", "clear"]).assert().success();
    assert!(points(&cfg).is_empty());
}

#[test]
fn export_then_import_restores_settings() {
    let dir = tempdir().unwrap();
    let (cfg, settings) = write_config(&dir);
    let exported = dir.path().join("export.json");

    roastcam(&cfg)
        .args(["set", "--scale", "1.5", "--offset", "-4", "--scheme", "commercial", "--gate", "strict"])
        .assert()
        .success();
    roastcam(&cfg)
        .args(["model", "export", "--out"])
        .arg(&exported)
        .assert()
        .success();

    roastcam(&cfg).arg("reset").assert().success();
    assert!(!settings.exists());

    roastcam(&cfg)
        .args(["model", "import"])
        .arg(&exported)
        .assert()
        .success();

    let out = roastcam(&cfg)
        .args(["--json", "set"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["scale"].as_f64(), Some(1.5));
    assert_eq!(v["offset"].as_f64(), Some(-4.0));
    assert_eq!(v["scheme"], "commercial");
    assert_eq!(v["gate"], "strict");
}

#[test]
fn malformed_import_leaves_settings_untouched() {
    let dir = tempdir().unwrap();
    let (cfg, settings) = write_config(&dir);
    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{"version":1,"gains":{"r":-1,"g":1,"b":1}}"#).unwrap();

    roastcam(&cfg)
        .args(["set", "--scale", "2"])
        .assert()
        .success();
    let before = fs::read(&settings).unwrap();

    roastcam(&cfg)
        .args(["model", "import"])
        .arg(&bad)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("left unchanged"));
    assert_eq!(fs::read(&settings).unwrap(), before);
}

#[test]
fn corrupt_settings_file_can_be_reset() {
    let dir = tempdir().unwrap();
    let (cfg, settings) = write_config(&dir);
    fs::write(&settings, "{ not json").unwrap();

    // Other commands fall back to defaults instead of failing
    assert!(points(&cfg).is_empty());

    roastcam(&cfg)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("settings reset"));
    assert!(!settings.exists());
}

#[test]
fn corrupt_settings_file_can_be_replaced_by_import() {
    let dir = tempdir().unwrap();
    let (cfg, settings) = write_config(&dir);
    let good = dir.path().join("good.json");

    roastcam(&cfg)
        .args(["set", "--scale", "1.7"])
        .assert()
        .success();
    roastcam(&cfg)
        .args(["model", "export", "--out"])
        .arg(&good)
        .assert()
        .success();
    fs::write(&settings, "{ not json").unwrap();

    roastcam(&cfg)
        .args(["model", "import"])
        .arg(&good)
        .assert()
        .success();
    assert_eq!(fs::read(&settings).unwrap(), fs::read(&good).unwrap());

    let out = roastcam(&cfg)
        .args(["--json", "set"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["scale"].as_f64(), Some(1.7));
}

#[test]
fn poly_fit_help_and_error_name_the_point_count() {
    let dir = tempdir().unwrap();
    let (cfg, _) = write_config(&dir);

    roastcam(&cfg)
        .args(["fit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("at least 5 calibration points"));

    for (agtron, lab) in [("80", "60,2,20"), ("55", "45,5,16"), ("35", "30,7,11")] {
        roastcam(&cfg)
            .args(["point", "add", "--agtron", agtron, "--lab", lab])
            .assert()
            .success();
    }
    roastcam(&cfg)
        .args(["fit", "poly"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("(3 of 5)"));
}
