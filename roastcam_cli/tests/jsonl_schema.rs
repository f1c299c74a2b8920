use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir) -> PathBuf {
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
    path
}

fn json_line(stdout: &[u8], key: &str) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains(&format!("\"{key}\"")))
        .unwrap_or_else(|| panic!("no JSON line with {key}; stdout was: {stdout}"));
    serde_json::from_str(line).expect("valid JSON")
}

/// Validate the JSON schema of an accepted measurement.
#[rstest]
fn measurement_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);

    let mut cmd = Command::cargo_bin("roastcam").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("measure");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "measurement");
    let m = &v["measurement"];

    assert!(m["time"].as_str().is_some_and(|t| t.ends_with('Z')));
    for key in ["score", "scale", "offset", "glare", "wb_deviation", "readiness"] {
        assert!(m[key].as_f64().is_some(), "{key} should be a number");
    }
    for key in ["L", "a", "b"] {
        assert!(m["lab"][key].as_f64().is_some(), "lab.{key} should be a number");
    }
    assert_eq!(m["model"], "formula");
    assert_eq!(m["gate"], "normal");
    assert_eq!(m["mode"], "ground");
    assert_eq!(m["device"], "default");
    assert_eq!(m["frames"].as_u64(), Some(2));
    assert!(m["category"].as_str().is_some_and(|c| !c.is_empty()));
}

/// Live analysis exposes the quality signals and the category record.
#[rstest]
fn analysis_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);

    let out = Command::cargo_bin("roastcam")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["analyze", "--passes", "3"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "pass");
    let p = &v["pass"];
    for key in ["score", "glare", "wb_deviation", "stability", "readiness"] {
        assert!(p[key].as_f64().is_some(), "{key} should be a number");
    }
    assert!(p["category"]["name"].as_str().is_some());
    assert!(p["category"]["color"].as_str().is_some());
    assert!(p["advisories"].is_array());
    assert!(p["samples"].as_u64().is_some_and(|n| n > 0));
}

/// Errors under --json are a single object with a stable reason and details.
#[rstest]
#[case::gate(&["--sim-glare", "0.5", "measure"], 3, "GateRejected", Some("signal"))]
#[case::points(&["fit", "linear"], 4, "InsufficientPoints", Some("needed"))]
#[case::camera(&["--image", "missing.png", "analyze"], 6, "CaptureUnavailable", None)]
fn error_schema(
    #[case] args: &[&str],
    #[case] code: i32,
    #[case] reason: &str,
    #[case] detail_key: Option<&str>,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);

    let out = Command::cargo_bin("roastcam")
        .unwrap()
        .current_dir(dir.path())
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(args)
        .assert()
        .code(code)
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "reason");
    assert_eq!(v["reason"], reason);
    assert!(v["message"].as_str().is_some_and(|m| m.contains("What happened")));
    if let Some(k) = detail_key {
        assert!(!v["details"][k].is_null(), "details.{k} missing: {v}");
    }
}
