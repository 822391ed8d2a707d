// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::expect_used)]
//! Black-box tests for the `echo-physics` binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("echo-physics").expect("binary built");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run_json(args: &[&str]) -> Value {
    let out = cli()
        .arg("run")
        .args(args)
        .args(["--format", "json"])
        .output()
        .expect("run binary");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).expect("stdout is a JSON report")
}

fn component(body: &Value, field: &str, i: usize) -> f64 {
    body[field][i].as_f64().expect("numeric component")
}

#[test]
fn lists_builtin_scenes() {
    cli()
        .arg("scenes")
        .assert()
        .success()
        .stdout(predicate::str::contains("drop").and(predicate::str::contains("rain")));
}

#[test]
fn default_run_prints_a_table() {
    cli()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("scene drop after 120 ticks"))
        .stdout(predicate::str::contains("ground"));
}

#[test]
fn dropped_sphere_lands() {
    let report = run_json(&["drop", "--ticks", "300"]);
    assert_eq!(report["scene"], "drop");
    assert_eq!(report["pairs"], 1);
    let ball = &report["bodies"][1];
    assert_eq!(ball["movable"], true);
    let y = component(ball, "location", 1);
    assert!((y - 0.5).abs() < 0.1, "y {y}");
}

#[test]
fn elastic_spheres_bounce_apart() {
    let report = run_json(&["elastic", "--ticks", "120"]);
    let left = component(&report["bodies"][0], "velocity", 0);
    let right = component(&report["bodies"][1], "velocity", 0);
    // They bounce apart; equal masses keep the momentum at zero.
    assert!(left < -0.9, "left {left}");
    assert!(right > 0.9, "right {right}");
    assert!((left + right).abs() < 1e-9);
}

#[test]
fn runs_a_scene_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{
            "config": {{ "gravity": 0.0 }},
            "bodies": [
                {{ "name": "probe", "shape": "sphere", "radius": 0.5, "mass": 1.0, "velocity": [2.0, 0.0, 0.0] }}
            ]
        }}"#
    )
    .expect("write scene");
    let path = file.path().to_str().expect("utf-8 path");
    let report = run_json(&["--scene", path, "--ticks", "10", "--dt", "0.1"]);
    let probe = &report["bodies"][0];
    assert_eq!(probe["name"], "probe");
    assert!((component(probe, "location", 0) - 2.0).abs() < 1e-9);
    assert_eq!(report["pairs"], 0);
}

#[test]
fn bundled_scene_runs() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scenes/ramp.json");
    let report = run_json(&["--scene", path, "--ticks", "60"]);
    assert_eq!(report["scene"], "ramp");
    assert_eq!(report["bodies"].as_array().map(Vec::len), Some(4));
}

#[test]
fn rejects_bad_input() {
    cli()
        .args(["run", "--dt", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dt must be a positive"));

    cli()
        .args(["run", "--scene", "/definitely/not/here.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read scene"));

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{ "config": {{ "margin": -1 }}, "bodies": [] }}"#).expect("write scene");
    cli()
        .args(["run", "--scene"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid physics config"));
}

#[test]
fn builtin_and_scene_file_conflict() {
    cli()
        .args(["run", "stack", "--scene", "x.json"])
        .assert()
        .failure();
}
