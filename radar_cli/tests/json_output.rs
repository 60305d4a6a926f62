use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::net::TcpListener;
use std::process::Command;
use tempfile::tempdir;

fn config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        "[pins]\ntrigger = 23\necho = 24\nservo = 18\n[sweep]\nsettle_ms = 0\n",
    )
    .unwrap();
    path
}

fn last_json_line(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON on stdout: {text}"));
    serde_json::from_str(line).unwrap()
}

#[rstest]
fn accept_timeout_error_schema() {
    let dir = tempdir().unwrap();
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let out = Command::cargo_bin("radar")
        .unwrap()
        .env_remove("RADAR_TCP_PORT")
        .env("RADAR_REQUIRE_PASSWORD", "false")
        .arg("--json")
        .arg("--config")
        .arg(config(&dir))
        .args(["run", "--port", &port.to_string(), "--accept-timeout-ms", "80"])
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(3));
    let v = last_json_line(&out.stdout);
    assert_eq!(v["reason"], "AcceptTimeout");
    assert_eq!(v["details"]["timeout_ms"], 80);
    assert!(v["message"].as_str().unwrap().contains("What happened"));
}

#[rstest]
fn self_check_success_schema() {
    let dir = tempdir().unwrap();
    let out = Command::cargo_bin("radar")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(config(&dir))
        .arg("self-check")
        .output()
        .unwrap();

    assert!(out.status.success());
    let v = last_json_line(&out.stdout);
    assert_eq!(v["ok"], true);
    assert_eq!(v["angle"], 90);
    assert!(v["distance_cm"].is_null());
}
