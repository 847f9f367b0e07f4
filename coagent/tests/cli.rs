//! CLI tests for `coagent validate` and `coagent replay`.
//!
//! Spawns the binary against event logs written to a temp directory.

use std::fs;
use std::process::Command;

use coagent::exit_codes;
use coagent::io::config::{CoagentConfig, CoagentPaths, load_config};

const FLOW: &str = concat!(
    r#"{"type":"TEXT_MESSAGE","role":"user","content":"a haiku about rain"}"#,
    "\n",
    r#"{"type":"STATE_SNAPSHOT","agentName":"AG_UI","nodeName":"start_flow","snapshot":{}}"#,
    "\n",
    r#"{"type":"STATE_SNAPSHOT","agentName":"AG_UI","nodeName":"search_node","snapshot":{"searchProgress":[{"topic":"rain","completed":false}]}}"#,
    "\n",
    r#"{"type":"ACTION","id":"call-1","name":"verify_haiku","status":"executing","arguments":{"japanese":["雨"],"english":["rain"]},"requiresResponse":true}"#,
    "\n",
);

#[test]
fn validate_accepts_well_formed_log() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("events.jsonl");
    fs::write(&path, FLOW).expect("write");

    let status = Command::new(env!("CARGO_BIN_EXE_coagent"))
        .current_dir(temp.path())
        .arg("validate")
        .arg(&path)
        .status()
        .expect("coagent validate");

    assert_eq!(status.code(), Some(exit_codes::OK));
}

#[test]
fn validate_rejects_bad_status() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("events.jsonl");
    fs::write(
        &path,
        r#"{"type":"ACTION","id":"x","name":"render_haiku","status":"paused"}"#,
    )
    .expect("write");

    let output = Command::new(env!("CARGO_BIN_EXE_coagent"))
        .current_dir(temp.path())
        .arg("validate")
        .arg(&path)
        .output()
        .expect("coagent validate");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 1:"), "stderr: {stderr}");
}

#[test]
fn replay_prints_views_then_page() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("events.jsonl");
    fs::write(&path, FLOW).expect("write");

    let output = Command::new(env!("CARGO_BIN_EXE_coagent"))
        .current_dir(temp.path())
        .args(["replay", "events.jsonl", "--policy", "manual"])
        .output()
        .expect("coagent replay");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 5, "stdout: {stdout}");
    assert!(lines[2].contains(r#""kind":"search_progress""#));
    assert!(lines[3].contains(r#""kind":"confirmation_prompt""#));
    let page: serde_json::Value = serde_json::from_str(lines[4]).expect("page json");
    assert_eq!(page["page"]["welcome"], false);
    assert_eq!(page["page"]["prompts"][0]["controls_enabled"], true);
}

#[test]
fn replay_fails_on_undecodable_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("events.jsonl");
    fs::write(&path, "{\"type\":\"NOPE\"}\n").expect("write");

    let output = Command::new(env!("CARGO_BIN_EXE_coagent"))
        .current_dir(temp.path())
        .args(["replay", "events.jsonl"])
        .output()
        .expect("coagent replay");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("events.jsonl:1"));
}

#[test]
fn init_writes_default_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = Command::new(env!("CARGO_BIN_EXE_coagent"))
        .current_dir(temp.path())
        .arg("init")
        .status()
        .expect("coagent init");

    assert_eq!(status.code(), Some(exit_codes::OK));
    let paths = CoagentPaths::new(temp.path());
    let cfg = load_config(&paths.config_path).expect("load");
    assert_eq!(cfg.actions, CoagentConfig::default().actions);
}
