//! Integration tests for the `tantron` CLI binary.
//!
//! Argument parsing, completions and error exit codes run without any
//! network. The household commands run against a wiremock cloud.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `tantron` binary with env isolation.
///
/// Clears all `TANTRON_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn tantron_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tantron");
    cmd.env("HOME", "/tmp/tantron-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/tantron-cli-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("TANTRON_PROFILE")
        .env_remove("TANTRON_HOUSEHOLD")
        .env_remove("TANTRON_PHONE")
        .env_remove("TANTRON_PASSWORD")
        .env_remove("TANTRON_TOKEN")
        .env_remove("TANTRON_BASE_URL")
        .env_remove("TANTRON_OUTPUT")
        .env_remove("TANTRON_TIMEOUT");
    cmd
}

/// A command with token credentials for household `H1`.
fn household_cmd(base_url: &str) -> assert_cmd::Command {
    let mut cmd = tantron_cmd();
    cmd.env("TANTRON_TOKEN", "tok-1")
        .env("TANTRON_BASE_URL", base_url)
        .args(["--household", "H1"]);
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "message": "ok", "data": data }))
}

async fn mock_household() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device-service/normal/gateway"))
        .respond_with(ok(json!({ "id": "G1", "name": "Hall gateway", "onlineState": 1 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/device-service/normal/device/location"))
        .respond_with(ok(json!({
            "floorList": [{ "name": "1F", "areaList": [{ "id": "A1", "name": "Living" }] }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/device-service/normal/device/list"))
        .respond_with(ok(json!({ "list": [
            {
                "id": "D1", "masterId": "M1", "configVersion": 75, "type": "light",
                "name": "Ceiling", "area": "A1",
                "functionList": [{ "type": "switch", "name": "Switch", "sendList": [
                    { "dataType": "1", "dataLength": "1", "addr": "1/1/1", "protocolType": "KNX", "sleep": 0 }
                ] }],
                "functionValues": { "switch": "1" }
            },
            {
                "id": "D2", "masterId": "M1", "configVersion": 75, "type": "curtain",
                "name": "Window", "area": "A1", "functionList": [], "functionValues": null
            }
        ] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/state-service/shadow/device/state/block"))
        .respond_with(ok(json!([])).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;
    server
}

/// Run a prepared command off the async runtime.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = tantron_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    tantron_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("devices")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("weather"))
            .and(predicate::str::contains("diagnostics")),
    );
}

#[test]
fn test_version_flag() {
    tantron_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tantron"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    tantron_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_unknown_shell() {
    tantron_cmd()
        .args(["completions", "cmd-exe"])
        .assert()
        .failure();
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_devices_without_household() {
    tantron_cmd()
        .arg("devices")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No household configured"));
}

#[test]
fn test_devices_without_credentials_is_auth_error() {
    tantron_cmd()
        .args(["devices", "--household", "H1"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No credentials"));
}

#[test]
fn test_unknown_profile_is_reported() {
    tantron_cmd()
        .args(["--profile", "office", "entities"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("office"));
}

#[test]
fn test_send_rejects_malformed_json() {
    household_cmd("http://127.0.0.1:9")
        .args(["send", "{not json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid JSON"));
}

#[test]
fn test_send_requires_cmd_array() {
    household_cmd("http://127.0.0.1:9")
        .args(["send", r#"{"deviceConfigId":"1","configVersion":1,"masterId":"M1"}"#])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cmd"));
}

#[test]
fn test_write_requires_key_value_pairs() {
    let output = household_cmd("http://127.0.0.1:9")
        .args(["write", "M1.D1", "switch"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("key=value"));
}

// ── Against a mock cloud ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_json_lists_registry() {
    let server = mock_household().await;
    let mut cmd = household_cmd(&server.uri());
    cmd.args(["devices", "-o", "json"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let devices: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = devices
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["M1.D1", "M1.D2"]);
    assert_eq!(devices[0]["values"], json!({ "switch": "1" }));
    assert_eq!(devices[1]["values"], Value::Null);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_type_filter_plain() {
    let server = mock_household().await;
    let mut cmd = household_cmd(&server.uri());
    cmd.args(["devices", "--type", "curtain", "-o", "plain"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "M1.D2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_device_shows_gateway() {
    let server = mock_household().await;
    let mut cmd = household_cmd(&server.uri());
    cmd.args(["device", "G1"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("Hall gateway"));
    assert!(text.contains("online"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_device_exit_code() {
    let server = mock_household().await;
    let mut cmd = household_cmd(&server.uri());
    cmd.args(["device", "M1.D9"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_entities_reports_light_state() {
    let server = mock_household().await;
    let mut cmd = household_cmd(&server.uri());
    cmd.args(["entities", "-o", "json"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let entities: Value = serde_json::from_slice(&output.stdout).unwrap();
    let light = entities
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["kind"] == "light")
        .unwrap();
    assert_eq!(light["state"], "on");
    assert_eq!(light["available"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_diagnostics_redacts_household() {
    let server = mock_household().await;
    let mut cmd = household_cmd(&server.uri());
    cmd.args(["diagnostics", "-o", "json"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let dump: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(dump["entry_data"]["household"], "**REDACTED**");
    assert!(dump["devices"]["M1.D1"].is_object());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_relays_payload() {
    let server = MockServer::start().await;
    let payload = json!({
        "deviceConfigId": "37416",
        "configVersion": 75,
        "masterId": "M1",
        "cmd": [{ "type": "activate", "value": "0", "addr": "1/5/255" }]
    });
    Mock::given(method("PUT"))
        .and(path("/device-service/normal/device/state"))
        .and(body_json(payload.clone()))
        .respond_with(ok(Value::Null))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = household_cmd(&server.uri());
    cmd.args(["send", &payload.to_string()]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("sent"));
}
