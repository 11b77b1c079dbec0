//! Integration tests for the `devsync` CLI binary.
//!
//! Argument parsing, help output, completions, and error exit codes run
//! without a device; the read/write paths run against a wiremock device.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `devsync` binary with env isolation.
///
/// Clears all `DEVSYNC_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn devsync_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("devsync");
    cmd.env("HOME", "/tmp/devsync-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/devsync-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("DEVSYNC_CONFIG")
        .env_remove("DEVSYNC_DEVICE")
        .env_remove("DEVSYNC_ADDRESS")
        .env_remove("DEVSYNC_PIN")
        .env_remove("DEVSYNC_TIMEOUT")
        .env_remove("DEVSYNC_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stove_state(power: bool) -> Value {
    json!({
        "prg": power,
        "eco_mode": false,
        "is_temp": "21.5",
        "sp_temp": 22.0,
        "mode": "heating",
        "cleaning_in": "7200"
    })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = devsync_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    devsync_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("get")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("set"))
            .and(predicate::str::contains("channels")),
    );
}

#[test]
fn test_version_flag() {
    devsync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_completions_bash() {
    devsync_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("devsync"));
}

#[test]
fn test_invalid_output_format_is_usage_error() {
    devsync_cmd()
        .args(["--output", "yaml", "channels"])
        .assert()
        .code(2);
}

// ── Offline commands ────────────────────────────────────────────────

#[test]
fn test_channels_lists_builtin_catalog() {
    devsync_cmd()
        .args(["channels", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("power")
                .and(predicate::str::contains("spTemp"))
                .and(predicate::str::contains("cleaningIn")),
        );
}

#[test]
fn test_config_path_honors_flag() {
    devsync_cmd()
        .args(["--config", "/tmp/devsync-test/config.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/devsync-test/config.toml"));
}

#[test]
fn test_config_show_redacts_pin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[devices.default]\naddress = \"192.168.1.50\"\npin = \"4321\"\n",
    )
    .unwrap();

    devsync_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("192.168.1.50")
                .and(predicate::str::contains("4321").not()),
        );
}

// ── Error exit codes ────────────────────────────────────────────────

#[test]
fn test_get_without_device_is_config_error() {
    let output = devsync_cmd().arg("get").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("No device configured"));
}

#[test]
fn test_invalid_settings_are_reported_together() {
    let output = devsync_cmd()
        .args(["--address", "bad host!", "--pin", "12", "--interval", "0", "get"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("address"), "{text}");
    assert!(text.contains("digits"), "{text}");
    assert!(text.contains("interval"), "{text}");
}

#[test]
fn test_unknown_profile_is_config_error() {
    devsync_cmd()
        .args(["--device", "garage", "get"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("garage"));
}

#[test]
fn test_set_type_mismatch_is_caught_before_connecting() {
    devsync_cmd()
        .args(["--address", "127.0.0.1:9", "--pin", "1234", "set", "power", "warm"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expects on/off"));
}

#[test]
fn test_set_read_only_channel() {
    devsync_cmd()
        .args(["--address", "127.0.0.1:9", "--pin", "1234", "set", "isTemp", "30"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("read-only"));
}

#[test]
fn test_unreachable_device_is_connection_error() {
    devsync_cmd()
        .args([
            "--address",
            "127.0.0.1:9",
            "--pin",
            "1234",
            "--timeout",
            "2",
            "get",
        ])
        .assert()
        .code(7);
}

// ── Against a mock device ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_get_reads_channels_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status.cgi"))
        .and(header("X-HS-PIN", "1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stove_state(true)))
        .mount(&server)
        .await;

    let output = devsync_cmd()
        .args(["--address", &server.address().to_string(), "--pin", "1234"])
        .args(["-o", "json", "get", "power", "cleaningIn"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let readings: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(readings[0]["channel"], "power");
    assert_eq!(readings[0]["state"], json!({ "type": "on_off", "value": true }));
    assert_eq!(readings[1]["state"], json!({ "type": "text", "value": "120.00" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_power_posts_and_reports_refreshed_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stove_state(false)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stove_state(true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/status.cgi"))
        .and(body_json(json!({ "prg": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    devsync_cmd()
        .args(["--address", &server.address().to_string(), "--pin", "1234"])
        .args(["-o", "plain", "set", "power", "on"])
        .assert()
        .success()
        .stdout(predicate::str::diff("ON\n"));
}
