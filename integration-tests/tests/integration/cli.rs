// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use status_harness_cli::HarnessExitCode;
use std::process::{Command, Output};
use test_case::test_case;

const STATUS_HARNESS_BIN: &str = env!("CARGO_BIN_EXE_status-harness-dup");

fn run_cli(fixture: &TempFixture, extra: &[&str], script_args: &[String]) -> Output {
    cli_command(fixture, extra, script_args)
        .output()
        .expect("status-harness ran")
}

fn cli_command(fixture: &TempFixture, extra: &[&str], script_args: &[String]) -> Command {
    let mut cmd = Command::new(STATUS_HARNESS_BIN);
    cmd.args(["--color", "never", "run", "--workspace-root"])
        .arg(fixture.root())
        .args(extra)
        .arg("--")
        .args(script_args)
        .env_remove("STATUS_HARNESS_VERBOSE")
        .env_remove("STATUS_HARNESS_DEBUG")
        .env_remove("STATUS_HARNESS_LOG");
    cmd
}

#[test]
fn json_report_for_failed_run() {
    let fixture = TempFixture::new();
    let test_js = fixture.test_file("test.js");
    let args = fixture.script(json!({
        "steps": [
            passed("bar", &test_js, &[]),
            failed("baz", &test_js, json!({ "message": "nope", "name": "AssertionError" })),
        ],
        "exitCode": 1,
    }));

    let output = run_cli(
        &fixture,
        &[
            "--program",
            FAKE_RUNNER,
            "--cwd",
            fixture.root().as_str(),
            "--message-format",
            "json",
        ],
        &args,
    );

    assert_eq!(output.status.code(), Some(HarnessExitCode::RUN_FAILED));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["exitCode"], json!(1));
    assert_eq!(report["passed"][0]["title"], json!("bar"));
    assert_eq!(report["failed"][0]["file"], json!("test.js"));
    assert_eq!(report["failed"][0]["error"]["message"], json!("nope"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exited with exit code 1"), "{stderr}");
}

#[test]
fn human_report_from_workspace_config() {
    let fixture = TempFixture::new();
    let config_dir = fixture.root().join(".config");
    std::fs::create_dir(&config_dir).expect("created config dir");
    std::fs::write(
        config_dir.join("status-harness.toml"),
        format!("[runner]\nprogram = '{FAKE_RUNNER}'\n\n[fixtures]\ndir = '.'\n"),
    )
    .expect("wrote config");

    let test_js = fixture.test_file("test.js");
    let args = fixture.script(json!({
        "steps": [
            selected("later", &test_js, true, false),
            passed("ok", &test_js, &[]),
        ],
    }));

    let output = run_cli(&fixture, &[], &args);

    assert_eq!(
        output.status.code(),
        Some(HarnessExitCode::OK),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "1 passed, 0 failed, 0 failed hooks, 1 skipped, 0 todo\n\
         \x20    PASS [test.js] ok\n\
         \x20    SKIP [test.js] later\n"
    );
}

fn diagnostics_script(fixture: &TempFixture) -> Vec<String> {
    fixture.script(json!({
        "steps": [
            { "control": "harness-internal\n" },
            { "sleepMs": 200 },
            { "stderr": "visible diagnostics\n" },
        ],
    }))
}

#[test_case(&["--forward-diagnostics"], None, true; "flag")]
#[test_case(&[], Some("1"), true; "debug env")]
#[test_case(&[], Some(""), false; "empty debug env")]
#[test_case(&[], None, false; "default")]
fn diagnostics_forwarding(extra: &[&str], debug_env: Option<&str>, forwarded: bool) {
    let fixture = TempFixture::new();
    let args = diagnostics_script(&fixture);

    let mut cli_args = vec!["--program", FAKE_RUNNER, "--cwd", fixture.root().as_str()];
    cli_args.extend_from_slice(extra);
    let mut cmd = cli_command(&fixture, &cli_args, &args);
    if let Some(value) = debug_env {
        cmd.env("STATUS_HARNESS_DEBUG", value);
    }
    let output = cmd.output().expect("status-harness ran");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(HarnessExitCode::OK), "{stderr}");
    assert_eq!(stderr.contains("visible diagnostics"), forwarded, "{stderr}");
    assert!(!stderr.contains("harness-internal"), "{stderr}");
}

#[test]
fn missing_program_is_a_setup_error() {
    let fixture = TempFixture::new();
    let missing = fixture.root().join("does-not-exist");

    let output = run_cli(
        &fixture,
        &["--program", missing.as_str(), "--cwd", fixture.root().as_str()],
        &[],
    );

    assert_eq!(output.status.code(), Some(HarnessExitCode::SETUP_ERROR));
    assert!(output.stdout.is_empty(), "no report for setup errors");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error spawning"), "{stderr}");
}

#[test]
fn invalid_config_is_a_setup_error() {
    let fixture = TempFixture::new();
    let config = fixture.root().join("bad.toml");
    std::fs::write(&config, "[diagnostics]\nforward = \"sometimes\"\n").expect("wrote config");

    let output = run_cli(&fixture, &["--config", config.as_str()], &[]);

    assert_eq!(output.status.code(), Some(HarnessExitCode::SETUP_ERROR));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse harness config"), "{stderr}");
}
