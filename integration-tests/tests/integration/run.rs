// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::Result;
use pretty_assertions::assert_eq;
use serde_json::json;
use status_harness::{
    errors::{IpcError, LaunchError},
    fixture::{run_fixture, run_fixture_blocking},
    forwarder::is_control_chunk,
    ipc::{EMIT_STATUS_ENV, ErrorDescriptor},
    launch::LaunchOptions,
};

#[tokio::test]
async fn failed_run_carries_report() {
    let fixture = TempFixture::new();
    let test_js = fixture.test_file("test.js");
    let args = fixture.script(json!({
        "steps": [
            selected("foo", &test_js, true, false),
            passed("bar", &test_js, &["hello"]),
            failed("baz", &test_js, json!({
                "message": "expected 1 to be 2",
                "name": "AssertionError",
                "stack": "at baz (test.js:3:5)",
                "actual": 1,
            })),
        ],
        "exitCode": 1,
    }));

    let error = run_fixture(&fixture.launcher(), &args, &LaunchOptions::new())
        .await
        .expect_err("runner exited with 1");

    match error.error() {
        LaunchError::ProcessFailed { exit_status, .. } => {
            assert_eq!(exit_status.code(), Some(1));
        }
        other => panic!("expected ProcessFailed, found {other:?}"),
    }

    let stats = error.stats();
    assert_eq!(titles(&stats.skipped), [("test.js", "foo")]);
    assert_eq!(titles(&stats.passed), [("test.js", "bar")]);
    assert_eq!(titles(&stats.failed), [("test.js", "baz")]);
    assert!(stats.failed_hooks.is_empty());
    assert!(stats.todo.is_empty());

    let mut expected = ErrorDescriptor::new("expected 1 to be 2", "AssertionError")
        .with_stack("at baz (test.js:3:5)");
    expected.details.insert("actual".to_owned(), json!(1));
    assert_eq!(stats.get_error(&stats.failed[0]), Some(&expected));
    assert_eq!(
        stats.get_logs(&stats.passed[0]),
        Some(["hello".to_owned()].as_slice())
    );
    assert!(stats.has_failures());
}

#[tokio::test]
async fn nonzero_exit_after_passes_keeps_them() {
    let fixture = TempFixture::new();
    let test_js = fixture.test_file("test.js");
    let args = fixture.script(json!({
        "steps": [
            passed("first", &test_js, &[]),
            passed("second", &test_js, &[]),
        ],
        "exitCode": 2,
    }));

    let error = run_fixture(&fixture.launcher(), &args, &LaunchOptions::new())
        .await
        .expect_err("runner exited with 2");

    assert_eq!(error.exit_status().and_then(|status| status.code()), Some(2));
    let (error, stats, stderr) = error.into_parts();
    assert!(
        matches!(error, LaunchError::ProcessFailed { .. }),
        "{error:?}"
    );
    assert_eq!(
        titles(&stats.passed),
        [("test.js", "first"), ("test.js", "second")]
    );
    assert!(stats.failed.is_empty());
    assert!(stderr.is_empty(), "{stderr:?}");
}

#[test]
fn successful_run_is_sorted() {
    let fixture = TempFixture::new();
    let a_js = fixture.test_file("a.js");
    let b_js = fixture.test_file("nested/b.js");
    let args = fixture.script(json!({
        "steps": [
            passed("z", &b_js, &[]),
            passed("y", &a_js, &[]),
            selected("todo later", &a_js, false, true),
            passed("x", &a_js, &[]),
            { "stdout": "runner finished\n" },
        ],
    }));

    let report = run_fixture_blocking(&fixture.launcher(), &args, &LaunchOptions::new())
        .expect("runner exited with 0");

    assert!(report.output.exit_status.success());
    assert_eq!(report.output.stdout, "runner finished\n");
    assert_eq!(
        titles(&report.stats.passed),
        [("a.js", "x"), ("a.js", "y"), ("nested/b.js", "z")]
    );
    assert_eq!(titles(&report.stats.todo), [("a.js", "todo later")]);
    assert!(!report.stats.has_failures());
}

#[tokio::test]
async fn unknown_and_worker_events() {
    let fixture = TempFixture::new();
    let test_js = fixture.test_file("test.js");
    let args = fixture.script(json!({
        "steps": [
            { "emit": { "type": "worker-started", "id": 3 } },
            { "emit": {
                "type": "shared-worker-error",
                "err": { "message": "worker crashed", "name": "Error", "stack": "at worker.js" },
            } },
            { "emit": {
                "type": "uncaught-exception",
                "err": { "message": "boom", "name": "TypeError" },
            } },
            { "emit": {
                "type": "hook-failed",
                "title": "before all",
                "testFile": test_js,
                "err": { "message": "setup failed", "name": "Error" },
            } },
            passed("ok", &test_js, &[]),
        ],
    }));

    let report = run_fixture(&fixture.launcher(), &args, &LaunchOptions::new())
        .await
        .expect("unknown events are ignored");

    let stats = report.stats;
    assert_eq!(titles(&stats.passed), [("test.js", "ok")]);
    assert_eq!(titles(&stats.failed_hooks), [("test.js", "before all")]);
    assert_eq!(
        stats.get_error(&stats.failed_hooks[0]).map(|err| err.message.as_str()),
        Some("setup failed")
    );
    assert_eq!(
        stats.shared_worker_errors,
        [ErrorDescriptor::new("worker crashed", "Error").with_stack("at worker.js")]
    );
    assert_eq!(
        stats.uncaught_exceptions,
        [ErrorDescriptor::new("boom", "TypeError")]
    );
}

#[tokio::test]
async fn malformed_message_fails_run() {
    let fixture = TempFixture::new();
    let test_js = fixture.test_file("test.js");
    let args = fixture.script(json!({
        "steps": [
            passed("before", &test_js, &[]),
            { "emit": { "type": "test-passed", "title": "no file" } },
            passed("after", &test_js, &[]),
        ],
    }));

    let error = run_fixture(&fixture.launcher(), &args, &LaunchOptions::new())
        .await
        .expect_err("malformed message");

    match error.error() {
        LaunchError::Ipc {
            err: IpcError::InvalidMessage { kind, .. },
            ..
        } => assert_eq!(kind, "test-passed"),
        other => panic!("expected an IPC error, found {other:?}"),
    }
    assert_eq!(titles(&error.stats().passed), [("test.js", "before")]);
}

#[tokio::test]
async fn process_failure_wins_over_malformed_message() {
    let fixture = TempFixture::new();
    let args = fixture.script(json!({
        "steps": [{ "emit": { "title": "untyped" } }],
        "exitCode": 3,
    }));

    let error = run_fixture(&fixture.launcher(), &args, &LaunchOptions::new())
        .await
        .expect_err("runner exited with 3");

    assert!(
        matches!(error.error(), LaunchError::ProcessFailed { .. }),
        "{:?}",
        error.error()
    );
    assert_eq!(error.exit_status().and_then(|status| status.code()), Some(3));
}

#[tokio::test]
async fn diagnostics_are_captured() {
    let fixture = TempFixture::new();
    let args = fixture.script(json!({
        "steps": [
            { "control": "harness-internal\n" },
            { "stderr": "visible diagnostics\n" },
        ],
    }));

    let report = run_fixture(&fixture.launcher(), &args, &LaunchOptions::new())
        .await
        .expect("runner exited with 0");

    let stderr = String::from_utf8_lossy(&report.output.stderr);
    assert!(stderr.contains("\u{1f917}harness-internal\n"), "{stderr}");
    assert!(stderr.contains("visible diagnostics\n"), "{stderr}");
    assert!(is_control_chunk(&report.output.stderr));
}

#[tokio::test]
async fn cwd_and_env_overrides() -> Result<()> {
    let fixture = TempFixture::new();
    let nested = fixture.root().join("nested");
    std::fs::create_dir(&nested)?;
    let args = fixture.script(json!({
        "steps": [
            "printCwd",
            { "printEnv": "STATUS_HARNESS_TEST_VAR" },
            passed("relative", &nested.join("test.js"), &[]),
            passed("outside", &fixture.test_file("other.js"), &[]),
        ],
    }));

    let mut options = LaunchOptions::new();
    options.cwd(&nested).env("STATUS_HARNESS_TEST_VAR", "set");
    let report = run_fixture(&fixture.launcher(), &args, &options).await?;

    let stdout = String::from_utf8_lossy(&report.output.stdout);
    let mut lines = stdout.lines();
    let cwd = lines.next().expect("cwd printed");
    assert_eq!(
        std::fs::canonicalize(cwd)?,
        std::fs::canonicalize(&nested)?
    );
    assert_eq!(lines.next(), Some("STATUS_HARNESS_TEST_VAR=set"));

    // Test files are reported relative to the run's working directory.
    assert_eq!(
        titles(&report.stats.passed),
        [("../other.js", "outside"), ("test.js", "relative")]
    );
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn env_is_not_inherited_when_disabled() {
    let fixture = TempFixture::new();
    let args = fixture.script(json!({
        "steps": [{ "printEnv": "PATH" }],
    }));

    let mut options = LaunchOptions::new();
    options.inherit_env(false);
    let report = run_fixture(&fixture.launcher(), &args, &options)
        .await
        .expect("runner exited with 0");

    assert_eq!(report.output.stdout, "PATH\n");
}

#[tokio::test]
async fn handshake_mismatch_fails_runner() {
    let fixture = TempFixture::new();
    let test_js = fixture.test_file("test.js");
    let args = fixture.script(json!({
        "steps": [passed("never sent", &test_js, &[])],
    }));

    let mut options = LaunchOptions::new();
    options.env(EMIT_STATUS_ENV, "not the handshake");
    let error = run_fixture(&fixture.launcher(), &args, &options)
        .await
        .expect_err("runner rejects the handshake");

    assert!(
        matches!(error.error(), LaunchError::ProcessFailed { .. }),
        "{:?}",
        error.error()
    );
    assert!(error.stats().passed.is_empty());
    let stderr = String::from_utf8_lossy(error.stderr());
    assert!(stderr.contains("status channel"), "{stderr}");
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let fixture = TempFixture::new();
    let launcher = status_harness::launch::Launcher::new(
        fixture
            .config()
            .with_program(fixture.root().join("does-not-exist").into_string()),
    );

    let error = run_fixture(&launcher, &[], &LaunchOptions::new())
        .await
        .expect_err("program does not exist");

    assert!(
        matches!(error.error(), LaunchError::Spawn { .. }),
        "{:?}",
        error.error()
    );
    assert_eq!(error.stats().counts().passed, 0);
}
