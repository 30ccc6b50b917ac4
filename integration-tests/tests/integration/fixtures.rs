// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use serde_json::{Value, json};
use status_harness::{config::HarnessConfig, launch::Launcher};

pub(crate) const FAKE_RUNNER: &str = env!("CARGO_BIN_EXE_fake-runner");

/// A temporary fixtures directory with a script for the fake runner.
pub(crate) struct TempFixture {
    dir: Utf8TempDir,
}

impl TempFixture {
    pub(crate) fn new() -> Self {
        let dir = camino_tempfile::Builder::new()
            .prefix("status-harness-")
            .tempdir()
            .expect("created temp dir");
        Self { dir }
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        self.dir.path()
    }

    /// Returns the absolute path of a test file in the fixture, as a runner would report it.
    pub(crate) fn test_file(&self, name: &str) -> Utf8PathBuf {
        self.root().join(name)
    }

    /// Writes `script` and returns the arguments that play it back.
    pub(crate) fn script(&self, script: Value) -> Vec<String> {
        let path = self.root().join("script.json");
        std::fs::write(&path, serde_json::to_vec(&script).expect("serialized script"))
            .expect("wrote script");
        vec![path.into_string()]
    }

    pub(crate) fn config(&self) -> HarnessConfig {
        HarnessConfig::new(FAKE_RUNNER, self.root()).with_forward_diagnostics(false)
    }

    pub(crate) fn launcher(&self) -> Launcher {
        Launcher::new(self.config())
    }
}

pub(crate) fn selected(title: &str, file: &Utf8Path, skip: bool, todo: bool) -> Value {
    json!({
        "emit": {
            "type": "selected-test",
            "title": title,
            "testFile": file,
            "skip": skip,
            "todo": todo,
        }
    })
}

pub(crate) fn passed(title: &str, file: &Utf8Path, logs: &[&str]) -> Value {
    json!({
        "emit": {
            "type": "test-passed",
            "title": title,
            "testFile": file,
            "logs": logs,
        }
    })
}

pub(crate) fn failed(title: &str, file: &Utf8Path, err: Value) -> Value {
    json!({
        "emit": {
            "type": "test-failed",
            "title": title,
            "testFile": file,
            "err": err,
            "logs": [],
        }
    })
}

pub(crate) fn titles(entries: &[status_harness::report::ReportEntry]) -> Vec<(&str, &str)> {
    entries
        .iter()
        .map(|entry| (entry.file(), entry.title()))
        .collect()
}
