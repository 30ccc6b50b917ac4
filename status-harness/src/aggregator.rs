// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folds status events into a report.

use crate::{
    helpers::normalize_path,
    ipc::StatusEvent,
    report::{ReportEntry, Stats},
};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

/// Reduces the events of one run into [`Stats`].
///
/// Test files are recorded relative to `root`, which is the working directory of the run.
#[derive(Debug)]
pub struct EventAggregator {
    root: Utf8PathBuf,
    stats: Stats,
}

impl EventAggregator {
    /// Creates an aggregator for a run in `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            stats: Stats::new(),
        }
    }

    /// Returns the report collected so far.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Consumes the aggregator, returning the report.
    pub fn into_stats(self) -> Stats {
        self.stats
    }

    /// Records a single event.
    pub fn observe(&mut self, event: StatusEvent) {
        debug!(kind = event.kind(), "observed status event");
        match event {
            StatusEvent::HookFailed {
                title,
                test_file,
                err,
            } => {
                let entry = self.entry(title, &test_file);
                debug!(title = entry.title(), file = entry.file(), "hook failed");
                self.stats.associations_mut().set_error(&entry, err);
                self.stats.failed_hooks.push(entry);
            }
            StatusEvent::SelectedTest {
                title,
                test_file,
                skip,
                todo,
            } => {
                // A test can be both skipped and todo, and lands in both lists.
                if skip {
                    let entry = self.entry(title.clone(), &test_file);
                    self.stats.skipped.push(entry);
                }
                if todo {
                    let entry = self.entry(title, &test_file);
                    self.stats.todo.push(entry);
                }
            }
            StatusEvent::SharedWorkerError { err } => {
                debug!(message = %err.message, "shared worker error");
                self.stats.shared_worker_errors.push(err.summary());
            }
            StatusEvent::TestPassed {
                title,
                test_file,
                logs,
            } => {
                let entry = self.entry(title, &test_file);
                self.stats.associations_mut().set_logs(&entry, logs);
                self.stats.passed.push(entry);
            }
            StatusEvent::TestFailed {
                title,
                test_file,
                err,
                logs,
            } => {
                let entry = self.entry(title, &test_file);
                debug!(title = entry.title(), file = entry.file(), "test failed");
                let associations = self.stats.associations_mut();
                associations.set_error(&entry, err);
                associations.set_logs(&entry, logs);
                self.stats.failed.push(entry);
            }
            StatusEvent::UncaughtException { err } => {
                debug!(message = %err.message, "uncaught exception");
                self.stats.uncaught_exceptions.push(err.summary());
            }
            StatusEvent::Unknown => {
                debug!("ignoring status event of unknown kind");
            }
        }
    }

    fn entry(&self, title: String, test_file: &Utf8Path) -> ReportEntry {
        ReportEntry::new(title, normalize_path(&self.root, test_file))
    }
}
