// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{AssociationStore, ReportEntry, compare_entries};
use crate::ipc::ErrorDescriptor;
use serde::{Serialize, Serializer, ser::SerializeStruct};

/// The aggregate result of a harness run.
///
/// The entry lists are in arrival order until the run is finalized, after which each is sorted
/// with [`compare_entries`].
#[derive(Clone, Debug, Default)]
pub struct Stats {
    /// Tests that failed.
    pub failed: Vec<ReportEntry>,

    /// Hooks that failed.
    pub failed_hooks: Vec<ReportEntry>,

    /// Tests that passed.
    pub passed: Vec<ReportEntry>,

    /// Tests that were skipped.
    pub skipped: Vec<ReportEntry>,

    /// Tests marked as todo.
    pub todo: Vec<ReportEntry>,

    /// Errors from shared workers, in arrival order.
    pub shared_worker_errors: Vec<ErrorDescriptor>,

    /// Exceptions that escaped test files, in arrival order.
    pub uncaught_exceptions: Vec<ErrorDescriptor>,

    associations: AssociationStore,
}

impl Stats {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the error recorded for a failed test or hook.
    pub fn get_error(&self, entry: &ReportEntry) -> Option<&ErrorDescriptor> {
        self.associations.get_error(entry)
    }

    /// Returns the logs recorded for a passed or failed test.
    pub fn get_logs(&self, entry: &ReportEntry) -> Option<&[String]> {
        self.associations.get_logs(entry)
    }

    pub(crate) fn associations_mut(&mut self) -> &mut AssociationStore {
        &mut self.associations
    }

    /// Sorts every entry list by file, then title.
    ///
    /// The sort is stable, and sorting an already sorted report changes nothing.
    pub fn sort(&mut self) {
        for entries in [
            &mut self.failed,
            &mut self.failed_hooks,
            &mut self.passed,
            &mut self.skipped,
            &mut self.todo,
        ] {
            entries.sort_by(compare_entries);
        }
    }

    /// Returns true if any test or hook failed, or any run-level error was recorded.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
            || !self.failed_hooks.is_empty()
            || !self.shared_worker_errors.is_empty()
            || !self.uncaught_exceptions.is_empty()
    }

    /// Returns the number of entries and errors in each category.
    pub fn counts(&self) -> StatsCounts {
        StatsCounts {
            passed: self.passed.len(),
            failed: self.failed.len(),
            failed_hooks: self.failed_hooks.len(),
            skipped: self.skipped.len(),
            todo: self.todo.len(),
            shared_worker_errors: self.shared_worker_errors.len(),
            uncaught_exceptions: self.uncaught_exceptions.len(),
        }
    }

    fn entry_views<'a>(&'a self, entries: &'a [ReportEntry]) -> Vec<EntryView<'a>> {
        entries
            .iter()
            .map(|entry| EntryView {
                title: entry.title(),
                file: entry.file(),
                error: self.get_error(entry),
                logs: self.get_logs(entry),
            })
            .collect()
    }
}

/// The size of each category in a [`Stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsCounts {
    /// Tests that passed.
    pub passed: usize,
    /// Tests that failed.
    pub failed: usize,
    /// Hooks that failed.
    pub failed_hooks: usize,
    /// Tests that were skipped.
    pub skipped: usize,
    /// Tests marked as todo.
    pub todo: usize,
    /// Shared worker errors.
    pub shared_worker_errors: usize,
    /// Uncaught exceptions.
    pub uncaught_exceptions: usize,
}

// Entries are serialized with their associated error and logs inlined.
impl Serialize for Stats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Stats", 7)?;
        state.serialize_field("failed", &self.entry_views(&self.failed))?;
        state.serialize_field("failedHooks", &self.entry_views(&self.failed_hooks))?;
        state.serialize_field("passed", &self.entry_views(&self.passed))?;
        state.serialize_field("sharedWorkerErrors", &self.shared_worker_errors)?;
        state.serialize_field("skipped", &self.entry_views(&self.skipped))?;
        state.serialize_field("todo", &self.entry_views(&self.todo))?;
        state.serialize_field("uncaughtExceptions", &self.uncaught_exceptions)?;
        state.end()
    }
}

#[derive(Serialize)]
struct EntryView<'a> {
    title: &'a str,
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<&'a [String]>,
}
