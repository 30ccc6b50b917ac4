// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{EntryId, ReportEntry};
use crate::ipc::ErrorDescriptor;
use std::collections::HashMap;

/// Errors and logs attached to report entries by identity.
///
/// Two entries with the same title and file are still looked up separately. Setting a value twice
/// for the same entry keeps the last one.
#[derive(Clone, Debug, Default)]
pub struct AssociationStore {
    errors: HashMap<EntryId, ErrorDescriptor>,
    logs: HashMap<EntryId, Vec<String>>,
}

impl AssociationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an error to `entry`.
    pub fn set_error(&mut self, entry: &ReportEntry, error: ErrorDescriptor) {
        self.errors.insert(entry.id(), error);
    }

    /// Returns the error attached to `entry`, if any.
    pub fn get_error(&self, entry: &ReportEntry) -> Option<&ErrorDescriptor> {
        self.errors.get(&entry.id())
    }

    /// Attaches logs to `entry`.
    pub fn set_logs(&mut self, entry: &ReportEntry, logs: Vec<String>) {
        self.logs.insert(entry.id(), logs);
    }

    /// Returns the logs attached to `entry`, if any.
    pub fn get_logs(&self, entry: &ReportEntry) -> Option<&[String]> {
        self.logs.get(&entry.id()).map(Vec::as_slice)
    }
}
