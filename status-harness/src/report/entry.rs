// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Serialize;
use std::{
    cmp::Ordering,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(0);

/// The identity of a [`ReportEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    fn next() -> Self {
        Self(NEXT_ENTRY_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// A test recorded in a report: its title and its normalized file path.
///
/// Every entry created with [`ReportEntry::new`] has its own identity, even if another entry has
/// the same title and file. Clones share the identity of the entry they were cloned from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ReportEntry {
    #[serde(skip)]
    id: EntryId,
    title: String,
    file: String,
}

impl ReportEntry {
    /// Creates a new entry with a fresh identity.
    pub fn new(title: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            id: EntryId::next(),
            title: title.into(),
            file: file.into(),
        }
    }

    /// Returns this entry's identity.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Returns the test title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the test file, relative to the run's working directory.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Returns true if `other` names the same test, whatever its identity.
    pub fn same_test(&self, other: &ReportEntry) -> bool {
        self.title == other.title && self.file == other.file
    }
}

/// Orders entries by file, then by title.
///
/// Entries with equal file and title compare equal, so sorting with this is a total order and a
/// stable sort keeps such entries in arrival order.
pub fn compare_entries(a: &ReportEntry, b: &ReportEntry) -> Ordering {
    a.file.cmp(&b.file).then_with(|| a.title.cmp(&b.title))
}
