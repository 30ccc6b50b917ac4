// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report produced by a harness run.
//!
//! [`Stats`] holds categorized [`ReportEntry`] lists. Errors and logs are not stored on the
//! entries themselves: they live in an [`AssociationStore`] keyed on entry identity and are looked
//! up with [`Stats::get_error`] and [`Stats::get_logs`].

mod associations;
mod entry;
mod stats;

pub use associations::*;
pub use entry::*;
pub use stats::*;
