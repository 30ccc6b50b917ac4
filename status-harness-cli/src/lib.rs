// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line front end for status-harness.
//!
//! `status-harness run` launches the configured test runner, collects the status events it emits
//! and prints the finalized report, either for humans or as JSON.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod exit_codes;
mod output;
mod reporter;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use exit_codes::HarnessExitCode;
