// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Drives a test runner in a child process and reduces the status events it emits over an IPC
//! channel into a deterministic report.
//!
//! The basic flow of a run:
//!
//! 1. [`launch::Launcher`] spawns the runner with the harness's fixed settings merged with
//!    per-call [`launch::LaunchOptions`], and hands back the runner's status channel, its stderr
//!    and a completion future.
//! 2. [`aggregator::EventAggregator`] folds every [`ipc::StatusEvent`] into [`report::Stats`].
//! 3. [`forwarder::DiagnosticForwarder`] drains the runner's stderr in its own task, forwarding
//!    it when asked to.
//! 4. Once the runner exits, [`fixture::run_fixture`] sorts the report and returns it, or returns
//!    the failure with the partial report attached.
//!
//! The runner side of the protocol lives in [`ipc::StatusEmitter`].

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod fixture;
pub mod forwarder;
pub mod helpers;
pub mod ipc;
pub mod launch;
mod output;
pub mod report;
