// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests
//!
//! These run the harness against `fake-runner`, a helper binary that plays back a JSON script of
//! status messages and output over the real status channel.
//!
//! The CLI is exercised through `status-harness-dup`, a copy of status-harness's main.rs that
//! Cargo builds as part of this package.

mod cli;
mod fixtures;
mod run;
