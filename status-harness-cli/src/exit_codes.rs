// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `status-harness` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum HarnessExitCode {}

impl HarnessExitCode {
    /// The runner exited successfully.
    pub const OK: i32 = 0;

    /// The runner exited unsuccessfully, or its status channel was malformed.
    pub const RUN_FAILED: i32 = 100;

    /// A user issue happened while setting up a harness invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing the report to stdout produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
