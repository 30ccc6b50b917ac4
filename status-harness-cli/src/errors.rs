// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{HarnessExitCode, output::NO_HEADING_TARGET};
use status_harness::errors::{ConfigParseError, FixtureError, LaunchError};
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that status-harness knows how to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("harness run failed")]
    RunFailed {
        #[source]
        err: Box<FixtureError>,
    },
    #[error("error writing report")]
    WriteReport {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn run_failed(err: FixtureError) -> Self {
        Self::RunFailed { err: Box::new(err) }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. } => HarnessExitCode::SETUP_ERROR,
            Self::RunFailed { err } => fixture_exit_code(err.error()),
            Self::WriteReport { .. } => HarnessExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self) {
        let mut next_error = match self {
            Self::CurrentDirInvalid { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!("current directory `{}` is not valid UTF-8", path.display());
                None
            }
            Self::ConfigParseError { err } => {
                error!("failed to parse harness config at `{}`", err.config_file());
                err.source()
            }
            Self::RunFailed { err } => {
                error!("{}", err.error());
                err.error().source()
            }
            Self::WriteReport { err } => {
                error!("failed to write report to stdout");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

/// Returns the exit code for a failed harness run.
pub(crate) fn fixture_exit_code(error: &LaunchError) -> i32 {
    match error {
        LaunchError::InvalidOptions(_)
        | LaunchError::ResolveCwd { .. }
        | LaunchError::IpcChannel(_)
        | LaunchError::Spawn { .. }
        | LaunchError::RuntimeCreate(_) => HarnessExitCode::SETUP_ERROR,
        _ => HarnessExitCode::RUN_FAILED,
    }
}

