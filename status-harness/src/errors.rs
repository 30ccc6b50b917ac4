// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by status-harness.

use crate::{helpers::display_exited_with, report::Stats};
use bytes::Bytes;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{io, process::ExitStatus};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse harness config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// Error returned while parsing a [`SerializationMode`](crate::ipc::SerializationMode) from a
/// string.
#[derive(Clone, Debug, Error)]
#[error("unrecognized IPC serialization mode: {input}\n(known values: advanced, json)")]
pub struct SerializationModeParseError {
    input: String,
}

impl SerializationModeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while reading status messages from the IPC channel.
///
/// Any of these means the channel can no longer be trusted, and fails the run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IpcError {
    /// Reading from the channel failed.
    #[error("error reading from status channel")]
    Read(#[source] io::Error),

    /// A message exceeded the maximum frame size.
    #[error("status message of {size} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge {
        /// The size of the message.
        size: usize,

        /// The maximum size allowed.
        max: usize,
    },

    /// A length-prefixed frame declared a length of zero.
    #[error("received a zero-length status frame")]
    EmptyFrame,

    /// The channel closed in the middle of a frame.
    #[error("status channel closed with {remaining} bytes of an incomplete frame")]
    TruncatedFrame {
        /// The number of bytes left over.
        remaining: usize,
    },

    /// A message was not valid JSON.
    #[error("status message is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),

    /// A message had no string `type` field.
    #[error("status message has no `type` field")]
    MissingType,

    /// A message of a known kind was missing fields or had fields of the wrong type.
    #[error("invalid `{kind}` status message")]
    InvalidMessage {
        /// The kind of message.
        kind: String,

        /// The underlying error.
        #[source]
        err: serde_json::Error,
    },
}

/// An error that occurred while launching the runner or waiting for it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LaunchError {
    /// Merging per-launch options over the defaults failed.
    #[error("invalid launch options")]
    InvalidOptions(#[source] serde_json::Error),

    /// The working directory could not be resolved to an absolute path.
    #[error("error resolving working directory `{cwd}`")]
    ResolveCwd {
        /// The working directory as configured.
        cwd: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// Creating the IPC channel failed.
    #[error("error creating status channel")]
    IpcChannel(#[source] io::Error),

    /// The runner could not be started.
    #[error("error spawning `{command}`")]
    Spawn {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// Reading the runner's standard output failed.
    #[error("error reading standard output of `{command}`")]
    ReadStdout {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// Reading the runner's diagnostic output failed.
    #[error("error reading diagnostic output of `{command}`")]
    ReadDiagnostics {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// Waiting for the runner to exit failed.
    #[error("error waiting for `{command}` to exit")]
    Wait {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The runner exited unsuccessfully.
    #[error("`{command}` {}", display_exited_with(.exit_status))]
    ProcessFailed {
        /// The command line.
        command: String,

        /// The exit status of the runner.
        exit_status: ExitStatus,

        /// Everything the runner wrote to standard output.
        stdout: Bytes,
    },

    /// The status channel carried a malformed message.
    #[error("status channel of `{command}` is malformed")]
    Ipc {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        err: IpcError,
    },

    /// Creating the async runtime failed.
    #[error("error creating Tokio runtime")]
    RuntimeCreate(#[source] io::Error),
}

impl LaunchError {
    /// Returns the runner's exit status, if it exited unsuccessfully.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            Self::ProcessFailed { exit_status, .. } => Some(*exit_status),
            _ => None,
        }
    }
}

/// A failed harness run, together with everything collected before it failed.
#[derive(Debug, Error)]
#[error("test run failed")]
pub struct FixtureError {
    #[source]
    error: LaunchError,
    stats: Box<Stats>,
    stderr: Bytes,
}

impl FixtureError {
    pub(crate) fn new(error: LaunchError, stats: Stats, stderr: Bytes) -> Self {
        Self {
            error,
            stats: Box::new(stats),
            stderr,
        }
    }

    /// Returns the underlying error.
    pub fn error(&self) -> &LaunchError {
        &self.error
    }

    /// Returns the report, sorted, as collected up to the failure.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Returns everything the runner wrote to its diagnostic stream.
    pub fn stderr(&self) -> &Bytes {
        &self.stderr
    }

    /// Returns the runner's exit status, if it exited unsuccessfully.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.error.exit_status()
    }

    /// Splits this error into its parts.
    pub fn into_parts(self) -> (LaunchError, Stats, Bytes) {
        (self.error, *self.stats, self.stderr)
    }
}

/// An error that occurred while emitting status from the runner side of the channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmitError {
    /// The handshake variable was set, but to the wrong value.
    #[error("`{var}` does not carry the expected handshake value")]
    HandshakeMismatch {
        /// The handshake variable.
        var: &'static str,
    },

    /// The handshake was present but the channel variable was not.
    #[error("handshake present but `{var}` is not set")]
    MissingChannel {
        /// The channel variable.
        var: &'static str,
    },

    /// The channel variable did not name a usable descriptor.
    #[error("`{value}` is not a usable status channel")]
    InvalidChannel {
        /// The value of the channel variable.
        value: String,
    },

    /// The serialization mode variable was not recognized.
    #[error(transparent)]
    SerializationMode(#[from] SerializationModeParseError),

    /// A message could not be serialized.
    #[error("error serializing status message")]
    Serialize(#[source] serde_json::Error),

    /// A message exceeded the maximum frame size.
    #[error("status message of {size} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge {
        /// The size of the message.
        size: usize,

        /// The maximum size allowed.
        max: usize,
    },

    /// Writing to the channel failed.
    #[error("error writing to status channel")]
    Write(#[source] io::Error),
}
