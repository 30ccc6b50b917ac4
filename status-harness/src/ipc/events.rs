// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A status event emitted by the runner.
///
/// Events carry more fields than the ones listed here; those are ignored. Kinds the harness
/// doesn't know about decode as [`StatusEvent::Unknown`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StatusEvent {
    /// A hook (such as a before or after hook) failed.
    HookFailed {
        /// The title of the hook.
        title: String,

        /// The absolute path of the test file the hook belongs to.
        test_file: Utf8PathBuf,

        /// The error the hook failed with.
        err: ErrorDescriptor,
    },

    /// A test was selected to run.
    SelectedTest {
        /// The title of the test.
        title: String,

        /// The absolute path of the test file.
        test_file: Utf8PathBuf,

        /// Whether the test is skipped.
        #[serde(default)]
        skip: bool,

        /// Whether the test is a todo.
        #[serde(default)]
        todo: bool,
    },

    /// A shared worker failed. Not tied to a single test.
    SharedWorkerError {
        /// The error the worker failed with.
        err: ErrorDescriptor,
    },

    /// A test passed.
    TestPassed {
        /// The title of the test.
        title: String,

        /// The absolute path of the test file.
        test_file: Utf8PathBuf,

        /// Log lines the test produced.
        #[serde(default)]
        logs: Vec<String>,
    },

    /// A test failed.
    TestFailed {
        /// The title of the test.
        title: String,

        /// The absolute path of the test file.
        test_file: Utf8PathBuf,

        /// The error the test failed with.
        err: ErrorDescriptor,

        /// Log lines the test produced.
        #[serde(default)]
        logs: Vec<String>,
    },

    /// An exception escaped a test file. Not tied to a single test.
    UncaughtException {
        /// The exception.
        err: ErrorDescriptor,
    },

    /// Any other kind of event.
    #[serde(other)]
    Unknown,
}

impl StatusEvent {
    /// Returns the wire name of this event's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HookFailed { .. } => "hook-failed",
            Self::SelectedTest { .. } => "selected-test",
            Self::SharedWorkerError { .. } => "shared-worker-error",
            Self::TestPassed { .. } => "test-passed",
            Self::TestFailed { .. } => "test-failed",
            Self::UncaughtException { .. } => "uncaught-exception",
            Self::Unknown => "unknown",
        }
    }
}

/// A serialized error, as carried by status events.
///
/// Any fields beyond `message`, `name` and `stack` are kept in `details`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// The error message.
    #[serde(default)]
    pub message: String,

    /// The error's name, e.g. `TypeError`.
    #[serde(default)]
    pub name: String,

    /// The stack trace, if the runner captured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Every other field of the error.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ErrorDescriptor {
    /// Creates a new descriptor with a message and name.
    pub fn new(message: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: name.into(),
            stack: None,
            details: Map::new(),
        }
    }

    /// Sets the stack trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Returns a copy of this descriptor with only `message`, `name` and `stack`.
    pub fn summary(&self) -> Self {
        Self {
            message: self.message.clone(),
            name: self.name.clone(),
            stack: self.stack.clone(),
            details: Map::new(),
        }
    }
}
