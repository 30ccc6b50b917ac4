// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running the runner against a fixture and finalizing its report.

use crate::{
    aggregator::EventAggregator,
    errors::{FixtureError, IpcError, LaunchError},
    forwarder::DiagnosticForwarder,
    ipc::{StatusEvent, StatusReader},
    launch::{CompletedProcess, Completion, LaunchOptions, LaunchedProcess, Launcher},
    report::Stats,
};
use bytes::Bytes;
use std::{io, process::ExitStatus};
use tokio::{fs::File, runtime::Runtime};
use tracing::{debug, warn};

/// The result of a successful run.
#[derive(Debug)]
pub struct RunReport {
    /// The sorted report.
    pub stats: Stats,

    /// Everything the runner produced.
    pub output: ProcessOutput,
}

/// The output of a runner that exited successfully.
#[derive(Clone, Debug)]
pub struct ProcessOutput {
    /// The command line, for display.
    pub command: String,

    /// The exit status.
    pub exit_status: ExitStatus,

    /// Everything the runner wrote to standard output.
    pub stdout: Bytes,

    /// Everything the runner wrote to its diagnostic stream.
    pub stderr: Bytes,
}

/// Runs the runner with `args` and collects its report.
///
/// Status messages are aggregated as they arrive. Once the runner has exited and its status
/// channel is drained, the report is sorted and returned. If the runner fails, the error carries
/// the sorted report collected up to that point.
pub async fn run_fixture(
    launcher: &Launcher,
    args: &[String],
    options: &LaunchOptions,
) -> Result<RunReport, FixtureError> {
    let LaunchedProcess {
        command,
        settings,
        mut messages,
        stderr,
        completion,
    } = launcher
        .launch(args, options)
        .map_err(|error| FixtureError::new(error, Stats::new(), Bytes::new()))?;

    let diagnostics = stderr.map(|stderr| {
        DiagnosticForwarder::new(launcher.config().forward_diagnostics()).spawn(stderr)
    });

    let mut aggregator = EventAggregator::new(settings.cwd);
    let result = collect(&mut aggregator, &mut messages, completion, &command).await;

    let stderr = match diagnostics {
        Some(handle) => handle
            .await
            .map_err(io::Error::other)
            .and_then(|res| res)
            .map_err(|err| LaunchError::ReadDiagnostics {
                command: command.clone(),
                err,
            }),
        None => Ok(Bytes::new()),
    };

    let mut stats = aggregator.into_stats();
    stats.sort();

    match (result, stderr) {
        (Ok(completed), Ok(stderr)) => {
            let CompletedProcess {
                command,
                exit_status,
                stdout,
            } = completed;
            Ok(RunReport {
                stats,
                output: ProcessOutput {
                    command,
                    exit_status,
                    stdout,
                    stderr,
                },
            })
        }
        (Err(error), stderr) => Err(FixtureError::new(
            error,
            stats,
            stderr.unwrap_or_default(),
        )),
        (Ok(_), Err(error)) => Err(FixtureError::new(error, stats, Bytes::new())),
    }
}

/// Like [`run_fixture`], but runs on a new Tokio runtime.
pub fn run_fixture_blocking(
    launcher: &Launcher,
    args: &[String],
    options: &LaunchOptions,
) -> Result<RunReport, FixtureError> {
    let runtime = Runtime::new().map_err(|err| {
        FixtureError::new(LaunchError::RuntimeCreate(err), Stats::new(), Bytes::new())
    })?;
    runtime.block_on(run_fixture(launcher, args, options))
}

/// Feeds status messages to the aggregator until the runner has exited and the channel is closed.
async fn collect(
    aggregator: &mut EventAggregator,
    messages: &mut StatusReader<File>,
    completion: Completion,
    command: &str,
) -> Result<CompletedProcess, LaunchError> {
    let completion = completion.wait();
    tokio::pin!(completion);

    let mut ipc_error = None;
    let mut channel_closed = false;

    let result = loop {
        tokio::select! {
            // Messages already sent are recorded before the exit is observed.
            biased;

            res = messages.next_message(), if !channel_closed => {
                channel_closed = handle_message(aggregator, res, &mut ipc_error);
            }
            res = &mut completion => break res,
        }
    };

    // Anything the runner sent before exiting is still in the channel.
    while !channel_closed {
        let res = messages.next_message().await;
        channel_closed = handle_message(aggregator, res, &mut ipc_error);
    }

    match (result, ipc_error) {
        (Ok(_), Some(err)) => Err(LaunchError::Ipc {
            command: command.to_owned(),
            err,
        }),
        (Err(error), Some(err)) => {
            warn!(%command, "status channel was malformed: {err}");
            Err(error)
        }
        (result, None) => result,
    }
}

/// Handles the result of reading one message, returning true once the channel is closed.
fn handle_message(
    aggregator: &mut EventAggregator,
    res: Result<Option<StatusEvent>, IpcError>,
    ipc_error: &mut Option<IpcError>,
) -> bool {
    match res {
        Ok(Some(event)) => {
            aggregator.observe(event);
            false
        }
        Ok(None) => {
            debug!("status channel closed");
            true
        }
        Err(err) => {
            // The reader drains the rest of the channel without decoding it.
            if ipc_error.is_none() {
                *ipc_error = Some(err);
            }
            false
        }
    }
}
