// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{LaunchOptions, LaunchSettings, os};
use crate::{
    config::HarnessConfig,
    errors::LaunchError,
    ipc::{IPC_FD_ENV, IPC_SERIALIZATION_ENV, StatusReader},
    output::{CHUNK_SIZE, FusedBufReader, fill_buf_opt, is_done_opt},
};
use bytes::{Bytes, BytesMut};
use std::process::{ExitStatus, Stdio};
use tokio::{
    fs::File,
    process::{Child, ChildStderr, ChildStdout},
};
use tracing::debug;

/// Launches the runner with a fixed configuration.
#[derive(Clone, Debug)]
pub struct Launcher {
    config: HarnessConfig,
}

impl Launcher {
    /// Creates a new launcher.
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration this launcher was created with.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Returns the full argument list for a launch: the startup arguments, the runtime
    /// arguments, the entry point if any, then `args`.
    pub fn command_args(&self, settings: &LaunchSettings, args: &[String]) -> Vec<String> {
        let mut command_args = settings.startup_args.clone();
        command_args.extend(settings.runtime_args.iter().cloned());
        if let Some(entry_point) = self.config.entry_point() {
            command_args.push(entry_point.to_string());
        }
        command_args.extend(args.iter().cloned());
        command_args
    }

    /// Starts the runner with `args`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn launch(
        &self,
        args: &[String],
        options: &LaunchOptions,
    ) -> Result<LaunchedProcess, LaunchError> {
        let settings = LaunchSettings::resolve(&self.config, options)?;
        let command_args = self.command_args(&settings, args);
        let command = display_command(self.config.program(), &command_args);

        let (rx, tx) = std::io::pipe().map_err(LaunchError::IpcChannel)?;

        let mut cmd = std::process::Command::new(self.config.program());
        cmd.args(&command_args)
            .current_dir(&settings.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !settings.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(&settings.env);

        let channel = os::attach_channel(&mut cmd, &tx).map_err(LaunchError::IpcChannel)?;
        cmd.env(IPC_FD_ENV, channel)
            .env(IPC_SERIALIZATION_ENV, settings.serialization.as_str());

        let mut cmd: tokio::process::Command = cmd.into();
        let mut child = cmd.spawn().map_err(|err| LaunchError::Spawn {
            command: command.clone(),
            err,
        })?;
        // The child has its own copy now. Dropping ours means the channel closes once the child
        // (and anything it passed the channel on to) exits.
        drop(tx);

        debug!(%command, cwd = %settings.cwd, pid = ?child.id(), "launched runner");

        let stdout = child.stdout.take().map(FusedBufReader::new);
        let stderr = child.stderr.take();
        let messages = StatusReader::new(
            File::from_std(os::pipe_reader_to_file(rx)),
            settings.serialization,
        );

        Ok(LaunchedProcess {
            settings,
            messages,
            stderr,
            completion: Completion {
                command: command.clone(),
                child,
                stdout,
            },
            command,
        })
    }
}

fn display_command(program: &str, args: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(program);
    words.extend(args.iter().map(String::as_str));
    shell_words::join(words)
}

/// A runner that has been started.
///
/// The fields are meant to be taken apart and consumed concurrently.
#[derive(Debug)]
pub struct LaunchedProcess {
    /// The command line, for display.
    pub command: String,

    /// The settings the runner was launched with.
    pub settings: LaunchSettings,

    /// Status messages from the runner.
    pub messages: StatusReader<File>,

    /// The runner's diagnostic stream.
    pub stderr: Option<ChildStderr>,

    /// Resolves once the runner exits.
    pub completion: Completion,
}

/// Waits for the runner to exit while capturing its standard output.
#[derive(Debug)]
pub struct Completion {
    command: String,
    child: Child,
    stdout: Option<FusedBufReader<ChildStdout>>,
}

impl Completion {
    /// Waits for the runner to exit.
    ///
    /// Returns [`LaunchError::ProcessFailed`], with everything the runner wrote to standard output,
    /// if it exits with a non-zero code or is killed by a signal.
    pub async fn wait(mut self) -> Result<CompletedProcess, LaunchError> {
        let mut stdout = BytesMut::with_capacity(CHUNK_SIZE);

        let exit_status = loop {
            tokio::select! {
                res = fill_buf_opt(self.stdout.as_mut(), &mut stdout), if !is_done_opt(self.stdout.as_ref()) => {
                    res.map_err(|err| LaunchError::ReadStdout {
                        command: self.command.clone(),
                        err,
                    })?;
                }
                res = self.child.wait() => {
                    break res.map_err(|err| LaunchError::Wait {
                        command: self.command.clone(),
                        err,
                    })?;
                }
            }
        };

        // The runner has exited, but there may still be output in the pipe.
        while !is_done_opt(self.stdout.as_ref()) {
            fill_buf_opt(self.stdout.as_mut(), &mut stdout)
                .await
                .map_err(|err| LaunchError::ReadStdout {
                    command: self.command.clone(),
                    err,
                })?;
        }

        let stdout = stdout.freeze();
        debug!(command = %self.command, ?exit_status, "runner exited");
        if exit_status.success() {
            Ok(CompletedProcess {
                command: self.command,
                exit_status,
                stdout,
            })
        } else {
            Err(LaunchError::ProcessFailed {
                command: self.command,
                exit_status,
                stdout,
            })
        }
    }
}

/// A runner that exited successfully.
#[derive(Clone, Debug)]
pub struct CompletedProcess {
    /// The command line, for display.
    pub command: String,

    /// The exit status.
    pub exit_status: ExitStatus,

    /// Everything the runner wrote to standard output.
    pub stdout: Bytes,
}
