// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level application and command routing.

use crate::{
    ExpectedError, HarnessExitCode,
    errors::{Result, fixture_exit_code},
    output::{OutputContext, OutputOpts},
    reporter::{HumanReporter, JsonReport},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use status_harness::{
    config::HarnessConfig,
    fixture::run_fixture_blocking,
    launch::{LaunchOptions, Launcher},
    report::Stats,
};
use std::io::{self, Write};
use tracing::debug;

/// Parses the process's arguments, runs the command and exits with its code.
pub fn main_impl() -> ! {
    let app = StatusHarnessApp::parse();
    let output = app.init_output();

    match app.exec(output) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr();
            std::process::exit(error.process_exit_code())
        }
    }
}

/// Runs a test runner and reduces the status events it emits into a report.
#[derive(Debug, Parser)]
#[command(
    name = "status-harness",
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct StatusHarnessApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl StatusHarnessApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        match self.command {
            Command::Run(opts) => opts.exec(output),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the test runner and print its report
    Run(RunOpts),
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Harness config file [default: .config/status-harness.toml under the workspace root]
    #[arg(long, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Workspace root [default: current directory]
    #[arg(long, value_name = "DIR")]
    workspace_root: Option<Utf8PathBuf>,

    /// Program used to start the runner, overriding the config
    #[arg(long, value_name = "PROGRAM")]
    program: Option<String>,

    /// Runner entry point, overriding the config
    #[arg(long, value_name = "PATH")]
    entry_point: Option<Utf8PathBuf>,

    /// Working directory for the run [default: the fixtures directory]
    #[arg(long, value_name = "DIR")]
    cwd: Option<Utf8PathBuf>,

    /// Set an environment variable for the runner (can be repeated)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_var)]
    env: Vec<(String, String)>,

    /// Forward the runner's diagnostic output to stderr
    #[arg(long)]
    forward_diagnostics: bool,

    /// Format of the printed report
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormat,

    /// Arguments passed to the runner
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormat {
    /// A summary and one line per test
    #[default]
    Human,
    /// The full report as JSON
    Json,
}

impl RunOpts {
    fn exec(self, output: OutputContext) -> Result<i32> {
        let current_dir = current_dir_utf8()?;
        let workspace_root = match self.workspace_root {
            Some(root) => absolutize(&current_dir, root),
            None => current_dir.clone(),
        };
        let config_file = self.config.map(|file| absolutize(&current_dir, file));

        let mut config = HarnessConfig::from_sources(&workspace_root, config_file.as_deref())?;
        if let Some(program) = self.program {
            config = config.with_program(program);
        }
        if let Some(entry_point) = self.entry_point {
            config = config.with_entry_point(absolutize(&current_dir, entry_point));
        }
        if self.forward_diagnostics {
            config = config.with_forward_diagnostics(true);
        }

        let mut options = LaunchOptions::new();
        if let Some(cwd) = self.cwd {
            options.cwd(absolutize(&current_dir, cwd));
        }
        options.envs(self.env);

        let launcher = Launcher::new(config);
        debug!(%workspace_root, "starting harness run");

        match run_fixture_blocking(&launcher, &self.args, &options) {
            Ok(report) => {
                let exit_code = report.output.exit_status.code();
                self.message_format
                    .write(&output, &report.stats, exit_code)?;
                Ok(HarnessExitCode::OK)
            }
            Err(error) => {
                // Setup failures never produced a report worth printing.
                if fixture_exit_code(error.error()) == HarnessExitCode::RUN_FAILED {
                    let exit_code = error.exit_status().and_then(|status| status.code());
                    self.message_format
                        .write(&output, error.stats(), exit_code)?;
                }
                Err(ExpectedError::run_failed(error))
            }
        }
    }
}

impl MessageFormat {
    fn write(self, output: &OutputContext, stats: &Stats, exit_code: Option<i32>) -> Result<()> {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        let res = match self {
            Self::Human => {
                let styles = output.report_styles();
                HumanReporter::new(&styles, output.verbose).write_report(stats, &mut writer)
            }
            Self::Json => JsonReport { stats, exit_code }.write(&mut writer),
        };
        res.and_then(|()| writer.flush())
            .map_err(|err| ExpectedError::WriteReport { err })
    }
}

fn parse_env_var(input: &str) -> std::result::Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, found `{input}`")),
    }
}

fn current_dir_utf8() -> Result<Utf8PathBuf> {
    let current_dir =
        std::env::current_dir().map_err(|err| ExpectedError::CurrentDirInvalid { err })?;
    Utf8PathBuf::try_from(current_dir).map_err(|err| ExpectedError::CurrentDirInvalidUtf8 {
        path: err.into_path_buf(),
    })
}

/// Resolves `path` against `base` if it is relative.
fn absolutize(base: &Utf8Path, path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
