// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A fake test runner for exercising the harness end to end.
//!
//! Takes the path to a JSON script as its only argument. The script lists steps that are played
//! back in order, then the runner exits with the script's exit code:
//!
//! ```json
//! {
//!   "steps": [
//!     { "emit": { "type": "test-passed", "title": "bar", "testFile": "/work/test.js" } },
//!     { "stderr": "some diagnostics\n" },
//!     { "control": "internal chatter\n" },
//!     { "sleepMs": 100 },
//!     { "stdout": "runner output\n" },
//!     { "printEnv": "CI" },
//!     "printCwd"
//!   ],
//!   "exitCode": 1
//! }
//! ```
//!
//! Status messages go to the channel set up by the harness. If no channel was requested, `emit`
//! steps are skipped.

use color_eyre::eyre::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use status_harness::{forwarder::NO_FORWARD_PREFIX, ipc::StatusEmitter};
use std::{
    env,
    io::{self, Write},
    process::exit,
    thread,
    time::Duration,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Script {
    #[serde(default)]
    steps: Vec<Step>,
    #[serde(default)]
    exit_code: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Step {
    /// Send a raw status message.
    Emit(Value),
    /// Write to stderr.
    Stderr(String),
    /// Write to stderr, marked as not to be forwarded.
    Control(String),
    /// Write to stdout.
    Stdout(String),
    /// Pause, so that the next write lands in a separate chunk.
    SleepMs(u64),
    /// Print `KEY=value` to stdout, or `KEY` alone if the variable is unset.
    PrintEnv(String),
    /// Print the working directory to stdout.
    PrintCwd,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let mut args = env::args().skip(1);
    let Some(script_path) = args.next() else {
        bail!("usage: fake-runner <script.json>");
    };
    let script = std::fs::read_to_string(&script_path)
        .wrap_err_with(|| format!("failed to read script `{script_path}`"))?;
    let script: Script = serde_json::from_str(&script)
        .wrap_err_with(|| format!("failed to parse script `{script_path}`"))?;

    let mut emitter = StatusEmitter::from_env().wrap_err("failed to open status channel")?;
    if emitter.is_none() {
        eprintln!("[fake-runner] no status channel requested");
    }

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    for step in script.steps {
        match step {
            Step::Emit(message) => {
                if let Some(emitter) = &mut emitter {
                    emitter.emit_value(&message)?;
                }
            }
            Step::Stderr(text) => {
                stderr.write_all(text.as_bytes())?;
                stderr.flush()?;
            }
            Step::Control(text) => {
                // A single write, so the prefix starts the chunk the harness reads.
                let mut chunk = NO_FORWARD_PREFIX.to_vec();
                chunk.extend_from_slice(text.as_bytes());
                stderr.write_all(&chunk)?;
                stderr.flush()?;
            }
            Step::Stdout(text) => stdout.write_all(text.as_bytes())?,
            Step::SleepMs(ms) => thread::sleep(Duration::from_millis(ms)),
            Step::PrintEnv(key) => match env::var(&key) {
                Ok(value) => writeln!(stdout, "{key}={value}")?,
                Err(_) => writeln!(stdout, "{key}")?,
            },
            Step::PrintCwd => writeln!(stdout, "{}", env::current_dir()?.display())?,
        }
    }
    stdout.flush()?;

    // Close the channel before exiting.
    if let Some(emitter) = emitter {
        drop(emitter.into_inner()?);
    }
    exit(script.exit_code)
}
