// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints finalized reports.

use crate::output::ReportStyles;
use owo_colors::{OwoColorize, Style};
use serde::Serialize;
use status_harness::{
    ipc::ErrorDescriptor,
    report::{ReportEntry, Stats},
};
use std::io::{self, Write};
use swrite::{SWrite, swrite};

/// The width status labels are right-aligned to.
const STATUS_WIDTH: usize = 9;

/// Writes a report for humans.
pub(crate) struct HumanReporter<'a> {
    styles: &'a ReportStyles,
    verbose: bool,
}

impl<'a> HumanReporter<'a> {
    pub(crate) fn new(styles: &'a ReportStyles, verbose: bool) -> Self {
        Self { styles, verbose }
    }

    pub(crate) fn write_report(&self, stats: &Stats, writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", self.summary(stats))?;

        let categories: [(&str, Style, &[ReportEntry]); 5] = [
            ("PASS", self.styles.pass, &stats.passed),
            ("FAIL", self.styles.fail, &stats.failed),
            ("HOOK FAIL", self.styles.fail, &stats.failed_hooks),
            ("SKIP", self.styles.skip, &stats.skipped),
            ("TODO", self.styles.todo, &stats.todo),
        ];
        for (label, style, entries) in categories {
            for entry in entries {
                self.write_entry(stats, label, style, entry, writer)?;
            }
        }

        for (label, errors) in [
            ("shared worker error", &stats.shared_worker_errors),
            ("uncaught exception", &stats.uncaught_exceptions),
        ] {
            for error in errors {
                writeln!(
                    writer,
                    "{}: {}",
                    label.style(self.styles.fail),
                    describe_error(error)
                )?;
                self.write_stack(error, writer)?;
            }
        }

        Ok(())
    }

    fn summary(&self, stats: &Stats) -> String {
        let counts = stats.counts();
        let mut summary = String::new();
        swrite!(
            summary,
            "{} passed, {} failed, {} failed hooks, {} skipped, {} todo",
            counts.passed.style(self.styles.count),
            counts.failed.style(self.styles.count),
            counts.failed_hooks.style(self.styles.count),
            counts.skipped.style(self.styles.count),
            counts.todo.style(self.styles.count),
        );
        if counts.shared_worker_errors > 0 {
            swrite!(
                summary,
                ", {} shared worker errors",
                counts.shared_worker_errors.style(self.styles.count)
            );
        }
        if counts.uncaught_exceptions > 0 {
            swrite!(
                summary,
                ", {} uncaught exceptions",
                counts.uncaught_exceptions.style(self.styles.count)
            );
        }
        summary
    }

    fn write_entry(
        &self,
        stats: &Stats,
        label: &str,
        style: Style,
        entry: &ReportEntry,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        let label = format!("{label:>STATUS_WIDTH$}");
        write!(
            writer,
            "{} [{}] {}",
            label.style(style),
            entry.file().style(self.styles.file),
            entry.title()
        )?;
        let error = stats.get_error(entry);
        match error {
            Some(error) => writeln!(writer, ": {}", describe_error(error))?,
            None => writeln!(writer)?,
        }

        if self.verbose {
            if let Some(error) = error {
                self.write_stack(error, writer)?;
            }
            for line in stats.get_logs(entry).unwrap_or_default() {
                writeln!(writer, "{:STATUS_WIDTH$}   {}", "", line.style(self.styles.dimmed))?;
            }
        }
        Ok(())
    }

    fn write_stack(&self, error: &ErrorDescriptor, writer: &mut dyn Write) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        if let Some(stack) = &error.stack {
            for line in stack.lines() {
                writeln!(writer, "{:STATUS_WIDTH$}   {}", "", line.style(self.styles.dimmed))?;
            }
        }
        Ok(())
    }
}

fn describe_error(error: &ErrorDescriptor) -> String {
    match (error.name.is_empty(), error.message.is_empty()) {
        (true, _) => error.message.clone(),
        (false, true) => error.name.clone(),
        (false, false) => format!("{}: {}", error.name, error.message),
    }
}

/// The JSON report: the serialized stats plus the runner's exit code.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonReport<'a> {
    #[serde(flatten)]
    pub(crate) stats: &'a Stats,
    pub(crate) exit_code: Option<i32>,
}

impl JsonReport<'_> {
    pub(crate) fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)
    }
}
