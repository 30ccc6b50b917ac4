// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for status-harness.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::{io, process::ExitStatus, sync::LazyLock};

/// Converts `file` into a posix-style path relative to `root`.
///
/// Relative paths are first resolved against the current directory. Both paths are then handled
/// lexically: backslashes are treated as separators on every platform, `.` segments are dropped
/// and `..` segments cancel out the segment before them. The result always uses forward slashes,
/// so the same file produces the same string whatever separator style it was reported with.
///
/// A file outside `root` produces a relative path with leading `..` segments, and a file equal to
/// `root` produces `.`.
pub fn normalize_path(root: &Utf8Path, file: &Utf8Path) -> String {
    let root = lexical_normalize(&resolve_relative(root.as_str()));
    let file = lexical_normalize(&resolve_relative(file.as_str()));

    // diff_utf8_paths returns None if the paths share no base, e.g. when the current directory
    // isn't valid UTF-8 and a path stayed relative. Fall back to the file itself in that case.
    let relative = pathdiff::diff_utf8_paths(&file, &root).unwrap_or(file);
    let relative = convert_to_forward_slash(relative.as_str());

    if relative.is_empty() {
        ".".to_owned()
    } else {
        relative
    }
}

/// Returns `path` joined onto the current directory if it is relative.
pub(crate) fn absolute_utf8(path: &Utf8Path) -> io::Result<Utf8PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }
    let absolute = std::path::absolute(path)?;
    Utf8PathBuf::try_from(absolute).map_err(|err| err.into_io_error())
}

fn resolve_relative(path: &str) -> String {
    let path = convert_to_forward_slash(path);
    match absolute_utf8(Utf8Path::new(&path)) {
        Ok(absolute) => absolute.into_string(),
        Err(_) => path,
    }
}

/// Converts every backslash in `path` to a forward slash.
pub(crate) fn convert_to_forward_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolves `.` and `..` segments in `path` without touching the file system.
fn lexical_normalize(path: &str) -> Utf8PathBuf {
    let path = convert_to_forward_slash(path);
    let mut out = Utf8PathBuf::new();
    for component in Utf8Path::new(&path).components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.components().next_back() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root.
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                Some(Utf8Component::ParentDir | Utf8Component::CurDir) | None => out.push(".."),
            },
            other => out.push(other.as_str()),
        }
    }
    out
}

static LEADING_NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^0-9A-Za-z_]+").expect("leading non-word regex is valid"));
static TRAILING_NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^0-9A-Za-z_]+\n+$").expect("trailing non-word regex is valid")
});

/// Strips decoration from runner output so it can be compared against expected text.
///
/// Removes leading non-word characters (ASCII word characters only), then trailing non-word
/// characters followed by newlines, then surrounding whitespace.
pub fn clean_output(output: &str) -> String {
    let output = LEADING_NON_WORD.replace(output, "");
    let output = TRAILING_NON_WORD.replace(&output, "");
    output.trim().to_owned()
}

// "exited with"/"aborted with"
pub(crate) fn display_exited_with(exit_status: &ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(sig) = exit_status.signal() {
            return match signal_str(sig) {
                Some(s) => format!("aborted with signal {sig} (SIG{s})"),
                None => format!("aborted with signal {sig}"),
            };
        }
    }

    match exit_status.code() {
        Some(code) => format!("exited with exit code {code}"),
        None => "exited with an unknown error".to_owned(),
    }
}

#[cfg(unix)]
fn signal_str(signal: i32) -> Option<&'static str> {
    // These signal numbers are the same on at least Linux, macOS, FreeBSD and illumos.
    match signal {
        1 => Some("HUP"),
        2 => Some("INT"),
        3 => Some("QUIT"),
        4 => Some("ILL"),
        5 => Some("TRAP"),
        6 => Some("ABRT"),
        8 => Some("FPE"),
        9 => Some("KILL"),
        11 => Some("SEGV"),
        13 => Some("PIPE"),
        14 => Some("ALRM"),
        15 => Some("TERM"),
        _ => None,
    }
}
