// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Launching the runner.
//!
//! A [`Launcher`] owns the settings that are the same for every run: the program, its startup
//! arguments and entry point. Each launch merges caller [`LaunchOptions`] over the defaults and
//! returns a [`LaunchedProcess`], whose parts are consumed independently: status messages, the
//! diagnostic stream and a [`Completion`] that resolves when the runner exits.

mod imp;
mod options;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        #[path = "unix.rs"]
        mod unix;
        use unix as os;
    } else if #[cfg(windows)] {
        #[path = "windows.rs"]
        mod windows;
        use windows as os;
    } else {
        compile_error!("unsupported target platform");
    }
}

pub use imp::*;
pub use options::*;
