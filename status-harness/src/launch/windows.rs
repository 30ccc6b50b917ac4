// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    fs::File,
    io::{self, PipeReader, PipeWriter},
    os::windows::io::{AsRawHandle, OwnedHandle},
    process::Command,
};
use windows_sys::Win32::Foundation::{HANDLE_FLAG_INHERIT, SetHandleInformation};

pub(super) fn pipe_reader_to_file(rx: PipeReader) -> File {
    File::from(OwnedHandle::from(rx))
}

/// Marks the write end of the status channel inheritable, returning the value the child finds the
/// channel under.
pub(super) fn attach_channel(_cmd: &mut Command, tx: &PipeWriter) -> io::Result<String> {
    let handle = tx.as_raw_handle();

    // SAFETY: `handle` is a valid pipe handle owned by `tx` for the duration of this call.
    let res = unsafe { SetHandleInformation(handle, HANDLE_FLAG_INHERIT, HANDLE_FLAG_INHERIT) };
    if res == 0 {
        return Err(io::Error::last_os_error());
    }

    Ok((handle as usize).to_string())
}
