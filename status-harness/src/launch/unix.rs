// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::ipc::CHILD_IPC_FD;
use std::{
    fs::File,
    io::{self, PipeReader, PipeWriter},
    os::{
        fd::{AsRawFd, OwnedFd},
        unix::process::CommandExt,
    },
    process::Command,
};

pub(super) fn pipe_reader_to_file(rx: PipeReader) -> File {
    File::from(OwnedFd::from(rx))
}

/// Installs the write end of the status channel at [`CHILD_IPC_FD`] in the child, returning the
/// value the child finds the channel under.
///
/// The parent's descriptor stays close-on-exec, so only this child inherits the channel.
pub(super) fn attach_channel(cmd: &mut Command, tx: &PipeWriter) -> io::Result<String> {
    let fd = tx.as_raw_fd();

    // SAFETY: the closure runs between fork and exec, and only calls dup2 and fcntl, which are
    // async-signal-safe.
    unsafe {
        cmd.pre_exec(move || {
            if fd != CHILD_IPC_FD && libc::dup2(fd, CHILD_IPC_FD) == -1 {
                return Err(io::Error::last_os_error());
            }
            // dup2 clears FD_CLOEXEC on the new descriptor, but not if fd was already
            // CHILD_IPC_FD.
            let flags = libc::fcntl(CHILD_IPC_FD, libc::F_GETFD);
            if flags == -1
                || libc::fcntl(CHILD_IPC_FD, libc::F_SETFD, flags & !libc::FD_CLOEXEC) == -1
            {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    Ok(CHILD_IPC_FD.to_string())
}
