// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    EMIT_STATUS_ENV, EMIT_STATUS_HANDSHAKE, IPC_FD_ENV, IPC_SERIALIZATION_ENV, SerializationMode,
    StatusEvent, encode_message,
};
use crate::errors::EmitError;
use serde_json::Value;
use std::{
    env,
    fs::File,
    io::{BufWriter, Write},
};

/// The runner end of the status channel.
///
/// Every message is flushed as soon as it is written, so the harness sees events in order and
/// without delay.
#[derive(Debug)]
pub struct StatusEmitter<W: Write = File> {
    writer: BufWriter<W>,
    mode: SerializationMode,
}

impl StatusEmitter<File> {
    /// Connects to the channel described by the current process's environment.
    ///
    /// Returns `Ok(None)` if the handshake variable is absent, meaning nobody asked for status.
    pub fn from_env() -> Result<Option<Self>, EmitError> {
        match env::var(EMIT_STATUS_ENV) {
            Ok(value) if value == EMIT_STATUS_HANDSHAKE => {}
            Err(env::VarError::NotPresent) => return Ok(None),
            Ok(_) | Err(env::VarError::NotUnicode(_)) => {
                return Err(EmitError::HandshakeMismatch {
                    var: EMIT_STATUS_ENV,
                });
            }
        }

        let channel = env::var(IPC_FD_ENV)
            .map_err(|_| EmitError::MissingChannel { var: IPC_FD_ENV })?;
        let mode = match env::var(IPC_SERIALIZATION_ENV) {
            Ok(mode) => mode.parse()?,
            Err(_) => SerializationMode::Json,
        };
        let file = os::channel_from_env(&channel)?;
        Ok(Some(Self::new(file, mode)))
    }
}

impl<W: Write> StatusEmitter<W> {
    /// Creates an emitter writing frames in `mode` to `writer`.
    pub fn new(writer: W, mode: SerializationMode) -> Self {
        Self {
            writer: BufWriter::new(writer),
            mode,
        }
    }

    /// Returns the serialization mode this emitter writes.
    pub fn mode(&self) -> SerializationMode {
        self.mode
    }

    /// Emits a status event.
    pub fn emit(&mut self, event: &StatusEvent) -> Result<(), EmitError> {
        self.write_frame(&encode_message(self.mode, event)?)
    }

    /// Emits an arbitrary JSON message, including kinds the harness doesn't know about.
    pub fn emit_value(&mut self, value: &Value) -> Result<(), EmitError> {
        self.write_frame(&encode_message(self.mode, value)?)
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> Result<W, EmitError> {
        self.writer
            .into_inner()
            .map_err(|err| EmitError::Write(err.into_error()))
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), EmitError> {
        self.writer.write_all(frame).map_err(EmitError::Write)?;
        self.writer.flush().map_err(EmitError::Write)
    }
}

#[cfg(unix)]
mod os {
    use crate::errors::EmitError;
    use std::{
        fs::File,
        os::fd::{FromRawFd, RawFd},
    };

    pub(super) fn channel_from_env(value: &str) -> Result<File, EmitError> {
        let invalid = || EmitError::InvalidChannel {
            value: value.to_owned(),
        };
        let fd: RawFd = value.parse().map_err(|_| invalid())?;
        // Descriptors 0 to 2 are stdio, and closing them on drop would break the process.
        if fd <= 2 {
            return Err(invalid());
        }
        // SAFETY: F_GETFD only inspects the descriptor table.
        if unsafe { libc::fcntl(fd, libc::F_GETFD) } == -1 {
            return Err(invalid());
        }
        // SAFETY: the harness hands this descriptor to exactly one emitter, which owns it from
        // here on.
        Ok(unsafe { File::from_raw_fd(fd) })
    }
}

#[cfg(windows)]
mod os {
    use crate::errors::EmitError;
    use std::{
        fs::File,
        os::windows::io::{FromRawHandle, RawHandle},
    };

    pub(super) fn channel_from_env(value: &str) -> Result<File, EmitError> {
        let handle: usize = value.parse().map_err(|_| EmitError::InvalidChannel {
            value: value.to_owned(),
        })?;
        if handle == 0 {
            return Err(EmitError::InvalidChannel {
                value: value.to_owned(),
            });
        }
        // SAFETY: the harness makes this handle inheritable and hands it to exactly one emitter,
        // which owns it from here on.
        Ok(unsafe { File::from_raw_handle(handle as RawHandle) })
    }
}
