// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::StatusEvent;
use crate::{
    errors::{EmitError, IpcError, SerializationModeParseError},
    output::FusedBufReader,
};
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use tokio::io::AsyncRead;
use tracing::trace;

/// The largest status message either end accepts, in bytes.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const LENGTH_PREFIX_SIZE: usize = 4;

/// How status messages are framed on the channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SerializationMode {
    /// Each message is a 4-byte little-endian length followed by that many bytes of UTF-8 JSON.
    #[default]
    Advanced,

    /// Each message is one line of JSON. Blank lines are skipped.
    Json,
}

impl SerializationMode {
    /// Returns the name of this mode, as passed through the environment.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Advanced => "advanced",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SerializationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SerializationMode {
    type Err = SerializationModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advanced" => Ok(Self::Advanced),
            "json" => Ok(Self::Json),
            other => Err(SerializationModeParseError::new(other)),
        }
    }
}

/// Encodes a single status message as a frame.
pub fn encode_message<T: Serialize + ?Sized>(
    mode: SerializationMode,
    message: &T,
) -> Result<Vec<u8>, EmitError> {
    let json = serde_json::to_vec(message).map_err(EmitError::Serialize)?;
    if json.len() > MAX_FRAME_SIZE {
        return Err(EmitError::FrameTooLarge {
            size: json.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(json.len() + LENGTH_PREFIX_SIZE);
    match mode {
        SerializationMode::Advanced => {
            // MAX_FRAME_SIZE fits in a u32.
            frame.extend_from_slice(&(json.len() as u32).to_le_bytes());
            frame.extend_from_slice(&json);
        }
        SerializationMode::Json => {
            // serde_json escapes newlines inside strings, so the message is a single line.
            frame.extend_from_slice(&json);
            frame.push(b'\n');
        }
    }
    Ok(frame)
}

/// Decodes the payload of a single frame into a status event.
pub fn decode_message(payload: &[u8]) -> Result<StatusEvent, IpcError> {
    let value: Value = serde_json::from_slice(payload).map_err(IpcError::InvalidJson)?;
    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_owned(),
        None => return Err(IpcError::MissingType),
    };
    serde_json::from_value(value).map_err(|err| IpcError::InvalidMessage { kind, err })
}

/// Reads status events from the harness end of the channel.
///
/// [`Self::next_message`] is cancel-safe, so it can be raced against the runner's exit in
/// `tokio::select!`.
///
/// Once an error has been returned, the reader keeps draining the channel without decoding it, so
/// the runner never blocks on a full pipe, and reports end of stream once the runner closes it.
pub struct StatusReader<R> {
    reader: FusedBufReader<R>,
    mode: SerializationMode,
    buf: BytesMut,
    failed: bool,
}

impl<R: AsyncRead + Unpin> StatusReader<R> {
    /// Creates a new reader over `reader`, decoding frames according to `mode`.
    pub fn new(reader: R, mode: SerializationMode) -> Self {
        Self {
            reader: FusedBufReader::new(reader),
            mode,
            buf: BytesMut::new(),
            failed: false,
        }
    }

    /// Returns the serialization mode this reader decodes.
    pub fn mode(&self) -> SerializationMode {
        self.mode
    }

    /// Reads the next event, returning `Ok(None)` once the runner has closed the channel.
    pub async fn next_message(&mut self) -> Result<Option<StatusEvent>, IpcError> {
        loop {
            if self.failed {
                self.buf.clear();
                if self.reader.is_done() {
                    return Ok(None);
                }
                // Read errors end the drain like end of stream does.
                let _ = self.reader.fill_buf(&mut self.buf).await;
                continue;
            }

            let payload = match self.split_payload() {
                Ok(payload) => payload,
                Err(error) => return Err(self.fail(error)),
            };
            if let Some(payload) = payload {
                trace!(len = payload.len(), "decoding status message");
                return match decode_message(&payload) {
                    Ok(event) => Ok(Some(event)),
                    Err(error) => Err(self.fail(error)),
                };
            }

            if self.reader.is_done() {
                return match self.take_trailing() {
                    Ok(Some(payload)) => match decode_message(&payload) {
                        Ok(event) => Ok(Some(event)),
                        Err(error) => Err(self.fail(error)),
                    },
                    Ok(None) => Ok(None),
                    Err(error) => Err(self.fail(error)),
                };
            }

            if let Err(error) = self.reader.fill_buf(&mut self.buf).await {
                return Err(self.fail(IpcError::Read(error)));
            }
        }
    }

    fn fail(&mut self, error: IpcError) -> IpcError {
        self.failed = true;
        error
    }

    /// Splits the next complete payload off the buffer, if there is one.
    fn split_payload(&mut self) -> Result<Option<Bytes>, IpcError> {
        match self.mode {
            SerializationMode::Advanced => {
                if self.buf.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }
                let len = u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])
                    as usize;
                if len == 0 {
                    return Err(IpcError::EmptyFrame);
                }
                if len > MAX_FRAME_SIZE {
                    return Err(IpcError::FrameTooLarge {
                        size: len,
                        max: MAX_FRAME_SIZE,
                    });
                }
                if self.buf.len() < LENGTH_PREFIX_SIZE + len {
                    return Ok(None);
                }
                self.buf.advance(LENGTH_PREFIX_SIZE);
                Ok(Some(self.buf.split_to(len).freeze()))
            }
            SerializationMode::Json => loop {
                let Some(newline) = self.buf.iter().position(|&b| b == b'\n') else {
                    if self.buf.len() > MAX_FRAME_SIZE {
                        return Err(IpcError::FrameTooLarge {
                            size: self.buf.len(),
                            max: MAX_FRAME_SIZE,
                        });
                    }
                    return Ok(None);
                };
                let line = self.buf.split_to(newline + 1).freeze();
                let line = line.slice(..newline);
                if line.len() > MAX_FRAME_SIZE {
                    return Err(IpcError::FrameTooLarge {
                        size: line.len(),
                        max: MAX_FRAME_SIZE,
                    });
                }
                if !line.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Some(line));
                }
            },
        }
    }

    /// Handles whatever is left in the buffer once the channel has closed.
    fn take_trailing(&mut self) -> Result<Option<Bytes>, IpcError> {
        let rest = self.buf.split().freeze();
        match self.mode {
            SerializationMode::Advanced if rest.is_empty() => Ok(None),
            SerializationMode::Advanced => Err(IpcError::TruncatedFrame {
                remaining: rest.len(),
            }),
            // A final line without a trailing newline is still a message.
            SerializationMode::Json if rest.iter().all(u8::is_ascii_whitespace) => Ok(None),
            SerializationMode::Json => Ok(Some(rest)),
        }
    }
}

impl<R> fmt::Debug for StatusReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReader")
            .field("mode", &self.mode)
            .field("buffered", &self.buf.len())
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}
