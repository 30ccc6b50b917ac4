// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunked reads from the runner's output pipes.

use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// The size of each buffered reader's buffer, and the granularity at which diagnostic output is
/// forwarded.
///
/// This size is not totally arbitrary, but rather the (normal) page size on most systems.
pub(crate) const CHUNK_SIZE: usize = 4 * 1024;

/// A `BufReader` over an `AsyncRead` that tracks whether it has hit end of stream or an error.
///
/// [`Self::fill_buf`] is cancel-safe: data is only moved into the accumulator once the underlying
/// read has completed, so it can be used as a branch in `tokio::select!`.
#[derive(Debug)]
pub(crate) struct FusedBufReader<R> {
    reader: BufReader<R>,
    done: bool,
}

impl<R: AsyncRead + Unpin> FusedBufReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(CHUNK_SIZE, reader),
            done: false,
        }
    }

    /// Appends the next available chunk to `acc`. At end of stream, appends nothing and marks the
    /// reader as done.
    pub(crate) async fn fill_buf(&mut self, acc: &mut BytesMut) -> Result<(), io::Error> {
        if self.done {
            return Ok(());
        }

        match self.reader.fill_buf().await {
            Ok(buf) => {
                acc.extend_from_slice(buf);
                if buf.is_empty() {
                    self.done = true;
                }
                let len = buf.len();
                self.reader.consume(len);
                Ok(())
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }
}

/// A version of [`FusedBufReader::fill_buf`] that works with an `Option<FusedBufReader>`.
pub(crate) async fn fill_buf_opt<R: AsyncRead + Unpin>(
    reader: Option<&mut FusedBufReader<R>>,
    acc: &mut BytesMut,
) -> Result<(), io::Error> {
    match reader {
        Some(reader) => reader.fill_buf(acc).await,
        None => Ok(()),
    }
}

/// A version of [`FusedBufReader::is_done`] that works with an `Option<FusedBufReader>`.
pub(crate) fn is_done_opt<R: AsyncRead + Unpin>(reader: Option<&FusedBufReader<R>>) -> bool {
    reader.is_none_or(|r| r.is_done())
}
