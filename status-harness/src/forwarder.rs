// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drains the runner's diagnostic output, optionally forwarding it.

use crate::output::{CHUNK_SIZE, FusedBufReader};
use bytes::{Bytes, BytesMut};
use debug_ignore::DebugIgnore;
use std::io;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    task::JoinHandle,
};
use tracing::{trace, warn};

/// The prefix marking a diagnostic chunk as harness-internal: the UTF-8 encoding of U+1F917.
///
/// Chunks starting with these bytes are never forwarded. Chunks shorter than the prefix never
/// match it.
pub const NO_FORWARD_PREFIX: [u8; 4] = [0xf0, 0x9f, 0xa4, 0x97];

/// Returns true if `chunk` carries the [`NO_FORWARD_PREFIX`].
pub fn is_control_chunk(chunk: &[u8]) -> bool {
    chunk.starts_with(&NO_FORWARD_PREFIX)
}

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Reads the runner's diagnostic stream to the end, forwarding chunks to a sink when enabled.
///
/// The stream is always read to completion, whether or not forwarding is enabled, so the runner
/// never blocks on a full pipe. If the sink fails, forwarding stops but draining continues.
#[derive(Debug)]
pub struct DiagnosticForwarder {
    sink: Option<DebugIgnore<Sink>>,
}

impl DiagnosticForwarder {
    /// Creates a forwarder that only drains.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Creates a forwarder that writes to the harness's own stderr.
    pub fn to_stderr() -> Self {
        Self::with_sink(tokio::io::stderr())
    }

    /// Creates a forwarder that writes to `sink`.
    pub fn with_sink(sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            sink: Some(DebugIgnore(Box::new(sink))),
        }
    }

    /// Creates a forwarder to stderr if `forward` is true, and a draining one otherwise.
    pub fn new(forward: bool) -> Self {
        if forward {
            Self::to_stderr()
        } else {
            Self::disabled()
        }
    }

    /// Returns true if chunks are currently being forwarded.
    pub fn is_forwarding(&self) -> bool {
        self.sink.is_some()
    }

    /// Reads `reader` to the end, returning everything read, control chunks included.
    pub async fn drain<R: AsyncRead + Unpin>(mut self, reader: R) -> Result<Bytes, io::Error> {
        let mut reader = FusedBufReader::new(reader);
        let mut captured = BytesMut::with_capacity(CHUNK_SIZE);
        while !reader.is_done() {
            let start = captured.len();
            reader.fill_buf(&mut captured).await?;
            if captured.len() > start {
                self.forward(&captured[start..]).await;
            }
        }
        Ok(captured.freeze())
    }

    /// Runs [`Self::drain`] in its own task.
    pub fn spawn<R>(self, reader: R) -> JoinHandle<Result<Bytes, io::Error>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(self.drain(reader))
    }

    async fn forward(&mut self, chunk: &[u8]) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if is_control_chunk(chunk) {
            trace!(len = chunk.len(), "not forwarding control chunk");
            return;
        }
        if let Err(error) = write_chunk(sink, chunk).await {
            warn!("failed to forward diagnostic output, no longer forwarding: {error}");
            self.sink = None;
        }
    }
}

async fn write_chunk(sink: &mut Sink, chunk: &[u8]) -> io::Result<()> {
    sink.write_all(chunk).await?;
    sink.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        pin::Pin,
        sync::{Arc, Mutex},
        task::{Context, Poll},
    };
    use tokio::io::AsyncWriteExt;

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl AsyncWrite for SharedSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct BrokenSink;

    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn prefix_is_hugging_face() {
        assert_eq!(&NO_FORWARD_PREFIX, "🤗".as_bytes());
        assert!(is_control_chunk("🤗internal".as_bytes()));
        assert!(!is_control_chunk(b"plain"));
        assert!(!is_control_chunk(&NO_FORWARD_PREFIX[..3]), "short chunks never match");
    }

    /// Writes each chunk separately, so the forwarder sees chunk boundaries.
    async fn forward_chunks(forwarder: DiagnosticForwarder, chunks: &[&[u8]]) -> Bytes {
        let (mut tx, rx) = tokio::io::duplex(CHUNK_SIZE);
        let handle = forwarder.spawn(rx);
        for chunk in chunks {
            tx.write_all(chunk).await.unwrap();
            tx.flush().await.unwrap();
            tokio::task::yield_now().await;
        }
        drop(tx);
        handle.await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn disabled_forwarder_captures_everything() {
        let captured = forward_chunks(
            DiagnosticForwarder::disabled(),
            &[b"one ", "🤗two".as_bytes()],
        )
        .await;
        assert_eq!(&captured[..], "one 🤗two".as_bytes());
    }

    #[tokio::test]
    async fn plain_chunks_are_forwarded() {
        let sink = SharedSink::default();
        let forwarder = DiagnosticForwarder::with_sink(sink.clone());
        assert!(forwarder.is_forwarding());

        let captured = forward_chunks(forwarder, &[b"warning: something\n"]).await;
        assert_eq!(&captured[..], b"warning: something\n");
        assert_eq!(&sink.0.lock().unwrap()[..], b"warning: something\n");
    }

    #[tokio::test]
    async fn control_chunk_is_suppressed() {
        let sink = SharedSink::default();
        let forwarder = DiagnosticForwarder::with_sink(sink.clone());
        let captured = forward_chunks(forwarder, &["🤗internal".as_bytes()]).await;
        assert_eq!(&captured[..], "🤗internal".as_bytes());
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broken_sink_stops_forwarding_but_keeps_draining() {
        let forwarder = DiagnosticForwarder::with_sink(BrokenSink);
        let captured = forward_chunks(forwarder, &[b"first\n", b"second\n"]).await;
        assert_eq!(&captured[..], b"first\nsecond\n");
    }
}
