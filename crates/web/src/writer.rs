//! Entity writers and the body sinks they write into
//!
//! A writer turns an entity returned by a resource method into response
//! bytes. Blocking writers get a [`BlockingSink`] implementing
//! [`std::io::Write`] and always run on the blocking pool; async writers get
//! an [`AsyncSink`] whose writes suspend while the body channel is full.

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use asyncio_common::{Result, ServerConfig};

/// One chunk of a streaming response body
pub type Chunk = io::Result<Bytes>;

/// Create a bounded body channel and the streaming body that drains it.
pub fn body_channel(capacity: usize) -> (mpsc::Sender<Chunk>, Body) {
    let (tx, rx) = mpsc::channel(capacity);
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    (tx, Body::from_stream(stream))
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

/// Non-blocking sink handed to [`AsyncEntityWriter`]s
pub struct AsyncSink {
    tx: mpsc::Sender<Chunk>,
    written: usize,
}

impl AsyncSink {
    pub fn new(tx: mpsc::Sender<Chunk>) -> Self {
        Self { tx, written: 0 }
    }

    /// Queue `buf` for the connection, waiting for channel capacity.
    pub async fn write(&mut self, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Ok(Bytes::copy_from_slice(buf)))
            .await
            .map_err(|_| broken_pipe())?;
        self.written += buf.len();
        Ok(())
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    /// Terminate the body with an error so the connection is not left looking complete.
    ///
    /// Waits for channel capacity; only a disconnected client drops the error.
    pub(crate) async fn abort(self, reason: &str) {
        if self
            .tx
            .send(Err(io::Error::other(reason.to_string())))
            .await
            .is_err()
        {
            debug!("client already gone, dropping body error: {}", reason);
        }
    }
}

/// Blocking sink handed to [`BlockingEntityWriter`]s.
///
/// Must only be used off the async runtime threads.
pub struct BlockingSink {
    tx: mpsc::Sender<Chunk>,
    written: usize,
}

impl BlockingSink {
    pub fn new(tx: mpsc::Sender<Chunk>) -> Self {
        Self { tx, written: 0 }
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    /// Blocking counterpart of [`AsyncSink::abort`].
    pub(crate) fn abort(self, reason: &str) {
        if self
            .tx
            .blocking_send(Err(io::Error::other(reason.to_string())))
            .is_err()
        {
            debug!("client already gone, dropping body error: {}", reason);
        }
    }
}

impl Write for BlockingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| broken_pipe())?;
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes an entity with blocking I/O
pub trait BlockingEntityWriter<T>: Send + Sync + 'static {
    fn write_to(&self, entity: T, sink: &mut BlockingSink) -> Result<()>;
}

/// Writes an entity with non-blocking I/O
#[async_trait]
pub trait AsyncEntityWriter<T: Send + 'static>: Send + Sync + 'static {
    async fn write_to(&self, entity: T, sink: &mut AsyncSink) -> Result<()>;
}

/// Entity rendered by [`BlockingWriter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockingWriterData;

/// Entity rendered by [`AsyncWriter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AsyncWriterData {
    /// Write the body in two halves with a pause in between
    pub slow: bool,
}

impl AsyncWriterData {
    pub fn slow() -> Self {
        Self { slow: true }
    }
}

/// Writes `OK` with a single blocking write
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingWriter;

impl BlockingEntityWriter<BlockingWriterData> for BlockingWriter {
    fn write_to(&self, _entity: BlockingWriterData, sink: &mut BlockingSink) -> Result<()> {
        sink.write_all(b"OK")?;
        sink.flush()?;
        Ok(())
    }
}

/// Writes `OK` asynchronously, optionally as `O`, pause, `K`
#[derive(Debug, Clone, Copy)]
pub struct AsyncWriter {
    slow_delay: Duration,
}

impl AsyncWriter {
    pub fn new(slow_delay: Duration) -> Self {
        Self { slow_delay }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.slow_write_delay())
    }
}

impl Default for AsyncWriter {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

#[async_trait]
impl AsyncEntityWriter<AsyncWriterData> for AsyncWriter {
    async fn write_to(&self, entity: AsyncWriterData, sink: &mut AsyncSink) -> Result<()> {
        if entity.slow {
            sink.write(b"O").await?;
            tokio::time::sleep(self.slow_delay).await;
            sink.write(b"K").await?;
        } else {
            sink.write(b"OK").await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    async fn drain(mut rx: mpsc::Receiver<Chunk>) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk.unwrap());
        }
        chunks
    }

    #[tokio::test]
    async fn test_async_writer_single_write() {
        let (tx, rx) = mpsc::channel(4);
        let mut sink = AsyncSink::new(tx);
        AsyncWriter::default()
            .write_to(AsyncWriterData::default(), &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.bytes_written(), 2);
        drop(sink);

        assert_eq!(drain(rx).await, vec![Bytes::from_static(b"OK")]);
    }

    #[tokio::test]
    async fn test_slow_async_writer_splits_and_pauses() {
        let (tx, rx) = mpsc::channel(4);
        let mut sink = AsyncSink::new(tx);
        let start = Instant::now();
        AsyncWriter::new(Duration::from_millis(50))
            .write_to(AsyncWriterData::slow(), &mut sink)
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
        drop(sink);

        assert_eq!(
            drain(rx).await,
            vec![Bytes::from_static(b"O"), Bytes::from_static(b"K")]
        );
    }

    #[tokio::test]
    async fn test_blocking_writer_on_blocking_pool() {
        let (tx, rx) = mpsc::channel(4);
        let written = tokio::task::spawn_blocking(move || {
            let mut sink = BlockingSink::new(tx);
            BlockingWriter.write_to(BlockingWriterData, &mut sink).unwrap();
            sink.bytes_written()
        })
        .await
        .unwrap();
        assert_eq!(written, 2);
        assert_eq!(drain(rx).await, vec![Bytes::from_static(b"OK")]);
    }

    #[tokio::test]
    async fn test_write_after_disconnect_is_broken_pipe() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut sink = AsyncSink::new(tx);
        let err = sink.write(b"OK").await.unwrap_err();
        assert!(err.is_disconnect());
        assert_eq!(sink.bytes_written(), 0);
    }
}
