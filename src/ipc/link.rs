//! Buffered imsg links over a byte stream.
//!
//! # Responsibilities
//! - Read whatever the socket has and hand back every complete message
//! - Queue outbound messages without blocking the caller
//! - Flush the queue when the socket becomes writable
//!
//! # Design Decisions
//! - Reader and writer are split so the dispatch loop can poll both at once
//! - `read_batch` only awaits inside `read_buf`, so it is cancel-safe in `select!`
//! - Any I/O error or EOF is fatal for the link

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::error::PfeError;
use crate::ipc::imsg::Imsg;
use crate::ipc::message::Message;
use crate::ipc::Peer;

const READ_BUFFER_SIZE: usize = 4096;

/// Inbound half of a link.
pub struct LinkReader<R> {
    peer: Peer,
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> LinkReader<R> {
    pub fn new(peer: Peer, inner: R) -> Self {
        Self {
            peer,
            inner,
            buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Wait for data and return every complete message now buffered, in order.
    pub async fn read_batch(&mut self) -> Result<Vec<Message>, PfeError> {
        loop {
            let mut batch = Vec::new();
            while let Some(imsg) = Imsg::decode(&mut self.buf).map_err(|source| self.protocol(source))? {
                let msg = Message::from_imsg(&imsg).map_err(|source| self.protocol(source))?;
                batch.push(msg);
            }
            if !batch.is_empty() {
                return Ok(batch);
            }

            let n = self
                .inner
                .read_buf(&mut self.buf)
                .await
                .map_err(|source| PfeError::Io { peer: self.peer, source })?;
            if n == 0 {
                return Err(PfeError::PipeClosed(self.peer));
            }
        }
    }

    fn protocol(&self, source: crate::ipc::ImsgError) -> PfeError {
        PfeError::Protocol { peer: self.peer, source }
    }
}

/// Outbound half of a link.
pub struct LinkWriter<W> {
    peer: Peer,
    inner: W,
    buf: BytesMut,
}

impl<W: AsyncWrite + Unpin> LinkWriter<W> {
    pub fn new(peer: Peer, inner: W) -> Self {
        Self {
            peer,
            inner,
            buf: BytesMut::new(),
        }
    }

    /// Queue a message; nothing is written until `flush_some`.
    pub fn compose(&mut self, msg: &Message) -> Result<(), PfeError> {
        tracing::debug!(peer = %self.peer, kind = msg.kind().name(), "Queueing message");
        msg.to_imsg()
            .encode(&mut self.buf)
            .map_err(|source| PfeError::Protocol { peer: self.peer, source })
    }

    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Write as much of the queue as the socket accepts in one call.
    pub async fn flush_some(&mut self) -> Result<(), PfeError> {
        let n = self
            .inner
            .write(&self.buf)
            .await
            .map_err(|source| PfeError::Io { peer: self.peer, source })?;
        if n == 0 {
            return Err(PfeError::PipeClosed(self.peer));
        }
        self.buf.advance(n);
        Ok(())
    }

    /// Write the whole queue.
    pub async fn flush_all(&mut self) -> Result<(), PfeError> {
        while self.has_pending() {
            self.flush_some().await?;
        }
        self.inner
            .flush()
            .await
            .map_err(|source| PfeError::Io { peer: self.peer, source })
    }
}

/// Split a stream into the two halves of a link.
pub fn split<S>(peer: Peer, stream: S) -> (LinkReader<ReadHalf<S>>, LinkWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (read, write) = tokio::io::split(stream);
    (LinkReader::new(peer, read), LinkWriter::new(peer, write))
}
