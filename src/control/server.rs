//! Control socket listener and per-connection tasks.
//!
//! # Responsibilities
//! - Bind the UNIX control socket with the configured permissions
//! - Parse request lines and forward them to the dispatch loop
//! - Write replies back as they arrive (including monitor events)
//!
//! # Design Decisions
//! - Connection tasks never touch engine state; they only talk to the
//!   dispatch loop over channels
//! - A malformed line gets a `fail` reply; the connection stays open
//! - After the client stops writing, every outstanding request is still
//!   answered before the connection closes
//! - Request lines are capped at `MAX_REQUEST_LINE` bytes

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};

use crate::control::protocol::{ControlRequest, ControlResponse};

/// Longest accepted request line, newline excluded.
pub const MAX_REQUEST_LINE: usize = 16384;

/// A request on its way from a connection task to the dispatch loop.
#[derive(Debug)]
pub struct ControlCommand {
    pub conn: u64,
    pub request: ControlRequest,
    pub reply: mpsc::UnboundedSender<ControlResponse>,
}

/// The bound control socket. The socket file is removed on drop.
#[derive(Debug)]
pub struct ControlListener {
    inner: UnixListener,
    path: PathBuf,
}

impl ControlListener {
    pub fn bind(path: &Path, mode: u32) -> io::Result<Self> {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed stale control socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let inner = UnixListener::bind(path)?;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        tracing::info!(path = %path.display(), mode = %format!("{:o}", mode), "Control socket bound");

        Ok(Self {
            inner,
            path: path.to_path_buf(),
        })
    }

    pub async fn accept(&self) -> io::Result<UnixStream> {
        let (stream, _) = self.inner.accept().await?;
        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Newline-delimited reader with a line length cap.
struct RequestReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(1024),
        }
    }

    /// Next line without its newline, or `None` at EOF.
    ///
    /// Cancel-safe: partial lines stay buffered between calls. An
    /// unterminated line at EOF is returned as the last line.
    async fn next_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line = self.buf.split_to(pos + 1);
                line.truncate(pos);
                return Self::check(line).map(Some);
            }
            if self.buf.len() > MAX_REQUEST_LINE {
                return Err(too_long());
            }

            if self.inner.read_buf(&mut self.buf).await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let line = self.buf.split();
                return Self::check(line).map(Some);
            }
        }
    }

    fn check(line: BytesMut) -> io::Result<Bytes> {
        if line.len() > MAX_REQUEST_LINE {
            return Err(too_long());
        }
        Ok(line.freeze())
    }
}

fn too_long() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "request line too long")
}

/// Serve one control connection until EOF, error or shutdown.
pub async fn serve_connection(
    conn: u64,
    stream: UnixStream,
    commands: mpsc::UnboundedSender<ControlCommand>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::debug!(conn, "Control connection opened");

    let (read, mut write) = stream.into_split();
    let mut requests = RequestReader::new(read);
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let mut reading = true;
    // requests whose final reply has not been written yet
    let mut pending = 0usize;

    loop {
        tokio::select! {
            line = requests.next_line(), if reading => match line {
                Ok(Some(line)) => {
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    pending += 1;
                    match serde_json::from_slice::<ControlRequest>(&line) {
                        Ok(request) => {
                            let command = ControlCommand { conn, request, reply: reply_tx.clone() };
                            if commands.send(command).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = reply_tx.send(ControlResponse::Fail { reason: format!("invalid request: {}", e) });
                        }
                    }
                }
                Ok(None) => reading = false,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    tracing::warn!(conn, error = %e, "Rejecting control request");
                    pending += 1;
                    let _ = reply_tx.send(ControlResponse::Fail { reason: e.to_string() });
                    reading = false;
                }
                Err(e) => {
                    tracing::debug!(conn, error = %e, "Control read failed");
                    break;
                }
            },
            Some(response) = reply_rx.recv() => {
                let last = response.is_final();
                if let Err(e) = write_response(&mut write, &response).await {
                    tracing::debug!(conn, error = %e, "Control write failed");
                    break;
                }
                if last {
                    pending = pending.saturating_sub(1);
                }
            }
            _ = shutdown.recv() => break,
        }

        if !reading && pending == 0 {
            break;
        }
    }

    tracing::debug!(conn, "Control connection closed");
}

async fn write_response<W>(write: &mut W, response: &ControlResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    write.write_all(&line).await
}
