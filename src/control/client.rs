//! Client side of the control socket, used by `hoststatectl`.

use std::io;
use std::path::Path;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use crate::control::protocol::{ControlRequest, ControlResponse};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("control socket: {0}")]
    Io(#[from] io::Error),

    #[error("malformed reply: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct ControlClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl ControlClient {
    pub async fn connect(path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path).await?;
        let (read, write) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(read).lines(),
            write,
        })
    }

    pub async fn send(&mut self, request: &ControlRequest) -> Result<(), ClientError> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        self.write.write_all(&line).await?;
        Ok(())
    }

    /// Next reply, or `None` once the daemon closes the connection.
    pub async fn recv(&mut self) -> Result<Option<ControlResponse>, ClientError> {
        match self.lines.next_line().await? {
            Some(line) => Ok(Some(serde_json::from_str(&line)?)),
            None => Ok(None),
        }
    }

    /// Send `show` and collect records up to the end marker.
    pub async fn show(&mut self) -> Result<Vec<ControlResponse>, ClientError> {
        self.send(&ControlRequest::Show).await?;
        let mut records = Vec::new();
        while let Some(response) = self.recv().await? {
            if response == ControlResponse::End {
                break;
            }
            records.push(response);
        }
        Ok(records)
    }
}
