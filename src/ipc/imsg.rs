//! imsg framing.
//!
//! ```text
//!  0               4       6       8               12              16
//! +---------------+-------+-------+---------------+---------------+------
//! |     type      |  len  | flags |    peer_id    |      pid      | data
//! +---------------+-------+-------+---------------+---------------+------
//! ```
//!
//! All fields are big-endian; `len` covers header and payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const IMSG_HEADER_SIZE: usize = 16;
pub const MAX_IMSGSIZE: usize = 16384;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImsgError {
    #[error("frame length {0} is shorter than the header")]
    Short(usize),

    #[error("frame length {0} exceeds {MAX_IMSGSIZE}")]
    Oversized(usize),

    #[error("unknown message type {0}")]
    UnknownType(u32),

    #[error("{kind} payload is {got} bytes, expected {expected}")]
    PayloadLength { kind: &'static str, got: usize, expected: usize },

    #[error("invalid host status {0}")]
    InvalidStatus(i32),
}

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imsg {
    pub kind: u32,
    pub flags: u16,
    pub peer_id: u32,
    pub pid: u32,
    pub data: Bytes,
}

impl Imsg {
    pub fn new(kind: u32, data: Bytes) -> Self {
        Self {
            kind,
            flags: 0,
            peer_id: 0,
            pid: std::process::id(),
            data,
        }
    }

    /// Append the encoded frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), ImsgError> {
        let len = IMSG_HEADER_SIZE + self.data.len();
        if len > MAX_IMSGSIZE {
            return Err(ImsgError::Oversized(len));
        }
        dst.reserve(len);
        dst.put_u32(self.kind);
        dst.put_u16(len as u16);
        dst.put_u16(self.flags);
        dst.put_u32(self.peer_id);
        dst.put_u32(self.pid);
        dst.put_slice(&self.data);
        Ok(())
    }

    /// Take one complete frame off the front of `src`.
    ///
    /// Returns `Ok(None)` until a whole frame is buffered.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Imsg>, ImsgError> {
        if src.len() < IMSG_HEADER_SIZE {
            return Ok(None);
        }
        let len = u16::from_be_bytes([src[4], src[5]]) as usize;
        if len < IMSG_HEADER_SIZE {
            return Err(ImsgError::Short(len));
        }
        if len > MAX_IMSGSIZE {
            return Err(ImsgError::Oversized(len));
        }
        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(len);
        let kind = frame.get_u32();
        let _len = frame.get_u16();
        let flags = frame.get_u16();
        let peer_id = frame.get_u32();
        let pid = frame.get_u32();
        Ok(Some(Imsg {
            kind,
            flags,
            peer_id,
            pid,
            data: frame.freeze(),
        }))
    }
}
