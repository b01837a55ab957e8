//! Inter-process messaging with the health-check engine and the parent.
//!
//! # Data Flow
//! ```text
//! hce / parent socket
//!     → link.rs LinkReader (buffer bytes)
//!     → imsg.rs (split frames)
//!     → message.rs (typed Message)
//!     → daemon dispatch
//!
//! engine outbox
//!     → link.rs LinkWriter (queue encoded frames)
//!     → flushed when the socket is writable
//! ```
//!
//! # Design Decisions
//! - Framing follows the imsg header layout: type, length, flags, peer id, pid
//! - Peers are trusted; a malformed frame ends the process

pub mod imsg;
pub mod link;
pub mod message;

use std::fmt;

pub use imsg::{Imsg, ImsgError};
pub use link::{split, LinkReader, LinkWriter};
pub use message::{Message, MessageKind};

/// The process at the other end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    /// Health-check engine.
    Hce,
    Parent,
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Hce => f.write_str("hce"),
            Peer::Parent => f.write_str("parent"),
        }
    }
}
