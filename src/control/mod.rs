//! Administrative control socket.
//!
//! # Data Flow
//! ```text
//! hoststatectl
//!     → UNIX socket, JSON lines
//!     → server.rs connection task (parse)
//!     → ControlCommand over mpsc
//!     → daemon dispatch loop → handlers.rs → engine
//!     → ControlResponse lines back on the same connection
//! ```

pub mod client;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use client::ControlClient;
pub use protocol::{ControlRequest, ControlResponse};
pub use server::{ControlCommand, ControlListener};
