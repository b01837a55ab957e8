//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build registry → Connect hce/parent → Bind control socket
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop dispatch → Remove PF state → Close control clients
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → End the dispatch loop
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then engine, then peers and control socket
//! - Fail fast: any startup error is fatal
//! - Packet-filter cleanup on exit is best effort

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::Signals;
