//! Host-state packet-filter engine.
//!
//! Keeps the packet filter in step with backend health: hosts are reported up
//! or down by the health-check engine, and each service is pointed at its
//! primary table, its backup table, or nothing.

pub mod config;
pub mod control;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ipc;
pub mod lifecycle;
pub mod model;
pub mod observability;

pub use config::HoststateConfig;
pub use daemon::Daemon;
pub use engine::{Engine, Event};
pub use error::PfeError;
pub use lifecycle::Shutdown;
