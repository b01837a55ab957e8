//! Packet-filter synchronization backends.
//!
//! # Responsibilities
//! - Add and remove host addresses in a service's table
//! - Load and unload a service's redirection ruleset
//!
//! # Design Decisions
//! - The engine computes what must change; backends only apply it
//! - Calls are synchronous: a reconciliation pass completes before the
//!   dispatch loop polls again
//! - Each service lives in its own anchor so it can be flushed alone

pub mod log;
pub mod pfctl;

use std::net::IpAddr;
use std::process::ExitStatus;

use thiserror::Error;

use crate::config::schema::FilterBackend;
use crate::config::FilterConfig;
use crate::model::{Protocol, Service, Table};

pub use log::LogFilter;
pub use pfctl::Pfctl;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// What a backend needs to know about the service it is changing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTarget {
    /// Service name; also the name of its packet-filter table.
    pub service: String,
    pub address: IpAddr,
    pub port: u16,
    pub protocol: Protocol,
    /// Port on the backend hosts.
    pub target_port: u16,
}

impl FilterTarget {
    pub fn new(service: &Service, primary: &Table) -> Self {
        Self {
            service: service.name.clone(),
            address: service.address,
            port: service.port,
            protocol: service.protocol,
            target_port: primary.port,
        }
    }
}

/// Operations the engine performs on the packet filter.
pub trait PacketFilter: Send {
    fn add_host(&mut self, target: &FilterTarget, address: IpAddr) -> Result<(), FilterError>;

    fn remove_host(&mut self, target: &FilterTarget, address: IpAddr) -> Result<(), FilterError>;

    /// Remove every address from the service's table.
    fn flush_table(&mut self, target: &FilterTarget) -> Result<(), FilterError>;

    fn activate_ruleset(&mut self, target: &FilterTarget) -> Result<(), FilterError>;

    fn deactivate_ruleset(&mut self, target: &FilterTarget) -> Result<(), FilterError>;
}

/// Build the configured backend.
pub fn from_config(config: &FilterConfig) -> Box<dyn PacketFilter> {
    match config.backend {
        FilterBackend::Pfctl => Box::new(Pfctl::new(config.pfctl_path.clone(), config.anchor.clone())),
        FilterBackend::Log => Box::new(LogFilter::new(config.anchor.clone())),
    }
}
