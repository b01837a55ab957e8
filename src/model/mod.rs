//! Host, table and service model.
//!
//! # Data Flow
//! ```text
//! HoststateConfig (tables, hosts, services)
//!     → registry.rs (arena vectors + id indexes)
//!     → engine mutates status and flags in place
//!     → control handlers read records back out
//! ```
//!
//! # Design Decisions
//! - Relationships are ids, not pointers: a table lists host ids, a
//!   service names its primary and backup table ids
//! - Nothing is removed at runtime; hosts and tables are only flagged
//! - Services without a backup share the reserved empty table (id 0)

pub mod host;
pub mod registry;
pub mod service;
pub mod table;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use host::{Host, HostStatus};
pub use registry::Registry;
pub use service::{Protocol, Service, ServiceState};
pub use table::Table;

/// Identifier of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub u32);

/// Identifier of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(pub u32);

/// Identifier of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub u32);

impl TableId {
    /// Reserved id of the shared empty backup table.
    pub const EMPTY: TableId = TableId(0);
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Reference to an object by numeric id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Id(u32),
    Name(String),
}

impl Target {
    /// Interpret a command-line argument: digits are an id, anything else a name.
    pub fn parse(arg: &str) -> Self {
        match arg.parse::<u32>() {
            Ok(id) => Target::Id(id),
            Err(_) => Target::Name(arg.to_string()),
        }
    }

    fn matches(&self, id: u32, name: &str) -> bool {
        match self {
            Target::Id(want) => *want == id,
            Target::Name(want) => want == name,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Id(id) => write!(f, "id {}", id),
            Target::Name(name) => write!(f, "'{}'", name),
        }
    }
}
