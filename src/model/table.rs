//! Host tables.

use super::{HostId, ServiceId, TableId};

/// A pool of hosts mirrored into one packet-filter table.
#[derive(Debug, Clone)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    /// Owning service; `None` only for the empty table.
    pub service: Option<ServiceId>,
    /// Port traffic is redirected to on member hosts.
    pub port: u16,
    pub hosts: Vec<HostId>,
    /// Number of member hosts currently up.
    pub up: usize,
    pub disabled: bool,
    /// Membership changed since the last reconciliation pass.
    pub changed: bool,
}

impl Table {
    pub fn new(id: TableId, name: String, port: u16) -> Self {
        Self {
            id,
            name,
            service: None,
            port,
            hosts: Vec::new(),
            up: 0,
            disabled: false,
            changed: false,
        }
    }

    /// The shared placeholder paired with services that have no backup.
    pub fn empty() -> Self {
        Self::new(TableId::EMPTY, "<empty>".to_string(), 0)
    }

    pub fn is_empty_table(&self) -> bool {
        self.id == TableId::EMPTY
    }
}
