//! Virtual services.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::{ServiceId, TableId};

/// Which table, if any, currently backs a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Primary table has at least one host up.
    Primary,
    /// Primary is empty, backup has hosts up.
    Backup,
    /// Disabled, or neither table has a host up.
    Down,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Primary => "active",
            ServiceState::Backup => "backup",
            ServiceState::Down => "down",
        };
        f.write_str(s)
    }
}

/// Transport protocol of the redirection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// A virtual endpoint backed by a primary and a backup table.
#[derive(Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub address: IpAddr,
    pub port: u16,
    pub protocol: Protocol,
    /// Primary table.
    pub table: TableId,
    /// Backup table, `TableId::EMPTY` when none is configured.
    pub backup: TableId,
    pub state: ServiceState,
    pub disabled: bool,
    pub pending_add: bool,
    pub pending_del: bool,
    /// Redirection ruleset is loaded into the packet filter.
    pub ruleset_active: bool,
    /// Addresses currently present in the packet-filter table.
    pub installed: BTreeSet<IpAddr>,
}

impl Service {
    pub fn new(
        id: ServiceId,
        name: String,
        address: IpAddr,
        port: u16,
        protocol: Protocol,
        table: TableId,
        backup: TableId,
    ) -> Self {
        Self {
            id,
            name,
            address,
            port,
            protocol,
            table,
            backup,
            state: ServiceState::Down,
            disabled: false,
            pending_add: false,
            pending_del: false,
            ruleset_active: false,
            installed: BTreeSet::new(),
        }
    }

    pub fn has_backup(&self) -> bool {
        self.backup != TableId::EMPTY
    }
}
