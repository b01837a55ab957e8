//! Backend host.
//!
//! # Responsibilities
//! - Represent a single backend server of a table
//! - Track the last status reported by the health-check engine
//! - Carry the pending add/delete marks consumed by the next table push

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::{HostId, TableId};

/// Host status as reported by the health-check engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Unknown,
    Up,
    Down,
}

impl HostStatus {
    /// Value carried in `HOST_STATUS` payloads.
    pub fn to_wire(self) -> i32 {
        match self {
            HostStatus::Up => 1,
            HostStatus::Unknown => 0,
            HostStatus::Down => -1,
        }
    }

    pub fn from_wire(val: i32) -> Option<Self> {
        match val {
            1 => Some(HostStatus::Up),
            0 => Some(HostStatus::Unknown),
            -1 => Some(HostStatus::Down),
            _ => None,
        }
    }

    pub fn is_up(self) -> bool {
        self == HostStatus::Up
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostStatus::Unknown => "unknown",
            HostStatus::Up => "up",
            HostStatus::Down => "down",
        };
        f.write_str(s)
    }
}

/// A single backend server.
#[derive(Debug, Clone)]
pub struct Host {
    pub id: HostId,
    pub name: String,
    pub address: IpAddr,
    /// Owning table.
    pub table: TableId,
    pub status: HostStatus,
    pub disabled: bool,
    /// Waiting to be added to the packet-filter table.
    pub pending_add: bool,
    /// Waiting to be removed from the packet-filter table.
    pub pending_del: bool,
    /// Definitive (up or down) reports received.
    pub check_count: u64,
    /// Reports that said up.
    pub up_count: u64,
}

impl Host {
    pub fn new(id: HostId, name: String, address: IpAddr, table: TableId) -> Self {
        Self {
            id,
            name,
            address,
            table,
            status: HostStatus::Unknown,
            disabled: false,
            pending_add: false,
            pending_del: false,
            check_count: 0,
            up_count: 0,
        }
    }

    /// Percentage of definitive checks that found the host up.
    pub fn availability(&self) -> Option<f64> {
        if self.check_count == 0 {
            return None;
        }
        Some(self.up_count as f64 * 100.0 / self.check_count as f64)
    }

    pub fn mark_add(&mut self) {
        self.pending_add = true;
        self.pending_del = false;
    }

    pub fn mark_del(&mut self) {
        self.pending_del = true;
        self.pending_add = false;
    }

    pub fn clear_pending(&mut self) {
        self.pending_add = false;
        self.pending_del = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_values() {
        assert_eq!(HostStatus::Up.to_wire(), 1);
        assert_eq!(HostStatus::Down.to_wire(), -1);
        assert_eq!(HostStatus::from_wire(0), Some(HostStatus::Unknown));
        assert_eq!(HostStatus::from_wire(2), None);
    }

    #[test]
    fn test_availability() {
        let mut host = Host::new(HostId(1), "h1".into(), "10.0.0.1".parse().unwrap(), TableId(1));
        assert_eq!(host.availability(), None);

        host.check_count = 4;
        host.up_count = 3;
        assert_eq!(host.availability(), Some(75.0));
    }

    #[test]
    fn test_pending_marks_are_exclusive() {
        let mut host = Host::new(HostId(1), "h1".into(), "10.0.0.1".parse().unwrap(), TableId(1));
        host.mark_add();
        host.mark_del();
        assert!(host.pending_del);
        assert!(!host.pending_add);
    }
}
