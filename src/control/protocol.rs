//! Control socket wire format: one JSON object per line.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::engine::Event;
use crate::model::{HostId, HostStatus, ServiceId, ServiceState, TableId, Target};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Dump every service, table and host.
    Show,
    ServiceEnable { target: Target },
    ServiceDisable { target: Target },
    TableEnable { target: Target },
    TableDisable { target: Target },
    HostEnable { target: Target },
    HostDisable { target: Target },
    /// Ask the parent process to reload.
    Reload,
    /// Stream engine events on this connection.
    Monitor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlResponse {
    Service(ServiceRecord),
    Table(TableRecord),
    Host(HostRecord),
    /// Terminates a `show` dump.
    End,
    Ok,
    Fail { reason: String },
    Event(Event),
}

impl ControlResponse {
    /// Last reply to a request. Records and events are not.
    pub fn is_final(&self) -> bool {
        matches!(self, ControlResponse::End | ControlResponse::Ok | ControlResponse::Fail { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableRole {
    Primary,
    Backup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: ServiceId,
    pub name: String,
    pub address: IpAddr,
    pub port: u16,
    pub state: ServiceState,
    pub disabled: bool,
    pub ruleset_active: bool,
    pub table: TableId,
    pub backup: Option<TableId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    pub id: TableId,
    pub name: String,
    pub service: Option<ServiceId>,
    pub role: TableRole,
    pub port: u16,
    pub up: usize,
    pub hosts: usize,
    pub disabled: bool,
    /// This table currently backs its service.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    pub id: HostId,
    pub name: String,
    pub address: IpAddr,
    pub table: TableId,
    pub status: HostStatus,
    pub disabled: bool,
    pub check_count: u64,
    pub up_count: u64,
    pub availability: Option<f64>,
}
