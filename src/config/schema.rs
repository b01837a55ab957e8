//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::Protocol;

/// Root configuration for hoststate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HoststateConfig {
    /// IPC peers and the control socket.
    pub ipc: IpcConfig,

    /// Packet-filter backend.
    pub filter: FilterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Virtual services.
    pub services: Vec<ServiceConfig>,

    /// Host tables referenced by services.
    pub tables: Vec<TableConfig>,
}

/// IPC endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Socket of the health-check engine.
    pub hce_socket: PathBuf,

    /// Socket of the parent process.
    pub parent_socket: PathBuf,

    /// Path the control socket is bound to.
    pub control_socket: PathBuf,

    /// Permission bits applied to the control socket.
    pub control_socket_mode: u32,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            hce_socket: PathBuf::from("/var/run/hoststate/hce.sock"),
            parent_socket: PathBuf::from("/var/run/hoststate/parent.sock"),
            control_socket: PathBuf::from("/var/run/hoststated.sock"),
            control_socket_mode: 0o660,
        }
    }
}

/// Which packet-filter implementation to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterBackend {
    /// Run pfctl(8).
    Pfctl,
    /// Log operations without touching the packet filter.
    Log,
}

/// Packet-filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub backend: FilterBackend,

    /// Path to the pfctl binary.
    pub pfctl_path: PathBuf,

    /// Parent anchor; each service gets `<anchor>/<service>`.
    pub anchor: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            backend: FilterBackend::Pfctl,
            pfctl_path: PathBuf::from("/sbin/pfctl"),
            anchor: "hoststated".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Virtual service definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique, non-zero service id.
    pub id: u32,

    pub name: String,

    /// Address clients connect to.
    pub virtual_address: IpAddr,

    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,

    /// Name of the primary table.
    pub table: String,

    /// Name of the backup table.
    #[serde(default)]
    pub backup_table: Option<String>,

    /// Start with the service disabled.
    #[serde(default)]
    pub disabled: bool,
}

/// Host table definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableConfig {
    /// Unique, non-zero table id.
    pub id: u32,

    pub name: String,

    /// Port on the hosts that traffic is redirected to.
    pub port: u16,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

/// Backend host definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Unique, non-zero host id.
    pub id: u32,

    /// Display name; defaults to the address.
    #[serde(default)]
    pub name: Option<String>,

    pub address: IpAddr,
}

impl HostConfig {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.address.to_string())
    }
}
