//! Fatal error conditions.
//!
//! Every variant of [`PfeError`] means the daemon cannot continue: the
//! dispatch loop propagates it to `main`, which logs it and exits non-zero.
//! Recoverable operator mistakes on the control socket are
//! [`crate::engine::ControlError::NotFound`] instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::filter::FilterError;
use crate::ipc::{ImsgError, Peer};
use crate::model::{HostId, HostStatus, ServiceId, TableId};

#[derive(Debug, Error)]
pub enum PfeError {
    #[error("invalid host id {0}")]
    UnknownHost(HostId),

    #[error("invalid table id {0}")]
    UnknownTable(TableId),

    #[error("invalid service id {0}")]
    UnknownService(ServiceId),

    /// The health-check engine repeated a status it already reported.
    #[error("desynchronized: host {host} is already {status}")]
    Desynchronized { host: HostId, status: HostStatus },

    #[error("{0} pipe closed")]
    PipeClosed(Peer),

    #[error("{peer} link: {source}")]
    Io {
        peer: Peer,
        #[source]
        source: io::Error,
    },

    #[error("cannot connect to {peer} at {}: {source}", .path.display())]
    Connect {
        peer: Peer,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{peer} link: {source}")]
    Protocol {
        peer: Peer,
        #[source]
        source: ImsgError,
    },

    #[error("packet filter: {0}")]
    Filter(#[from] FilterError),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("control socket {}: {source}", .path.display())]
    ControlSocket {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("metrics exporter: {0}")]
    Metrics(String),
}
