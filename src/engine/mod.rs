//! Packet-filter engine.
//!
//! # Data Flow
//! ```text
//! HOST_STATUS (hce)
//!     → status.rs (host status, table up-count, changed flag)
//!
//! SYNC (hce / parent), control enable/disable
//!     → sync.rs (pick active table per service)
//!     → PacketFilter (table diff, ruleset load/unload)
//!
//! control enable/disable
//!     → control.rs (flags, hce notifications)
//!     → sync.rs
//! ```
//!
//! # Design Decisions
//! - The engine is the only owner of the registry; it never does I/O on links
//! - Messages for peers and monitor events are queued and drained by the
//!   dispatch loop after each handler
//! - Every error returned from here is fatal except `ControlError::NotFound`

mod control;
mod status;
mod sync;

use serde::{Deserialize, Serialize};

use crate::filter::PacketFilter;
use crate::ipc::Message;
use crate::model::{HostId, HostStatus, Registry, ServiceId, TableId};

pub use control::ControlError;

/// State change broadcast to monitoring control clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    HostStatus { host: HostId, name: String, status: HostStatus },
    TableChanged { table: TableId, name: String, up: usize },
    RulesetPushed { service: ServiceId, name: String },
    RulesetPulled { service: ServiceId, name: String },
}

/// Engine context: registry, packet filter and outbound queues.
pub struct Engine {
    registry: Registry,
    filter: Box<dyn PacketFilter>,
    hce_outbox: Vec<Message>,
    parent_outbox: Vec<Message>,
    events: Vec<Event>,
}

impl Engine {
    pub fn new(registry: Registry, filter: Box<dyn PacketFilter>) -> Self {
        Self {
            registry,
            filter,
            hce_outbox: Vec::new(),
            parent_outbox: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Ask the parent to reload its configuration.
    pub fn request_reload(&mut self) {
        tracing::info!("Forwarding reload request to parent");
        self.parent_outbox.push(Message::Reload);
    }

    /// Messages queued for the health-check engine, oldest first.
    pub fn take_hce_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.hce_outbox)
    }

    pub fn take_parent_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.parent_outbox)
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
