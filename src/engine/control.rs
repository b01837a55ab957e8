//! Administrative enable/disable of services, tables and hosts.
//!
//! Every operation is a no-op when the object is already in the requested
//! state: no flags change, no peer is notified and no pass runs.

use thiserror::Error;

use crate::engine::Engine;
use crate::error::PfeError;
use crate::ipc::Message;
use crate::model::{HostStatus, TableId, Target};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ControlError {
    /// The operator named something that does not exist.
    #[error("no such {kind}: {target}")]
    NotFound { kind: &'static str, target: Target },

    #[error(transparent)]
    Fatal(#[from] PfeError),
}

impl Engine {
    pub fn disable_service(&mut self, target: &Target) -> Result<(), ControlError> {
        let id = self
            .registry
            .find_service(target)
            .ok_or_else(|| ControlError::NotFound { kind: "service", target: target.clone() })?;
        let service = self.registry.service_mut(id)?;
        if service.disabled {
            return Ok(());
        }
        service.disabled = true;
        service.pending_add = false;
        service.pending_del = true;
        let primary = service.table;
        tracing::info!(service = %id, name = %service.name, "Service disabled");

        self.set_table_disabled(primary)?;
        self.sync()?;
        Ok(())
    }

    pub fn enable_service(&mut self, target: &Target) -> Result<(), ControlError> {
        let id = self
            .registry
            .find_service(target)
            .ok_or_else(|| ControlError::NotFound { kind: "service", target: target.clone() })?;
        let service = self.registry.service_mut(id)?;
        if !service.disabled {
            return Ok(());
        }
        service.disabled = false;
        service.pending_del = false;
        service.pending_add = true;
        let tables = [service.table, service.backup];
        tracing::info!(service = %id, name = %service.name, "Service enabled");

        for table in tables {
            if table != TableId::EMPTY {
                self.set_table_enabled(table)?;
                self.registry.table_mut(table)?.changed = true;
            }
        }
        self.sync()?;
        Ok(())
    }

    pub fn disable_table(&mut self, target: &Target) -> Result<(), ControlError> {
        let id = self
            .registry
            .find_table(target)
            .ok_or_else(|| ControlError::NotFound { kind: "table", target: target.clone() })?;
        if self.set_table_disabled(id)? {
            self.sync()?;
        }
        Ok(())
    }

    pub fn enable_table(&mut self, target: &Target) -> Result<(), ControlError> {
        let id = self
            .registry
            .find_table(target)
            .ok_or_else(|| ControlError::NotFound { kind: "table", target: target.clone() })?;
        if self.set_table_enabled(id)? {
            self.sync()?;
        }
        Ok(())
    }

    pub fn disable_host(&mut self, target: &Target) -> Result<(), ControlError> {
        let id = self
            .registry
            .find_host(target)
            .ok_or_else(|| ControlError::NotFound { kind: "host", target: target.clone() })?;
        let host = self.registry.host(id)?;
        if host.disabled {
            return Ok(());
        }
        let was_up = host.status.is_up();
        let table_id = host.table;

        if was_up {
            let table = self.registry.table_mut(table_id)?;
            table.up = table.up.saturating_sub(1);
            table.changed = true;
            metrics::record_table_up(&table.name, table.up);
        }
        let host = self.registry.host_mut(id)?;
        host.status = HostStatus::Unknown;
        host.disabled = true;
        host.mark_del();
        tracing::info!(host = %id, name = %host.name, "Host disabled");

        self.hce_outbox.push(Message::HostDisable(id));
        self.sync()?;
        Ok(())
    }

    pub fn enable_host(&mut self, target: &Target) -> Result<(), ControlError> {
        let id = self
            .registry
            .find_host(target)
            .ok_or_else(|| ControlError::NotFound { kind: "host", target: target.clone() })?;
        let host = self.registry.host_mut(id)?;
        if !host.disabled {
            return Ok(());
        }
        host.status = HostStatus::Unknown;
        host.disabled = false;
        host.clear_pending();
        tracing::info!(host = %id, name = %host.name, "Host enabled");

        self.hce_outbox.push(Message::HostEnable(id));
        self.sync()?;
        Ok(())
    }

    /// Returns false when the table was already disabled.
    fn set_table_disabled(&mut self, id: TableId) -> Result<bool, PfeError> {
        let table = self.registry.table_mut(id)?;
        if table.disabled {
            return Ok(false);
        }
        table.disabled = true;
        table.changed = true;
        table.up = 0;
        metrics::record_table_up(&table.name, 0);
        tracing::info!(table = %id, name = %table.name, "Table disabled");

        let members = table.hosts.clone();
        for host in members {
            let host = self.registry.host_mut(host)?;
            if host.status.is_up() {
                host.mark_del();
            }
            host.status = HostStatus::Unknown;
        }
        self.hce_outbox.push(Message::TableDisable(id));
        Ok(true)
    }

    /// Returns false when the table was already enabled.
    fn set_table_enabled(&mut self, id: TableId) -> Result<bool, PfeError> {
        let table = self.registry.table_mut(id)?;
        if !table.disabled {
            return Ok(false);
        }
        table.disabled = false;
        table.changed = true;
        table.up = 0;
        tracing::info!(table = %id, name = %table.name, "Table enabled");

        let members = table.hosts.clone();
        for host in members {
            self.registry.host_mut(host)?.status = HostStatus::Unknown;
        }
        self.hce_outbox.push(Message::TableEnable(id));
        Ok(true)
    }
}
