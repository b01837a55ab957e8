//! Host status ingestion.

use crate::engine::{Engine, Event};
use crate::error::PfeError;
use crate::model::{HostId, HostStatus};
use crate::observability::metrics;

impl Engine {
    /// Apply a status report from the health-check engine.
    ///
    /// The table is only marked changed; the next reconciliation pass pushes
    /// the result to the packet filter.
    pub fn host_status(&mut self, id: HostId, status: HostStatus) -> Result<(), PfeError> {
        let host = self.registry.host(id)?;
        let table_id = host.table;
        let table = self.registry.table(table_id)?;

        if host.disabled || table.disabled {
            tracing::debug!(host = %id, %status, "Ignoring status for disabled host");
            return Ok(());
        }
        if host.status == status {
            tracing::debug!(host = %id, current = %host.status, "Duplicate status report");
            return Err(PfeError::Desynchronized { host: id, status });
        }

        let previous = host.status;
        let host = self.registry.host_mut(id)?;
        if status != HostStatus::Unknown {
            host.check_count += 1;
            if status.is_up() {
                host.up_count += 1;
            }
        }
        host.status = status;
        if status.is_up() {
            host.mark_add();
        } else if previous.is_up() {
            host.mark_del();
        }
        let host_name = host.name.clone();

        // unknown <-> down leaves the table alone
        let table = self.registry.table_mut(table_id)?;
        if status.is_up() {
            table.up += 1;
            table.changed = true;
        } else if previous.is_up() {
            table.up = table.up.saturating_sub(1);
            table.changed = true;
        }
        let up = table.up;
        debug_assert_eq!(up, self.registry.count_up(table_id), "cached up count drifted");

        let table = self.registry.table(table_id)?;
        metrics::record_table_up(&table.name, up);
        metrics::record_host_status(&host_name, &table.name, status.is_up());

        tracing::info!(
            host = %id,
            name = %host_name,
            table = %table.name,
            from = %previous,
            to = %status,
            up = table.up,
            "Host status changed"
        );

        self.events.push(Event::HostStatus { host: id, name: host_name, status });
        Ok(())
    }
}
