//! Reconciliation of health state into the packet filter.

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::engine::{Engine, Event};
use crate::error::PfeError;
use crate::filter::FilterTarget;
use crate::model::{ServiceId, ServiceState, TableId};
use crate::observability::metrics;

impl Engine {
    /// Run one reconciliation pass over every service.
    pub fn sync(&mut self) -> Result<(), PfeError> {
        for id in self.registry.service_ids() {
            self.sync_service(id)?;
        }
        for table in self.registry.tables_mut() {
            table.changed = false;
        }
        Ok(())
    }

    fn sync_service(&mut self, id: ServiceId) -> Result<(), PfeError> {
        let service = self.registry.service(id)?;
        let primary = self.registry.table(service.table)?;
        let backup = self.registry.table(service.backup)?;

        let (state, active) = if service.disabled || (primary.up == 0 && backup.up == 0) {
            (ServiceState::Down, None)
        } else if primary.up == 0 {
            (ServiceState::Backup, Some(backup.id))
        } else {
            (ServiceState::Primary, Some(primary.id))
        };
        let primary_changed = primary.changed;
        let backup_id = backup.id;
        let previous = service.state;
        let ruleset_active = service.ruleset_active;
        let name = service.name.clone();

        if state == ServiceState::Backup && primary_changed {
            self.registry.table_mut(backup_id)?.changed = true;
        }
        if state != previous {
            tracing::info!(service = %id, name = %name, from = %previous, to = %state, "Service state changed");
            metrics::record_service_state(&name, state);
        }
        self.registry.service_mut(id)?.state = state;

        if let Some(active) = active {
            let table = self.registry.table(active)?;
            // a state change may leave stale or no addresses installed
            if table.changed || state != previous {
                let event = Event::TableChanged { table: active, name: table.name.clone(), up: table.up };
                self.sync_table(id, active)?;
                self.events.push(event);
            }
        }

        if state == ServiceState::Down {
            if ruleset_active {
                self.flush_service(id)?;
                tracing::debug!(service = %name, "Disabling ruleset");
                let target = self.filter_target(id)?;
                self.filter.deactivate_ruleset(&target)?;
                metrics::record_filter_op("deactivate_ruleset");
                self.registry.service_mut(id)?.ruleset_active = false;
                self.events.push(Event::RulesetPulled { service: id, name });
            }
        } else if !ruleset_active {
            tracing::debug!(service = %name, "Enabling ruleset");
            let target = self.filter_target(id)?;
            self.filter.activate_ruleset(&target)?;
            metrics::record_filter_op("activate_ruleset");
            self.registry.service_mut(id)?.ruleset_active = true;
            self.events.push(Event::RulesetPushed { service: id, name });
        }
        Ok(())
    }

    /// Bring the service's packet-filter table in line with `table`'s up hosts.
    fn sync_table(&mut self, id: ServiceId, table: TableId) -> Result<(), PfeError> {
        let wanted: BTreeSet<IpAddr> = self
            .registry
            .table_hosts(table)
            .filter(|h| !h.disabled && h.status.is_up())
            .map(|h| h.address)
            .collect();
        let installed = self.registry.service(id)?.installed.clone();
        let target = self.filter_target(id)?;

        for address in installed.difference(&wanted) {
            self.filter.remove_host(&target, *address)?;
            metrics::record_filter_op("remove_host");
        }
        for address in wanted.difference(&installed) {
            self.filter.add_host(&target, *address)?;
            metrics::record_filter_op("add_host");
        }
        tracing::debug!(
            service = %target.service,
            table = %table,
            added = wanted.difference(&installed).count(),
            removed = installed.difference(&wanted).count(),
            "Table synced"
        );

        self.registry.service_mut(id)?.installed = wanted;
        let members = self.registry.table(table)?.hosts.clone();
        for host in members {
            self.registry.host_mut(host)?.clear_pending();
        }
        Ok(())
    }

    fn flush_service(&mut self, id: ServiceId) -> Result<(), PfeError> {
        let target = self.filter_target(id)?;
        self.filter.flush_table(&target)?;
        metrics::record_filter_op("flush_table");
        self.registry.service_mut(id)?.installed.clear();
        Ok(())
    }

    fn filter_target(&self, id: ServiceId) -> Result<FilterTarget, PfeError> {
        let service = self.registry.service(id)?;
        let primary = self.registry.table(service.table)?;
        Ok(FilterTarget::new(service, primary))
    }

    /// Remove everything this process installed in the packet filter.
    ///
    /// Failures are logged and the remaining services are still attempted.
    pub fn shutdown(&mut self) {
        for id in self.registry.service_ids() {
            let Ok(service) = self.registry.service(id) else { continue };
            if !service.ruleset_active && service.installed.is_empty() {
                continue;
            }
            let name = service.name.clone();
            if let Err(e) = self.flush_service(id) {
                tracing::warn!(service = %name, error = %e, "Failed to flush table");
            }
            let result = self
                .filter_target(id)
                .and_then(|target| self.filter.deactivate_ruleset(&target).map_err(PfeError::from));
            match result {
                Ok(()) => {
                    if let Ok(service) = self.registry.service_mut(id) {
                        service.ruleset_active = false;
                    }
                    tracing::info!(service = %name, "Ruleset removed");
                }
                Err(e) => tracing::warn!(service = %name, error = %e, "Failed to remove ruleset"),
            }
        }
    }
}
