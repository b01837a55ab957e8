//! Service, table and host registry.
//!
//! # Responsibilities
//! - Own every host, table and service for the life of the process
//! - Resolve ids and control-socket targets to entries
//! - Keep the id back-references consistent at construction

use std::collections::HashMap;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::HoststateConfig;
use crate::error::PfeError;
use crate::model::{Host, HostId, Service, ServiceId, Table, TableId, Target};

/// Arena of the whole host/table/service graph.
#[derive(Debug, Default)]
pub struct Registry {
    hosts: Vec<Host>,
    tables: Vec<Table>,
    services: Vec<Service>,
    host_index: HashMap<HostId, usize>,
    table_index: HashMap<TableId, usize>,
    service_index: HashMap<ServiceId, usize>,
}

impl Registry {
    /// Build the registry from a configuration, validating it first.
    pub fn new(config: &HoststateConfig) -> Result<Self, Vec<ValidationError>> {
        validate_config(config)?;

        let mut registry = Registry::default();
        registry.push_table(Table::empty());

        let mut by_name = HashMap::new();
        for table_config in &config.tables {
            let id = TableId(table_config.id);
            let mut table = Table::new(id, table_config.name.clone(), table_config.port);
            table.disabled = table_config.disabled;

            for host_config in &table_config.hosts {
                let host_id = HostId(host_config.id);
                table.hosts.push(host_id);
                registry.host_index.insert(host_id, registry.hosts.len());
                registry.hosts.push(Host::new(
                    host_id,
                    host_config.display_name(),
                    host_config.address,
                    id,
                ));
            }

            by_name.insert(table_config.name.as_str(), id);
            registry.push_table(table);
        }

        let mut errors = Vec::new();
        for service_config in &config.services {
            let id = ServiceId(service_config.id);
            let lookup = |name: &String| {
                by_name.get(name.as_str()).copied().ok_or_else(|| ValidationError::UnknownTable {
                    service: service_config.name.clone(),
                    table: name.clone(),
                })
            };
            let table = match lookup(&service_config.table) {
                Ok(t) => t,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            let backup = match service_config.backup_table.as_ref().map(lookup).transpose() {
                Ok(b) => b.unwrap_or(TableId::EMPTY),
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };

            for owned in [table, backup] {
                if let Some(&idx) = registry.table_index.get(&owned) {
                    if !registry.tables[idx].is_empty_table() {
                        registry.tables[idx].service = Some(id);
                    }
                }
            }

            let mut service = Service::new(
                id,
                service_config.name.clone(),
                service_config.virtual_address,
                service_config.port,
                service_config.protocol,
                table,
                backup,
            );
            service.disabled = service_config.disabled;
            registry.service_index.insert(id, registry.services.len());
            registry.services.push(service);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        tracing::debug!(
            services = registry.services.len(),
            tables = registry.tables.len() - 1,
            hosts = registry.hosts.len(),
            "Registry built"
        );
        Ok(registry)
    }

    fn push_table(&mut self, table: Table) {
        self.table_index.insert(table.id, self.tables.len());
        self.tables.push(table);
    }

    pub fn host(&self, id: HostId) -> Result<&Host, PfeError> {
        self.host_index
            .get(&id)
            .map(|&idx| &self.hosts[idx])
            .ok_or(PfeError::UnknownHost(id))
    }

    pub fn host_mut(&mut self, id: HostId) -> Result<&mut Host, PfeError> {
        match self.host_index.get(&id) {
            Some(&idx) => Ok(&mut self.hosts[idx]),
            None => Err(PfeError::UnknownHost(id)),
        }
    }

    pub fn table(&self, id: TableId) -> Result<&Table, PfeError> {
        self.table_index
            .get(&id)
            .map(|&idx| &self.tables[idx])
            .ok_or(PfeError::UnknownTable(id))
    }

    pub fn table_mut(&mut self, id: TableId) -> Result<&mut Table, PfeError> {
        match self.table_index.get(&id) {
            Some(&idx) => Ok(&mut self.tables[idx]),
            None => Err(PfeError::UnknownTable(id)),
        }
    }

    pub fn service(&self, id: ServiceId) -> Result<&Service, PfeError> {
        self.service_index
            .get(&id)
            .map(|&idx| &self.services[idx])
            .ok_or(PfeError::UnknownService(id))
    }

    pub fn service_mut(&mut self, id: ServiceId) -> Result<&mut Service, PfeError> {
        match self.service_index.get(&id) {
            Some(&idx) => Ok(&mut self.services[idx]),
            None => Err(PfeError::UnknownService(id)),
        }
    }

    /// Services in configuration order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    pub fn service_ids(&self) -> Vec<ServiceId> {
        self.services.iter().map(|s| s.id).collect()
    }

    /// Configured tables; the empty table is not included.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| !t.is_empty_table())
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.iter_mut()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    /// Member hosts of a table, in configuration order.
    pub fn table_hosts(&self, id: TableId) -> impl Iterator<Item = &Host> + '_ {
        let members = self
            .table_index
            .get(&id)
            .map(|&idx| self.tables[idx].hosts.as_slice())
            .unwrap_or(&[]);
        members
            .iter()
            .filter_map(move |h| self.host_index.get(h).map(|&idx| &self.hosts[idx]))
    }

    /// Number of member hosts whose status is up.
    pub fn count_up(&self, id: TableId) -> usize {
        self.table_hosts(id).filter(|h| h.status.is_up()).count()
    }

    pub fn find_host(&self, target: &Target) -> Option<HostId> {
        self.hosts
            .iter()
            .find(|h| target.matches(h.id.0, &h.name))
            .map(|h| h.id)
    }

    /// Resolve a table target; the empty table is never found.
    pub fn find_table(&self, target: &Target) -> Option<TableId> {
        self.tables()
            .find(|t| target.matches(t.id.0, &t.name))
            .map(|t| t.id)
    }

    pub fn find_service(&self, target: &Target) -> Option<ServiceId> {
        self.services
            .iter()
            .find(|s| target.matches(s.id.0, &s.name))
            .map(|s| s.id)
    }
}
