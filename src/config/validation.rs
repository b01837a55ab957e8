//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (services reference existing tables)
//! - Ids are non-zero and unique per kind, names unique per kind
//! - A table backs at most one service, in one role
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HoststateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;

use crate::config::schema::HoststateConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    ZeroId { kind: &'static str, name: String },
    DuplicateId { kind: &'static str, id: u32 },
    DuplicateName { kind: &'static str, name: String },
    DuplicateAddress { table: String, address: IpAddr },
    UnknownTable { service: String, table: String },
    SameBackup { service: String },
    TableReused { table: String },
    UnusedTable { table: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ZeroId { kind, name } => {
                write!(f, "{} '{}' has id 0, which is reserved", kind, name)
            }
            ValidationError::DuplicateId { kind, id } => write!(f, "duplicate {} id {}", kind, id),
            ValidationError::DuplicateName { kind, name } => {
                write!(f, "duplicate {} name '{}'", kind, name)
            }
            ValidationError::DuplicateAddress { table, address } => {
                write!(f, "table '{}' lists {} twice", table, address)
            }
            ValidationError::UnknownTable { service, table } => {
                write!(f, "service '{}' references unknown table '{}'", service, table)
            }
            ValidationError::SameBackup { service } => {
                write!(f, "service '{}' uses the same table as primary and backup", service)
            }
            ValidationError::TableReused { table } => {
                write!(f, "table '{}' is used by more than one service", table)
            }
            ValidationError::UnusedTable { table } => {
                write!(f, "table '{}' is not used by any service", table)
            }
        }
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &HoststateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut service_ids = HashSet::new();
    let mut service_names = HashSet::new();
    for service in &config.services {
        if service.id == 0 {
            errors.push(ValidationError::ZeroId { kind: "service", name: service.name.clone() });
        }
        if !service_ids.insert(service.id) {
            errors.push(ValidationError::DuplicateId { kind: "service", id: service.id });
        }
        if !service_names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateName { kind: "service", name: service.name.clone() });
        }
    }

    let mut table_ids = HashSet::new();
    let mut table_names = HashSet::new();
    let mut host_ids = HashSet::new();
    let mut host_names = HashSet::new();
    for table in &config.tables {
        if table.id == 0 {
            errors.push(ValidationError::ZeroId { kind: "table", name: table.name.clone() });
        }
        if !table_ids.insert(table.id) {
            errors.push(ValidationError::DuplicateId { kind: "table", id: table.id });
        }
        if !table_names.insert(table.name.as_str()) {
            errors.push(ValidationError::DuplicateName { kind: "table", name: table.name.clone() });
        }

        let mut addresses = HashSet::new();
        for host in &table.hosts {
            let name = host.display_name();
            if host.id == 0 {
                errors.push(ValidationError::ZeroId { kind: "host", name: name.clone() });
            }
            if !host_ids.insert(host.id) {
                errors.push(ValidationError::DuplicateId { kind: "host", id: host.id });
            }
            if !host_names.insert(name.clone()) {
                errors.push(ValidationError::DuplicateName { kind: "host", name });
            }
            if !addresses.insert(host.address) {
                errors.push(ValidationError::DuplicateAddress {
                    table: table.name.clone(),
                    address: host.address,
                });
            }
        }
    }

    // table name -> number of references from services
    let mut uses: HashMap<&str, usize> = HashMap::new();
    for service in &config.services {
        let referenced = std::iter::once(&service.table).chain(service.backup_table.as_ref());
        for table in referenced {
            if !table_names.contains(table.as_str()) {
                errors.push(ValidationError::UnknownTable {
                    service: service.name.clone(),
                    table: table.clone(),
                });
            }
        }
        if service.backup_table.as_deref() == Some(service.table.as_str()) {
            errors.push(ValidationError::SameBackup { service: service.name.clone() });
            *uses.entry(service.table.as_str()).or_default() += 1;
            continue;
        }
        *uses.entry(service.table.as_str()).or_default() += 1;
        if let Some(backup) = &service.backup_table {
            *uses.entry(backup.as_str()).or_default() += 1;
        }
    }

    for table in &config.tables {
        match uses.get(table.name.as_str()) {
            None => errors.push(ValidationError::UnusedTable { table: table.name.clone() }),
            Some(n) if *n > 1 => errors.push(ValidationError::TableReused { table: table.name.clone() }),
            Some(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
