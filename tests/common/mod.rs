//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use hoststate::config::loader::parse_config;
use hoststate::config::HoststateConfig;
use hoststate::filter::{FilterError, FilterTarget, PacketFilter};
use hoststate::model::{HostId, HostStatus, Registry, ServiceId, ServiceState};
use hoststate::Engine;

/// One `www` service: primary `web` (hosts 1 and 2), backup `sorry` (host 3).
pub const SAMPLE_CONFIG: &str = r#"
[filter]
backend = "log"

[[services]]
id = 1
name = "www"
virtual_address = "192.0.2.10"
port = 80
table = "web"
backup_table = "sorry"

[[tables]]
id = 1
name = "web"
port = 8080

[[tables.hosts]]
id = 1
name = "web1"
address = "10.0.0.1"

[[tables.hosts]]
id = 2
name = "web2"
address = "10.0.0.2"

[[tables]]
id = 2
name = "sorry"
port = 8080

[[tables.hosts]]
id = 3
name = "sorry1"
address = "10.0.1.1"
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Add(String, IpAddr),
    Remove(String, IpAddr),
    Flush(String),
    Activate(String),
    Deactivate(String),
}

/// Packet filter that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingFilter {
    ops: Arc<Mutex<Vec<FilterOp>>>,
}

impl RecordingFilter {
    /// Drain the operations recorded so far.
    pub fn take(&self) -> Vec<FilterOp> {
        std::mem::take(&mut *self.ops.lock().unwrap())
    }

    fn push(&self, op: FilterOp) {
        self.ops.lock().unwrap().push(op);
    }
}

impl PacketFilter for RecordingFilter {
    fn add_host(&mut self, target: &FilterTarget, address: IpAddr) -> Result<(), FilterError> {
        self.push(FilterOp::Add(target.service.clone(), address));
        Ok(())
    }

    fn remove_host(&mut self, target: &FilterTarget, address: IpAddr) -> Result<(), FilterError> {
        self.push(FilterOp::Remove(target.service.clone(), address));
        Ok(())
    }

    fn flush_table(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        self.push(FilterOp::Flush(target.service.clone()));
        Ok(())
    }

    fn activate_ruleset(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        self.push(FilterOp::Activate(target.service.clone()));
        Ok(())
    }

    fn deactivate_ruleset(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        self.push(FilterOp::Deactivate(target.service.clone()));
        Ok(())
    }
}

pub fn sample_config() -> HoststateConfig {
    parse_config(SAMPLE_CONFIG).unwrap()
}

/// Engine over the sample config, plus a handle on its filter's log.
pub fn engine() -> (Engine, RecordingFilter) {
    engine_with(SAMPLE_CONFIG)
}

pub fn engine_with(config: &str) -> (Engine, RecordingFilter) {
    let config = parse_config(config).unwrap();
    let filter = RecordingFilter::default();
    let registry = Registry::new(&config).unwrap();
    (Engine::new(registry, Box::new(filter.clone())), filter)
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn report(engine: &mut Engine, host: u32, status: HostStatus) {
    engine.host_status(HostId(host), status).unwrap();
}

pub fn state(engine: &Engine) -> ServiceState {
    engine.registry().service(ServiceId(1)).unwrap().state
}

/// Every table's cached up count matches its hosts.
pub fn assert_counts_consistent(engine: &Engine) {
    for table in engine.registry().tables() {
        assert_eq!(
            table.up,
            engine.registry().count_up(table.id),
            "table {} up count drifted",
            table.name
        );
    }
}
