//! Dry-run backend that only logs.

use std::net::IpAddr;

use crate::filter::{FilterError, FilterTarget, PacketFilter};

#[derive(Debug)]
pub struct LogFilter {
    anchor: String,
}

impl LogFilter {
    pub fn new(anchor: String) -> Self {
        Self { anchor }
    }
}

impl PacketFilter for LogFilter {
    fn add_host(&mut self, target: &FilterTarget, address: IpAddr) -> Result<(), FilterError> {
        tracing::info!(anchor = %self.anchor, table = %target.service, %address, "pf: add host");
        Ok(())
    }

    fn remove_host(&mut self, target: &FilterTarget, address: IpAddr) -> Result<(), FilterError> {
        tracing::info!(anchor = %self.anchor, table = %target.service, %address, "pf: remove host");
        Ok(())
    }

    fn flush_table(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        tracing::info!(anchor = %self.anchor, table = %target.service, "pf: flush table");
        Ok(())
    }

    fn activate_ruleset(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        tracing::info!(
            anchor = %self.anchor,
            service = %target.service,
            address = %target.address,
            port = target.port,
            "pf: activate ruleset"
        );
        Ok(())
    }

    fn deactivate_ruleset(&mut self, target: &FilterTarget) -> Result<(), FilterError> {
        tracing::info!(anchor = %self.anchor, service = %target.service, "pf: deactivate ruleset");
        Ok(())
    }
}
