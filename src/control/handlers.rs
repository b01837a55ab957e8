use tokio::sync::mpsc;

use crate::control::protocol::{
    ControlRequest, ControlResponse, HostRecord, ServiceRecord, TableRecord, TableRole,
};
use crate::engine::{ControlError, Engine};
use crate::error::PfeError;
use crate::model::{Registry, Service, ServiceState, TableId};

/// What the dispatch loop must do after a request.
#[derive(Debug, PartialEq, Eq)]
pub enum Handled {
    Done,
    /// Add the connection to the monitor list.
    Subscribe,
}

/// Run one control request against the engine and send the replies.
///
/// Lookup misses become a `fail` reply; anything else that goes wrong is fatal.
pub fn handle(
    engine: &mut Engine,
    request: ControlRequest,
    reply: &mpsc::UnboundedSender<ControlResponse>,
) -> Result<Handled, PfeError> {
    tracing::debug!(?request, "Control request");

    let result = match &request {
        ControlRequest::Show => {
            for record in summary(engine.registry()) {
                let _ = reply.send(record);
            }
            let _ = reply.send(ControlResponse::End);
            return Ok(Handled::Done);
        }
        ControlRequest::Reload => {
            engine.request_reload();
            Ok(())
        }
        ControlRequest::Monitor => {
            let _ = reply.send(ControlResponse::Ok);
            return Ok(Handled::Subscribe);
        }
        ControlRequest::ServiceEnable { target } => engine.enable_service(target),
        ControlRequest::ServiceDisable { target } => engine.disable_service(target),
        ControlRequest::TableEnable { target } => engine.enable_table(target),
        ControlRequest::TableDisable { target } => engine.disable_table(target),
        ControlRequest::HostEnable { target } => engine.enable_host(target),
        ControlRequest::HostDisable { target } => engine.disable_host(target),
    };

    match result {
        Ok(()) => {
            let _ = reply.send(ControlResponse::Ok);
        }
        Err(ControlError::NotFound { kind, target }) => {
            tracing::warn!(kind, %target, "Control request for unknown object");
            let reason = format!("no such {}: {}", kind, target);
            let _ = reply.send(ControlResponse::Fail { reason });
        }
        Err(ControlError::Fatal(e)) => return Err(e),
    }
    Ok(Handled::Done)
}

/// Records for `show`: each service, then its primary and backup tables with hosts.
pub fn summary(registry: &Registry) -> Vec<ControlResponse> {
    let mut records = Vec::new();
    for service in registry.services() {
        records.push(ControlResponse::Service(ServiceRecord {
            id: service.id,
            name: service.name.clone(),
            address: service.address,
            port: service.port,
            state: service.state,
            disabled: service.disabled,
            ruleset_active: service.ruleset_active,
            table: service.table,
            backup: service.has_backup().then_some(service.backup),
        }));

        push_table(&mut records, registry, service, service.table, TableRole::Primary);
        if service.has_backup() {
            push_table(&mut records, registry, service, service.backup, TableRole::Backup);
        }
    }
    records
}

fn push_table(
    records: &mut Vec<ControlResponse>,
    registry: &Registry,
    service: &Service,
    id: TableId,
    role: TableRole,
) {
    let Ok(table) = registry.table(id) else { return };
    let active = match role {
        TableRole::Primary => service.state == ServiceState::Primary,
        TableRole::Backup => service.state == ServiceState::Backup,
    };
    records.push(ControlResponse::Table(TableRecord {
        id: table.id,
        name: table.name.clone(),
        service: table.service,
        role,
        port: table.port,
        up: table.up,
        hosts: table.hosts.len(),
        disabled: table.disabled,
        active,
    }));

    for host in registry.table_hosts(id) {
        records.push(ControlResponse::Host(HostRecord {
            id: host.id,
            name: host.name.clone(),
            address: host.address,
            table: host.table,
            status: host.status,
            disabled: host.disabled,
            check_count: host.check_count,
            up_count: host.up_count,
            availability: host.availability(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::filter::LogFilter;
    use crate::model::{HostId, HostStatus, Target};

    fn engine() -> Engine {
        let config = parse_config(
            r#"
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
address = "10.0.0.1"

[[tables]]
id = 2
name = "sorry"
port = 8080

[[tables.hosts]]
id = 2
address = "10.0.1.1"
"#,
        )
        .unwrap();
        Engine::new(Registry::new(&config).unwrap(), Box::new(LogFilter::new("test".into())))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ControlResponse>) -> Vec<ControlResponse> {
        let mut out = Vec::new();
        while let Ok(r) = rx.try_recv() {
            out.push(r);
        }
        out
    }

    #[test]
    fn test_show_order_and_end_marker() {
        let mut engine = engine();
        engine.host_status(HostId(1), HostStatus::Up).unwrap();
        engine.sync().unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(handle(&mut engine, ControlRequest::Show, &tx).unwrap(), Handled::Done);
        let replies = drain(&mut rx);

        assert_eq!(replies.len(), 6);
        assert!(matches!(&replies[0], ControlResponse::Service(s) if s.state == ServiceState::Primary));
        assert!(matches!(&replies[1], ControlResponse::Table(t) if t.role == TableRole::Primary && t.active && t.up == 1));
        assert!(matches!(&replies[2], ControlResponse::Host(h) if h.availability == Some(100.0)));
        assert!(matches!(&replies[3], ControlResponse::Table(t) if t.role == TableRole::Backup && !t.active));
        assert!(matches!(&replies[4], ControlResponse::Host(h) if h.status == HostStatus::Unknown));
        assert_eq!(replies[5], ControlResponse::End);
    }

    #[test]
    fn test_unknown_target_fails_without_error() {
        let mut engine = engine();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = ControlRequest::HostDisable { target: Target::Id(77) };

        assert_eq!(handle(&mut engine, request, &tx).unwrap(), Handled::Done);
        assert_eq!(
            drain(&mut rx),
            vec![ControlResponse::Fail { reason: "no such host: id 77".into() }]
        );
    }

    #[test]
    fn test_reload_and_monitor() {
        let mut engine = engine();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert_eq!(handle(&mut engine, ControlRequest::Reload, &tx).unwrap(), Handled::Done);
        assert_eq!(engine.take_parent_outbox(), vec![crate::ipc::Message::Reload]);
        assert_eq!(handle(&mut engine, ControlRequest::Monitor, &tx).unwrap(), Handled::Subscribe);
        assert_eq!(drain(&mut rx), vec![ControlResponse::Ok, ControlResponse::Ok]);
    }
}
