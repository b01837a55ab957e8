//! Reconciliation passes against a recording packet filter.

mod common;

use common::{assert_counts_consistent, engine, engine_with, ip, report, state, FilterOp};
use hoststate::model::{HostId, HostStatus, ServiceId, ServiceState, TableId};
use hoststate::{Event, PfeError};

fn add(addr: &str) -> FilterOp {
    FilterOp::Add("www".into(), ip(addr))
}

fn remove(addr: &str) -> FilterOp {
    FilterOp::Remove("www".into(), ip(addr))
}

#[test]
fn test_initial_sync_with_unknown_hosts_does_nothing() {
    let (mut engine, filter) = engine();
    engine.sync().unwrap();

    assert_eq!(state(&engine), ServiceState::Down);
    assert!(filter.take().is_empty());
}

#[test]
fn test_primary_hosts_come_up() {
    let (mut engine, filter) = engine();

    report(&mut engine, 1, HostStatus::Up);
    engine.sync().unwrap();
    assert_eq!(state(&engine), ServiceState::Primary);
    assert_eq!(filter.take(), vec![add("10.0.0.1"), FilterOp::Activate("www".into())]);

    report(&mut engine, 2, HostStatus::Up);
    engine.sync().unwrap();
    assert_eq!(filter.take(), vec![add("10.0.0.2")]);

    let service = engine.registry().service(ServiceId(1)).unwrap();
    assert!(service.ruleset_active);
    assert_eq!(service.installed.len(), 2);
}

#[test]
fn test_status_report_alone_touches_no_filter_state() {
    let (mut engine, filter) = engine();
    report(&mut engine, 1, HostStatus::Up);

    assert!(filter.take().is_empty());
    assert!(engine.registry().table(TableId(1)).unwrap().changed);
    assert_eq!(state(&engine), ServiceState::Down);
}

#[test]
fn test_repeated_sync_is_quiet() {
    let (mut engine, filter) = engine();
    report(&mut engine, 1, HostStatus::Up);
    engine.sync().unwrap();
    filter.take();

    engine.sync().unwrap();
    assert!(filter.take().is_empty());
    assert!(engine.registry().tables().all(|t| !t.changed));
}

#[test]
fn test_failover_to_backup_and_back() {
    let (mut engine, filter) = engine();
    report(&mut engine, 1, HostStatus::Up);
    report(&mut engine, 3, HostStatus::Up);
    engine.sync().unwrap();

    // Both tables have capacity: primary wins.
    assert_eq!(state(&engine), ServiceState::Primary);
    filter.take();

    report(&mut engine, 1, HostStatus::Down);
    engine.sync().unwrap();
    assert_eq!(state(&engine), ServiceState::Backup);
    assert_eq!(filter.take(), vec![remove("10.0.0.1"), add("10.0.1.1")]);

    report(&mut engine, 1, HostStatus::Up);
    engine.sync().unwrap();
    assert_eq!(state(&engine), ServiceState::Primary);
    assert_eq!(filter.take(), vec![remove("10.0.1.1"), add("10.0.0.1")]);
}

#[test]
fn test_backup_only_capacity() {
    let (mut engine, filter) = engine();
    report(&mut engine, 3, HostStatus::Up);
    engine.sync().unwrap();

    assert_eq!(state(&engine), ServiceState::Backup);
    assert_eq!(filter.take(), vec![add("10.0.1.1"), FilterOp::Activate("www".into())]);
}

#[test]
fn test_everything_down_pulls_ruleset() {
    let (mut engine, filter) = engine();
    report(&mut engine, 3, HostStatus::Up);
    engine.sync().unwrap();
    filter.take();

    report(&mut engine, 3, HostStatus::Down);
    engine.sync().unwrap();

    assert_eq!(state(&engine), ServiceState::Down);
    assert_eq!(
        filter.take(),
        vec![FilterOp::Flush("www".into()), FilterOp::Deactivate("www".into())]
    );
    let service = engine.registry().service(ServiceId(1)).unwrap();
    assert!(!service.ruleset_active);
    assert!(service.installed.is_empty());
}

#[test]
fn test_service_without_backup_goes_down() {
    let (mut engine, filter) = engine_with(
        r#"
[[services]]
id = 1
name = "www"
virtual_address = "192.0.2.10"
port = 80
table = "web"

[[tables]]
id = 1
name = "web"
port = 8080

[[tables.hosts]]
id = 1
address = "10.0.0.1"
"#,
    );
    assert!(!engine.registry().service(ServiceId(1)).unwrap().has_backup());

    report(&mut engine, 1, HostStatus::Up);
    engine.sync().unwrap();
    assert_eq!(state(&engine), ServiceState::Primary);
    filter.take();

    report(&mut engine, 1, HostStatus::Down);
    engine.sync().unwrap();
    assert_eq!(state(&engine), ServiceState::Down);
    assert_eq!(
        filter.take(),
        vec![FilterOp::Flush("www".into()), FilterOp::Deactivate("www".into())]
    );
}

#[test]
fn test_up_counts_track_hosts() {
    let (mut engine, _filter) = engine();
    let sequence = [
        (1, HostStatus::Up),
        (2, HostStatus::Down),
        (3, HostStatus::Up),
        (2, HostStatus::Unknown),
        (1, HostStatus::Down),
        (2, HostStatus::Up),
        (3, HostStatus::Unknown),
        (1, HostStatus::Up),
    ];
    for (host, status) in sequence {
        report(&mut engine, host, status);
        assert_counts_consistent(&engine);
        engine.sync().unwrap();
    }

    assert_eq!(engine.registry().table(TableId(1)).unwrap().up, 2);
    assert_eq!(engine.registry().table(TableId(2)).unwrap().up, 0);
    assert_eq!(state(&engine), ServiceState::Primary);

    let host = engine.registry().host(HostId(1)).unwrap();
    assert_eq!((host.check_count, host.up_count), (3, 2));
}

#[test]
fn test_duplicate_report_is_fatal() {
    let (mut engine, _filter) = engine();
    report(&mut engine, 2, HostStatus::Down);
    let err = engine.host_status(HostId(2), HostStatus::Down).unwrap_err();
    assert!(matches!(err, PfeError::Desynchronized { .. }));
}

#[test]
fn test_events_follow_the_pass() {
    let (mut engine, _filter) = engine();
    report(&mut engine, 1, HostStatus::Up);
    engine.sync().unwrap();

    assert_eq!(
        engine.take_events(),
        vec![
            Event::HostStatus { host: HostId(1), name: "web1".into(), status: HostStatus::Up },
            Event::TableChanged { table: TableId(1), name: "web".into(), up: 1 },
            Event::RulesetPushed { service: ServiceId(1), name: "www".into() },
        ]
    );
    assert!(engine.take_events().is_empty());
}

#[test]
fn test_shutdown_removes_installed_state() {
    let (mut engine, filter) = engine();
    report(&mut engine, 1, HostStatus::Up);
    engine.sync().unwrap();
    filter.take();

    engine.shutdown();
    assert_eq!(
        filter.take(),
        vec![FilterOp::Flush("www".into()), FilterOp::Deactivate("www".into())]
    );

    // Nothing left to remove.
    engine.shutdown();
    assert!(filter.take().is_empty());
}
