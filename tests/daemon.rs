//! End-to-end dispatch loop tests over socket pairs.

mod common;

use std::path::Path;
use std::time::Duration;

use common::{ip, FilterOp};
use hoststate::control::{ControlClient, ControlListener, ControlRequest, ControlResponse};
use hoststate::ipc::{self, Message, Peer};
use hoststate::model::{HostId, HostStatus, ServiceState, TableId, Target};
use hoststate::{Daemon, Event, PfeError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::oneshot;

struct Harness {
    daemon: Daemon<UnixStream>,
    filter: common::RecordingFilter,
    hce: UnixStream,
    parent: UnixStream,
    _dir: tempfile::TempDir,
    socket: std::path::PathBuf,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("control.sock");
    let (engine, filter) = common::engine();
    let (hce_local, hce) = UnixStream::pair().unwrap();
    let (parent_local, parent) = UnixStream::pair().unwrap();
    let listener = ControlListener::bind(&socket, 0o600).unwrap();

    Harness {
        daemon: Daemon::new(engine, hce_local, parent_local, listener),
        filter,
        hce,
        parent,
        _dir: dir,
        socket,
    }
}

/// Poll `show` until the service reaches `state`.
async fn wait_for_state(socket: &Path, state: ServiceState) -> Vec<ControlResponse> {
    let mut client = ControlClient::connect(socket).await.unwrap();
    for _ in 0..200 {
        let records = client.show().await.unwrap();
        if records
            .iter()
            .any(|r| matches!(r, ControlResponse::Service(s) if s.state == state))
        {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("service never reached {}", state);
}

#[tokio::test]
async fn test_status_sync_show_and_table_disable() {
    let Harness { daemon, filter, hce, parent: _parent, _dir, socket } = harness();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let driver = async {
        let (mut peer_rx, mut peer_tx) = ipc::split(Peer::Hce, hce);
        peer_tx
            .compose(&Message::HostStatus { host: HostId(1), status: HostStatus::Up })
            .unwrap();
        peer_tx.compose(&Message::Sync).unwrap();
        peer_tx.flush_all().await.unwrap();

        let records = wait_for_state(&socket, ServiceState::Primary).await;
        assert!(records.iter().any(|r| matches!(
            r,
            ControlResponse::Host(h) if h.id == HostId(1) && h.status == HostStatus::Up
        )));

        let mut client = ControlClient::connect(&socket).await.unwrap();
        client
            .send(&ControlRequest::TableDisable { target: Target::Name("web".into()) })
            .await
            .unwrap();
        assert_eq!(client.recv().await.unwrap(), Some(ControlResponse::Ok));

        let notified = peer_rx.read_batch().await.unwrap();
        assert_eq!(notified, vec![Message::TableDisable(TableId(1))]);

        let _ = stop_tx.send(());
        (peer_rx, peer_tx)
    };

    let (result, _peer) = tokio::join!(
        daemon.run(async {
            let _ = stop_rx.await;
        }),
        driver
    );
    result.unwrap();

    assert_eq!(
        filter.take(),
        vec![
            FilterOp::Add("www".into(), ip("10.0.0.1")),
            FilterOp::Activate("www".into()),
            FilterOp::Flush("www".into()),
            FilterOp::Deactivate("www".into()),
        ]
    );
}

#[tokio::test]
async fn test_unknown_target_reply() {
    let Harness { daemon, hce, parent: _parent, _dir, socket, .. } = harness();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let driver = async {
        let mut client = ControlClient::connect(&socket).await.unwrap();
        client
            .send(&ControlRequest::HostEnable { target: Target::Name("ghost".into()) })
            .await
            .unwrap();
        let reply = client.recv().await.unwrap();
        assert_eq!(
            reply,
            Some(ControlResponse::Fail { reason: "no such host: 'ghost'".into() })
        );
        let _ = stop_tx.send(());
    };

    let (result, ()) = tokio::join!(
        daemon.run(async {
            let _ = stop_rx.await;
        }),
        driver
    );
    result.unwrap();
    drop(hce);
}

#[tokio::test]
async fn test_replies_written_after_client_half_close() {
    let Harness { daemon, hce, parent: _parent, _dir, socket, .. } = harness();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let driver = async {
        let mut stream = UnixStream::connect(&socket).await.unwrap();
        stream
            .write_all(b"{\"command\":\"show\"}\n{\"command\":\"table_disable\",\"target\":\"sorry\"}\n")
            .await
            .unwrap();
        stream.shutdown().await.unwrap();

        let mut replies = String::new();
        stream.read_to_string(&mut replies).await.unwrap();
        let _ = stop_tx.send(());
        (replies, hce)
    };

    let (result, (replies, _hce)) = tokio::join!(
        daemon.run(async {
            let _ = stop_rx.await;
        }),
        driver
    );
    result.unwrap();

    let replies: Vec<ControlResponse> = replies
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    // service, two tables, three hosts, end marker, then the disable reply
    assert_eq!(replies.len(), 8);
    assert!(matches!(&replies[0], ControlResponse::Service(s) if s.name == "www"));
    assert_eq!(replies[6], ControlResponse::End);
    assert_eq!(replies[7], ControlResponse::Ok);
}

#[tokio::test]
async fn test_monitor_receives_events() {
    let Harness { daemon, hce, parent: _parent, _dir, socket, .. } = harness();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let driver = async {
        let mut monitor = ControlClient::connect(&socket).await.unwrap();
        monitor.send(&ControlRequest::Monitor).await.unwrap();
        assert_eq!(monitor.recv().await.unwrap(), Some(ControlResponse::Ok));

        let (peer_rx, mut peer_tx) = ipc::split(Peer::Hce, hce);
        peer_tx
            .compose(&Message::HostStatus { host: HostId(3), status: HostStatus::Up })
            .unwrap();
        peer_tx.flush_all().await.unwrap();

        assert_eq!(
            monitor.recv().await.unwrap(),
            Some(ControlResponse::Event(Event::HostStatus {
                host: HostId(3),
                name: "sorry1".into(),
                status: HostStatus::Up,
            }))
        );
        let _ = stop_tx.send(());
        (peer_rx, peer_tx)
    };

    let (result, _peer) = tokio::join!(
        daemon.run(async {
            let _ = stop_rx.await;
        }),
        driver
    );
    result.unwrap();
}

#[tokio::test]
async fn test_parent_sync_and_reload() {
    let Harness { daemon, filter, hce, parent, _dir, socket } = harness();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let driver = async {
        let (hce_rx, mut hce_tx) = ipc::split(Peer::Hce, hce);
        let (mut parent_rx, mut parent_tx) = ipc::split(Peer::Parent, parent);

        // Status from the hce, pass triggered by the parent.
        hce_tx
            .compose(&Message::HostStatus { host: HostId(3), status: HostStatus::Up })
            .unwrap();
        hce_tx.flush_all().await.unwrap();
        wait_for_host(&socket, HostId(3)).await;
        parent_tx.compose(&Message::Sync).unwrap();
        parent_tx.flush_all().await.unwrap();
        wait_for_state(&socket, ServiceState::Backup).await;

        let mut client = ControlClient::connect(&socket).await.unwrap();
        client.send(&ControlRequest::Reload).await.unwrap();
        assert_eq!(client.recv().await.unwrap(), Some(ControlResponse::Ok));
        assert_eq!(parent_rx.read_batch().await.unwrap(), vec![Message::Reload]);

        let _ = stop_tx.send(());
        (hce_rx, hce_tx, parent_rx, parent_tx)
    };

    let (result, _peers) = tokio::join!(
        daemon.run(async {
            let _ = stop_rx.await;
        }),
        driver
    );
    result.unwrap();

    // Shutdown removes what the backup pass installed.
    assert_eq!(
        filter.take(),
        vec![
            FilterOp::Add("www".into(), ip("10.0.1.1")),
            FilterOp::Activate("www".into()),
            FilterOp::Flush("www".into()),
            FilterOp::Deactivate("www".into()),
        ]
    );
    assert!(!socket.exists());
}

async fn wait_for_host(socket: &Path, id: HostId) {
    let mut client = ControlClient::connect(socket).await.unwrap();
    for _ in 0..200 {
        let records = client.show().await.unwrap();
        if records
            .iter()
            .any(|r| matches!(r, ControlResponse::Host(h) if h.id == id && h.status == HostStatus::Up))
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("host {} never came up", id);
}

#[tokio::test]
async fn test_duplicate_status_is_fatal() {
    let Harness { daemon, filter, hce, parent: _parent, _dir, .. } = harness();

    let driver = async {
        let (peer_rx, mut peer_tx) = ipc::split(Peer::Hce, hce);
        for _ in 0..2 {
            peer_tx
                .compose(&Message::HostStatus { host: HostId(2), status: HostStatus::Down })
                .unwrap();
        }
        peer_tx.flush_all().await.unwrap();
        (peer_rx, peer_tx)
    };

    let (result, _peer) = tokio::join!(daemon.run(std::future::pending::<()>()), driver);
    assert!(matches!(
        result,
        Err(PfeError::Desynchronized { host: HostId(2), status: HostStatus::Down })
    ));
    assert!(filter.take().is_empty());
}

#[tokio::test]
async fn test_closed_hce_pipe_is_fatal() {
    let Harness { daemon, hce, parent: _parent, _dir, .. } = harness();
    drop(hce);

    let result = daemon.run(std::future::pending::<()>()).await;
    assert!(matches!(result, Err(PfeError::PipeClosed(Peer::Hce))));
}
