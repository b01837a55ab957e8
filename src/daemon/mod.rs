//! Dispatch loop.
//!
//! # Data Flow
//! ```text
//! hce link     ─┐
//! parent link  ─┼─▶ select! ─▶ Engine ─▶ outboxes ─▶ LinkWriter (hce / parent)
//! control cmds ─┘                    └──▶ events   ─▶ monitor connections
//! ```
//!
//! # Responsibilities
//! - Route inbound imsgs to the engine by peer
//! - Accept control connections and run their requests against the engine
//! - Flush queued peer messages when the sockets are writable
//! - Tear down packet-filter state on exit
//!
//! # Design Decisions
//! - Single task: every handler runs to completion before the next event
//! - Only the dispatch loop touches the engine; control connections talk to it
//!   over a channel
//! - Link errors end the loop; control connection errors never do

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

use crate::control::handlers::{self, Handled};
use crate::control::server::{serve_connection, ControlCommand, ControlListener};
use crate::control::ControlResponse;
use crate::engine::Engine;
use crate::error::PfeError;
use crate::ipc::{self, LinkReader, LinkWriter, Message, Peer};
use crate::lifecycle::Shutdown;

pub struct Daemon<S> {
    engine: Engine,
    hce_rx: LinkReader<ReadHalf<S>>,
    hce_tx: LinkWriter<WriteHalf<S>>,
    parent_rx: LinkReader<ReadHalf<S>>,
    parent_tx: LinkWriter<WriteHalf<S>>,
    control: ControlListener,
    commands_tx: mpsc::UnboundedSender<ControlCommand>,
    commands_rx: mpsc::UnboundedReceiver<ControlCommand>,
    monitors: Vec<mpsc::UnboundedSender<ControlResponse>>,
    shutdown: Shutdown,
    next_conn: u64,
}

impl<S> Daemon<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(engine: Engine, hce: S, parent: S, control: ControlListener) -> Self {
        let (hce_rx, hce_tx) = ipc::split(Peer::Hce, hce);
        let (parent_rx, parent_tx) = ipc::split(Peer::Parent, parent);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            hce_rx,
            hce_tx,
            parent_rx,
            parent_tx,
            control,
            commands_tx,
            commands_rx,
            monitors: Vec::new(),
            shutdown: Shutdown::new(),
            next_conn: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run until `terminate` resolves or a fatal error occurs.
    ///
    /// Packet-filter state is removed on both paths.
    pub async fn run<F>(mut self, terminate: F) -> Result<(), PfeError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(terminate);
        let result = self.serve(terminate).await;

        self.shutdown.trigger();
        self.engine.shutdown();

        if result.is_ok() {
            // Best effort: the peers may already be gone.
            for (peer, flushed) in [
                (Peer::Hce, self.hce_tx.flush_all().await),
                (Peer::Parent, self.parent_tx.flush_all().await),
            ] {
                if let Err(e) = flushed {
                    tracing::debug!(%peer, error = %e, "Final flush failed");
                }
            }
        }
        result
    }

    async fn serve<F>(&mut self, mut terminate: std::pin::Pin<&mut F>) -> Result<(), PfeError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(control = %self.control.path().display(), "Dispatch loop started");

        loop {
            tokio::select! {
                _ = &mut terminate => {
                    tracing::info!("Terminating");
                    return Ok(());
                }
                batch = self.hce_rx.read_batch() => {
                    for msg in batch? {
                        self.dispatch_hce(msg)?;
                    }
                }
                batch = self.parent_rx.read_batch() => {
                    for msg in batch? {
                        self.dispatch_parent(msg)?;
                    }
                }
                flushed = self.hce_tx.flush_some(), if self.hce_tx.has_pending() => flushed?,
                flushed = self.parent_tx.flush_some(), if self.parent_tx.has_pending() => flushed?,
                accepted = self.control.accept() => match accepted {
                    Ok(stream) => {
                        let conn = self.next_conn;
                        self.next_conn += 1;
                        tokio::spawn(serve_connection(
                            conn,
                            stream,
                            self.commands_tx.clone(),
                            self.shutdown.subscribe(),
                        ));
                    }
                    Err(e) => tracing::warn!(error = %e, "Control accept failed"),
                },
                Some(command) = self.commands_rx.recv() => {
                    let ControlCommand { conn, request, reply } = command;
                    if handlers::handle(&mut self.engine, request, &reply)? == Handled::Subscribe {
                        tracing::debug!(conn, "Monitor subscribed");
                        self.monitors.push(reply);
                    }
                }
            }

            self.drain_outboxes()?;
        }
    }

    fn dispatch_hce(&mut self, msg: Message) -> Result<(), PfeError> {
        match msg {
            Message::HostStatus { host, status } => self.engine.host_status(host, status),
            Message::Sync => self.engine.sync(),
            other => {
                tracing::debug!(peer = %Peer::Hce, kind = other.kind().name(), "Unexpected message");
                Ok(())
            }
        }
    }

    fn dispatch_parent(&mut self, msg: Message) -> Result<(), PfeError> {
        match msg {
            Message::Sync => self.engine.sync(),
            other => {
                tracing::debug!(peer = %Peer::Parent, kind = other.kind().name(), "Unexpected message");
                Ok(())
            }
        }
    }

    fn drain_outboxes(&mut self) -> Result<(), PfeError> {
        for msg in self.engine.take_hce_outbox() {
            self.hce_tx.compose(&msg)?;
        }
        for msg in self.engine.take_parent_outbox() {
            self.parent_tx.compose(&msg)?;
        }

        let events = self.engine.take_events();
        if !events.is_empty() {
            self.monitors.retain(|monitor| {
                events
                    .iter()
                    .all(|event| monitor.send(ControlResponse::Event(event.clone())).is_ok())
            });
        }
        Ok(())
    }
}
