//! Stop signal for control connection tasks.

use tokio::sync::broadcast;

/// Tells every open control connection to close once the dispatch loop ends.
///
/// Each connection task holds a receiver, so the receiver count is the
/// number of connections still open.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: bool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx, triggered: false }
    }

    /// Receiver for a new control connection.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Close every control connection. Later calls do nothing.
    pub fn trigger(&mut self) {
        if self.triggered {
            return;
        }
        self.triggered = true;
        let open = self.tx.receiver_count();
        if open > 0 {
            tracing::debug!(connections = open, "Closing control connections");
        }
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
