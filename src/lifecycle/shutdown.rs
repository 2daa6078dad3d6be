//! Shutdown coordination.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::lifecycle::signals::shutdown_signal;

/// Broadcasts a shutdown request to every subscribed server.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of servers still listening for the signal.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on an OS termination signal or an explicit trigger.
///
/// Dropping every `Shutdown` handle does not count as a trigger.
pub async fn until_shutdown(mut rx: broadcast::Receiver<()>) {
    let triggered = async move {
        match rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = triggered => tracing::info!("Shutdown triggered"),
    }
}
