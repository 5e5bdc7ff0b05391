//! Upload server accept loop.
//!
//! # Responsibilities
//! - Accept device connections from the bounded listener
//! - Spawn one task per connection running the dispatcher
//! - Stop accepting on shutdown and drain in-flight uploads
//!
//! # Design Decisions
//! - The accept loop never awaits connection work
//! - No application-level timeout on a connection: carts may pause
//!   mid-transfer and resume on the same socket

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::UploadConfig;
use crate::http::dispatcher::Dispatcher;
use crate::net::{ConnectionTracker, Listener, ListenerError};

/// How long shutdown waits for in-flight uploads.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP server for device uploads.
pub struct UploadServer {
    dispatcher: Arc<Dispatcher>,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl UploadServer {
    /// Create a new server with the given configuration.
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(config)),
            tracker: ConnectionTracker::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Handle on the live-connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(
            address = %addr,
            output_dir = %self.dispatcher.sink().directory().display(),
            "Upload server starting"
        );

        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };

            let (stream, peer, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(ListenerError::Accept(e)) => {
                    // Typically EMFILE; back off instead of spinning.
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let mut guard = self.tracker.track();
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = dispatcher.serve_connection(stream, peer, &mut guard).await {
                    tracing::warn!(
                        connection_id = %guard.id(),
                        peer_addr = %peer,
                        state = ?guard.state(),
                        error = %e,
                        "Connection ended early"
                    );
                }
            });
        }

        tracing::info!(active = self.tracker.active_count(), "Stopped accepting, draining uploads");
        if !self.tracker.drain(self.drain_timeout).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed with uploads in flight"
            );
        }

        tracing::info!("Upload server stopped");
        Ok(())
    }
}
