//! Graceful Shutdown Handling
//!
//! Turns SIGTERM / SIGINT (Ctrl+C on Windows) into a broadcast on the relay's
//! shutdown channel so the session is closed cleanly instead of the process
//! being killed mid-write.

use tokio::sync::broadcast;
use tokio::signal;
use tracing::{info, warn};
use crate::Result;

/// Forwards process signals to a shutdown channel
pub struct ShutdownCoordinator {
    /// Broadcast sender for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    /// Create a coordinator that fires on the given channel
    pub fn new(shutdown_tx: broadcast::Sender<()>) -> Self {
        Self { shutdown_tx }
    }

    /// Get a shutdown receiver
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Fire the shutdown signal without waiting for a process signal
    pub fn trigger(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal: {}", e);
        }
    }

    /// Wait for SIGTERM or SIGINT, then fire the shutdown signal
    pub async fn listen_for_signals(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, closing session");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, closing session");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, closing session");
        }

        self.trigger();
        Ok(())
    }
}
