//! Relay Engine
//!
//! Pumps bytes between local input/output and the session's connection in
//! two spawned tasks. Whichever direction ends first ends the session: the
//! other pump is told to stop on the shared shutdown channel and the
//! connection is shut down and closed.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use super::stats::{Direction, RelayStats, SessionSummary};
use crate::config::Config;
use crate::error::SessionError;
use crate::session::{Session, SessionState};
use crate::Result;

/// Why the relay stopped
#[derive(Debug)]
pub enum Termination {
    /// One side reached end-of-stream
    Eof(Direction),
    /// One side failed with an I/O error
    Failed(SessionError),
    /// Stopped from outside (signal or explicit shutdown)
    Interrupted,
}

/// Result of a completed relay
#[derive(Debug)]
pub struct RelayOutcome {
    pub termination: Termination,
    pub summary: SessionSummary,
    pub session_state: SessionState,
}

impl RelayOutcome {
    /// The direction whose end terminated the relay
    pub fn finished_first(&self) -> Option<Direction> {
        match &self.termination {
            Termination::Eof(direction) => Some(*direction),
            Termination::Failed(SessionError::ConnectionIo { direction, .. }) => Some(*direction),
            _ => None,
        }
    }
}

/// How a single pump ended
#[derive(Debug)]
enum PumpEnd {
    Eof,
    Failed(io::Error),
    Stopped,
}

enum Finished<A, B> {
    Outbound(A),
    Inbound(B),
}

/// Moves data between local stdio and a remote peer
pub struct RelayEngine {
    buffer_size: usize,
    shutdown_tx: broadcast::Sender<()>,
    /// Held from construction so a stop sent before `run` is not lost
    shutdown_rx: broadcast::Receiver<()>,
}

impl RelayEngine {
    /// Create a new relay engine
    pub fn new() -> Self {
        Self::with_buffer_size(Config::default().relay.buffer_size)
    }

    /// Create a new relay engine with a custom chunk size
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        Self {
            buffer_size,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Create a new relay engine from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::with_buffer_size(config.relay.buffer_size)
    }

    /// Sender that stops a running relay when anything is sent on it
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Relay until either direction ends, then close the session
    pub async fn run<I, O>(
        &mut self,
        mut session: Session,
        input: I,
        output: O,
    ) -> Result<RelayOutcome>
    where
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        if session.state() != SessionState::Established {
            bail!(
                "Cannot relay session {} in state {}",
                session.id(),
                session.state()
            );
        }

        let stream = session
            .take_stream()
            .ok_or_else(|| anyhow!("Session {} has no connection attached", session.id()))?;
        let stats = RelayStats::for_session(&session);
        let (reader, writer) = stream.into_split();

        info!(
            "Starting bidirectional relay for session {} ({} <-> {:?})",
            session.id(),
            session.role(),
            session.remote_addr()
        );

        let mut outbound = tokio::spawn(pump(
            input,
            writer,
            stats.counter(Direction::Outbound),
            self.shutdown_tx.subscribe(),
            self.buffer_size,
        ));
        let mut inbound = tokio::spawn(pump(
            reader,
            output,
            stats.counter(Direction::Inbound),
            self.shutdown_tx.subscribe(),
            self.buffer_size,
        ));

        // Pumps are subscribed now; replay a stop that arrived before them
        if self.take_pending_shutdown() {
            debug!("Shutdown requested before relay start for session {}", session.id());
            let _ = self.shutdown_tx.send(());
        }

        let first = tokio::select! {
            res = &mut outbound => Finished::Outbound(res),
            res = &mut inbound => Finished::Inbound(res),
        };

        // Stop whichever pump is still running
        let _ = self.shutdown_tx.send(());

        let (first_direction, outbound_res, inbound_res) = match first {
            Finished::Outbound(res) => (Direction::Outbound, res, (&mut inbound).await),
            Finished::Inbound(res) => (Direction::Inbound, (&mut outbound).await, res),
        };
        let (_input, writer, outbound_end) = outbound_res.context("Outbound relay task failed")?;
        let (reader, _output, inbound_end) = inbound_res.context("Inbound relay task failed")?;

        debug!(
            "Relay pumps finished: outbound={:?}, inbound={:?}",
            outbound_end, inbound_end
        );

        let first_end = match first_direction {
            Direction::Outbound => outbound_end,
            Direction::Inbound => inbound_end,
        };
        let termination = match first_end {
            PumpEnd::Eof => Termination::Eof(first_direction),
            PumpEnd::Failed(source) => {
                warn!("Relay {} direction failed: {}", first_direction, source);
                Termination::Failed(SessionError::ConnectionIo {
                    direction: first_direction,
                    source,
                })
            }
            PumpEnd::Stopped => Termination::Interrupted,
        };

        match reader.reunite(writer) {
            Ok(mut stream) => {
                if let Err(e) = stream.shutdown().await {
                    debug!("Connection shutdown for session {}: {}", session.id(), e);
                }
            }
            Err(e) => debug!("Failed to reunite connection halves: {}", e),
        }
        session.close()?;
        self.take_pending_shutdown();

        let summary = stats.to_summary();
        summary.log();

        Ok(RelayOutcome {
            termination,
            summary,
            session_state: session.state(),
        })
    }
}

impl RelayEngine {
    /// Drain the engine's own receiver, reporting whether a stop was queued
    fn take_pending_shutdown(&mut self) -> bool {
        let mut pending = false;
        loop {
            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => pending = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return pending,
            }
        }
    }
}

impl Default for RelayEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy `reader` into `writer` chunk by chunk until EOF, error or stop
async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    counter: Arc<AtomicU64>,
    mut stop: broadcast::Receiver<()>,
    buffer_size: usize,
) -> (R, W, PumpEnd)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(buffer_size);

    let end = loop {
        buf.clear();
        let read = tokio::select! {
            _ = stop.recv() => break PumpEnd::Stopped,
            read = reader.read_buf(&mut buf) => read,
        };

        match read {
            Ok(0) => break PumpEnd::Eof,
            Ok(n) => {
                let written = tokio::select! {
                    _ = stop.recv() => break PumpEnd::Stopped,
                    written = write_chunk(&mut writer, &buf) => written,
                };
                if let Err(e) = written {
                    break PumpEnd::Failed(e);
                }
                counter.fetch_add(n as u64, Ordering::Relaxed);
            }
            Err(e) => break PumpEnd::Failed(e),
        }
    };

    (reader, writer, end)
}

async fn write_chunk<W>(writer: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(chunk).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_pump_forwards_until_eof() {
        let reader = Builder::new().read(b"hello ").read(b"world").build();
        let writer = Builder::new().write(b"hello ").write(b"world").build();
        let counter = Arc::new(AtomicU64::new(0));
        let (_tx, rx) = broadcast::channel(1);

        let (_, _, end) = pump(reader, writer, Arc::clone(&counter), rx, 64).await;
        assert!(matches!(end, PumpEnd::Eof));
        assert_eq!(counter.load(Ordering::Relaxed), 11);
    }

    #[tokio::test]
    async fn test_pump_reports_read_error() {
        let reader = Builder::new()
            .read(b"abc")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let writer = Builder::new().write(b"abc").build();
        let counter = Arc::new(AtomicU64::new(0));
        let (_tx, rx) = broadcast::channel(1);

        let (_, _, end) = pump(reader, writer, Arc::clone(&counter), rx, 64).await;
        match end {
            PumpEnd::Failed(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_pump_stops_on_signal() {
        let reader = Builder::new().wait(Duration::from_secs(30)).build();
        let writer = Builder::new().build();
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(pump(reader, writer, Arc::new(AtomicU64::new(0)), rx, 64));
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(()).unwrap();

        let (_, _, end) = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("pump did not stop")
            .unwrap();
        assert!(matches!(end, PumpEnd::Stopped));
    }

    #[tokio::test]
    async fn test_run_rejects_unestablished_session() {
        let mut engine = RelayEngine::new();
        let session = Session::new(crate::session::Role::Client);
        let result = engine
            .run(session, tokio::io::empty(), tokio::io::sink())
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_stop_sent_before_run_is_kept() {
        let mut engine = RelayEngine::new();
        assert!(!engine.take_pending_shutdown());

        // Nothing else is subscribed yet; the engine's own receiver holds it
        engine.shutdown_handle().send(()).unwrap();
        engine.shutdown_handle().send(()).unwrap();
        assert!(engine.take_pending_shutdown());
        assert!(!engine.take_pending_shutdown());
    }
}
