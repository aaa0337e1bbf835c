//! Relay Statistics

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::session::{Role, Session};

/// Direction of a relay pump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Local input to the remote peer
    Outbound,
    /// Remote peer to local output
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, "outbound"),
            Direction::Inbound => write!(f, "inbound"),
        }
    }
}

/// Live byte counters for a running relay
#[derive(Debug)]
pub struct RelayStats {
    pub session_id: Uuid,
    pub role: Role,
    pub local_addr: Option<SocketAddr>,
    pub remote_addr: Option<SocketAddr>,
    pub start_time: Instant,
    bytes_out: Arc<AtomicU64>,
    bytes_in: Arc<AtomicU64>,
}

/// Summary of a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub role: Role,
    pub local_addr: Option<SocketAddr>,
    pub remote_addr: Option<SocketAddr>,
    pub duration_ms: u64,
    pub bytes_out: u64,
    pub bytes_in: u64,
    pub total_bytes: u64,
}

impl RelayStats {
    /// Start counting for the given session
    pub fn for_session(session: &Session) -> Self {
        Self {
            session_id: session.id(),
            role: session.role(),
            local_addr: session.local_addr(),
            remote_addr: session.remote_addr(),
            start_time: Instant::now(),
            bytes_out: Arc::new(AtomicU64::new(0)),
            bytes_in: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter handle for one direction, shared with its pump
    pub fn counter(&self, direction: Direction) -> Arc<AtomicU64> {
        match direction {
            Direction::Outbound => Arc::clone(&self.bytes_out),
            Direction::Inbound => Arc::clone(&self.bytes_in),
        }
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_out() + self.bytes_in()
    }

    pub fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Freeze the counters into a summary
    pub fn to_summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            role: self.role,
            local_addr: self.local_addr,
            remote_addr: self.remote_addr,
            duration_ms: self.duration().as_millis() as u64,
            bytes_out: self.bytes_out(),
            bytes_in: self.bytes_in(),
            total_bytes: self.total_bytes(),
        }
    }
}

impl SessionSummary {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Log the summary
    pub fn log(&self) {
        info!(
            session_id = %self.session_id,
            role = %self.role,
            local_addr = ?self.local_addr,
            remote_addr = ?self.remote_addr,
            duration_ms = self.duration_ms,
            bytes_out = self.bytes_out,
            bytes_in = self.bytes_in,
            total_bytes = self.total_bytes,
            "Relay session completed"
        );

        info!(
            "Session {} ({}) closed after {} | Out: {} bytes | In: {} bytes",
            self.session_id,
            self.role,
            humantime::format_duration(self.duration()),
            self.bytes_out,
            self.bytes_in
        );

        if let Ok(json) = serde_json::to_string(self) {
            debug!(summary = %json, "Session summary");
        }
    }
}
