//! Error types for session establishment and relay

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::relay::Direction;
use crate::session::SessionState;

/// Errors raised while opening, relaying or closing a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection on {addr}: {source}")]
    Accept {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {target} timed out after {}", format_timeout(.timeout))]
    DialTimeout { target: String, timeout: Duration },

    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    #[error("{direction} connection error: {source}")]
    ConnectionIo {
        direction: Direction,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

fn format_timeout(timeout: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*timeout)
}

impl SessionError {
    /// Whether the error happened before any connection existed
    pub fn is_establishment(&self) -> bool {
        matches!(
            self,
            SessionError::Bind { .. }
                | SessionError::Accept { .. }
                | SessionError::Dial { .. }
                | SessionError::DialTimeout { .. }
                | SessionError::InvalidPort(_)
        )
    }
}
