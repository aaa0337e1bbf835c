//! Session Types

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use tokio::net::TcpStream;
use tracing::debug;
use uuid::Uuid;

use crate::error::SessionError;

/// Which side of the connection this process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Server,
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => write!(f, "server"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// Lifecycle of a session. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Established,
    Closed,
}

impl SessionState {
    /// Whether `next` is the single legal successor of this state
    pub fn can_advance_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Connecting, SessionState::Established)
                | (SessionState::Established, SessionState::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Established => write!(f, "established"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// One TCP connection and its lifecycle
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    role: Role,
    state: SessionState,
    local_addr: Option<SocketAddr>,
    remote_addr: Option<SocketAddr>,
    established_at: Option<Instant>,
    stream: Option<TcpStream>,
}

impl Session {
    /// Create a session that has not connected yet
    pub fn new(role: Role) -> Self {
        let id = Uuid::new_v4();
        debug!(session_id = %id, %role, "Creating session");

        Self {
            id,
            role,
            state: SessionState::Connecting,
            local_addr: None,
            remote_addr: None,
            established_at: None,
            stream: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn established_at(&self) -> Option<Instant> {
        self.established_at
    }

    /// Attach the connected stream and move to `Established`
    pub fn establish(&mut self, stream: TcpStream) -> Result<(), SessionError> {
        self.advance(SessionState::Established)?;

        // Addresses are informational; a socket that cannot report them is still usable
        self.local_addr = stream.local_addr().ok().map(canonical);
        self.remote_addr = stream.peer_addr().ok().map(canonical);
        self.established_at = Some(Instant::now());
        self.stream = Some(stream);

        debug!(
            session_id = %self.id,
            role = %self.role,
            local_addr = ?self.local_addr,
            remote_addr = ?self.remote_addr,
            "Session established"
        );
        Ok(())
    }

    /// Hand the connection over to the relay. The session keeps its metadata.
    pub fn take_stream(&mut self) -> Option<TcpStream> {
        self.stream.take()
    }

    /// Move to `Closed`, dropping the connection if it is still attached
    pub fn close(&mut self) -> Result<(), SessionError> {
        self.advance(SessionState::Closed)?;
        self.stream = None;
        debug!(session_id = %self.id, "Session closed");
        Ok(())
    }

    fn advance(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_advance_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Report IPv4 peers of a dual-stack socket as plain IPv4
fn canonical(addr: SocketAddr) -> SocketAddr {
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), accepted.unwrap().0)
    }

    #[test]
    fn test_state_order() {
        assert!(SessionState::Connecting.can_advance_to(SessionState::Established));
        assert!(SessionState::Established.can_advance_to(SessionState::Closed));
        assert!(!SessionState::Connecting.can_advance_to(SessionState::Closed));
        assert!(!SessionState::Closed.can_advance_to(SessionState::Established));
        assert!(!SessionState::Established.can_advance_to(SessionState::Connecting));
        assert!(!SessionState::Closed.can_advance_to(SessionState::Closed));
    }

    #[test]
    fn test_close_before_establish_is_rejected() {
        let mut session = Session::new(Role::Client);
        let err = session.close().unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: SessionState::Connecting,
                to: SessionState::Closed
            }
        ));
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (client, _server) = connected_pair().await;
        let peer = client.peer_addr().unwrap();

        let mut session = Session::new(Role::Client);
        assert!(session.remote_addr().is_none());

        session.establish(client).unwrap();
        assert_eq!(session.state(), SessionState::Established);
        assert_eq!(session.remote_addr(), Some(peer));
        assert!(session.established_at().is_some());

        assert!(session.take_stream().is_some());
        assert!(session.take_stream().is_none());

        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.close().is_err());
    }

    #[tokio::test]
    async fn test_establish_twice_is_rejected() {
        let (a, b) = connected_pair().await;
        let mut session = Session::new(Role::Server);
        session.establish(a).unwrap();
        assert!(session.establish(b).is_err());
        assert_eq!(session.state(), SessionState::Established);
    }

    #[test]
    fn test_canonical_unmaps_ipv4() {
        let mapped: SocketAddr = "[::ffff:10.0.0.7]:4444".parse().unwrap();
        assert_eq!(canonical(mapped), "10.0.0.7:4444".parse::<SocketAddr>().unwrap());

        let v6: SocketAddr = "[::1]:4444".parse().unwrap();
        assert_eq!(canonical(v6), v6);
    }
}
