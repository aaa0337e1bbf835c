//! Session Establisher
//!
//! Opens exactly one TCP connection, either by accepting a single inbound
//! peer or by dialing out with a bounded timeout. Nothing is retried.

use std::fmt;
use std::io;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{Role, Session};
use crate::config::Config;
use crate::error::SessionError;

/// What the user asked to open, as typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Listen { port: String },
    Dial { host: String, port: String },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Listen { port } => write!(f, "port {}", port),
            Target::Dial { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// Parse a user supplied port number
pub fn parse_port(raw: &str) -> Result<u16, SessionError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| SessionError::InvalidPort(raw.to_string()))
}

/// Format `host:port`, bracketing IPv6 literals
fn display_target(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, port),
        _ => format!("{}:{}", host, port),
    }
}

/// Produces established sessions
#[derive(Debug, Clone)]
pub struct Establisher {
    listen_addr: IpAddr,
    dial_timeout: Duration,
    nodelay: bool,
}

impl Establisher {
    /// Create an establisher with default settings
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Create an establisher with a custom dial timeout
    pub fn with_timeout(dial_timeout: Duration) -> Self {
        Self {
            dial_timeout,
            ..Self::new()
        }
    }

    /// Create an establisher from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            listen_addr: config.network.listen_addr,
            dial_timeout: config.network.dial_timeout,
            nodelay: config.network.nodelay,
        }
    }

    /// Bind on the given interface instead of the configured one
    pub fn listening_on(mut self, addr: IpAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    /// Bind the listening socket without waiting for a peer
    pub async fn bind(&self, port: u16) -> Result<PendingListener, SessionError> {
        let bind_addr = SocketAddr::new(self.listen_addr, port);
        debug!("Binding TCP listener to {}", bind_addr);

        let listener = match TcpListener::bind(bind_addr).await {
            Err(e) if needs_ipv4_fallback(bind_addr, &e) => {
                let fallback = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
                debug!("IPv6 unavailable ({}), binding {} instead", e, fallback);
                TcpListener::bind(fallback).await
            }
            other => other,
        }
        .map_err(|source| SessionError::Bind { port, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| SessionError::Bind { port, source })?;

        info!("Listening on {}", local_addr);
        Ok(PendingListener {
            listener,
            local_addr,
            nodelay: self.nodelay,
        })
    }

    /// Bind and wait for exactly one inbound connection
    pub async fn listen(&self, port: u16) -> Result<Session, SessionError> {
        self.bind(port).await?.accept().await
    }

    /// Connect to `host:port` within the dial timeout
    pub async fn dial(&self, host: &str, port: u16) -> Result<Session, SessionError> {
        self.dial_with(host, port, |addr| TcpStream::connect(addr)).await
    }

    /// `dial` with the per-address connect step supplied by the caller
    async fn dial_with<F, Fut>(
        &self,
        host: &str,
        port: u16,
        connect: F,
    ) -> Result<Session, SessionError>
    where
        F: Fn(SocketAddr) -> Fut,
        Fut: Future<Output = io::Result<TcpStream>>,
    {
        let target = display_target(host, port);
        debug!("Dialing {} (timeout: {:?})", target, self.dial_timeout);

        let attempt = async {
            let addrs = lookup_host((host, port))
                .await
                .map_err(|source| SessionError::Dial {
                    target: target.clone(),
                    source,
                })?;

            let mut last_error = None;
            for addr in addrs {
                match connect(addr).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => {
                        warn!("Failed to connect to {}: {}", addr, e);
                        last_error = Some(e);
                    }
                }
            }

            Err(SessionError::Dial {
                target: target.clone(),
                source: last_error.unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")
                }),
            })
        };

        let stream = match timeout(self.dial_timeout, attempt).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SessionError::DialTimeout {
                    target,
                    timeout: self.dial_timeout,
                })
            }
        };

        info!("Connected to {}", target);
        let mut session = Session::new(Role::Client);
        prepare_stream(&stream, self.nodelay);
        session.establish(stream)?;
        Ok(session)
    }

    /// Open whatever the target describes, validating the typed port first
    pub async fn establish(&self, target: &Target) -> Result<Session, SessionError> {
        match target {
            Target::Listen { port } => {
                let port = parse_port(port)?;
                self.listen(port).await
            }
            Target::Dial { host, port } => {
                let port = match parse_port(port)? {
                    0 => return Err(SessionError::InvalidPort("0".to_string())),
                    port => port,
                };
                self.dial(host.trim(), port).await
            }
        }
    }
}

impl Default for Establisher {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound listener that has not accepted its single peer yet
#[derive(Debug)]
pub struct PendingListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    nodelay: bool,
}

impl PendingListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept one connection. The listening socket is closed on return.
    pub async fn accept(self) -> Result<Session, SessionError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|source| SessionError::Accept {
                addr: self.local_addr,
                source,
            })?;

        info!("Accepted connection from {}", peer);
        let mut session = Session::new(Role::Server);
        prepare_stream(&stream, self.nodelay);
        session.establish(stream)?;
        Ok(session)
    }
}

/// Only an unspecified IPv6 bind on a host without IPv6 gets retried
fn needs_ipv4_fallback(addr: SocketAddr, err: &io::Error) -> bool {
    addr.ip() == IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        && matches!(
            err.kind(),
            io::ErrorKind::AddrNotAvailable | io::ErrorKind::Unsupported
        )
}

fn prepare_stream(stream: &TcpStream, nodelay: bool) {
    if nodelay {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DIAL_TIMEOUT;
    use std::time::Instant;

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("4444").unwrap(), 4444);
        assert_eq!(parse_port(" 80 ").unwrap(), 80);
        assert!(matches!(parse_port("http"), Err(SessionError::InvalidPort(p)) if p == "http"));
        assert!(parse_port("65536").is_err());
        assert!(parse_port("").is_err());
    }

    #[test]
    fn test_display_target() {
        assert_eq!(display_target("127.0.0.1", 5000), "127.0.0.1:5000");
        assert_eq!(display_target("::1", 5000), "[::1]:5000");
        assert_eq!(display_target("example.com", 80), "example.com:80");
    }

    #[test]
    fn test_target_display() {
        let dial = Target::Dial {
            host: "10.0.0.5".to_string(),
            port: "22".to_string(),
        };
        assert_eq!(dial.to_string(), "10.0.0.5:22");
        let listen = Target::Listen {
            port: "4444".to_string(),
        };
        assert_eq!(listen.to_string(), "port 4444");
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(Establisher::new().dial_timeout(), DEFAULT_DIAL_TIMEOUT);
        assert_eq!(
            Establisher::with_timeout(Duration::from_millis(250)).dial_timeout(),
            Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn test_establish_rejects_bad_port_before_io() {
        let establisher = Establisher::new();
        let target = Target::Dial {
            host: "127.0.0.1".to_string(),
            port: "not-a-port".to_string(),
        };
        let err = establisher.establish(&target).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPort(_)));

        let target = Target::Dial {
            host: "127.0.0.1".to_string(),
            port: "0".to_string(),
        };
        assert!(matches!(
            establisher.establish(&target).await,
            Err(SessionError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_ipv4_fallback_only_for_unspecified_v6() {
        let unsupported = io::Error::from(io::ErrorKind::Unsupported);
        let in_use = io::Error::from(io::ErrorKind::AddrInUse);
        let any_v6: SocketAddr = "[::]:4444".parse().unwrap();
        let loopback_v6: SocketAddr = "[::1]:4444".parse().unwrap();

        assert!(needs_ipv4_fallback(any_v6, &unsupported));
        assert!(needs_ipv4_fallback(
            any_v6,
            &io::Error::from(io::ErrorKind::AddrNotAvailable)
        ));
        assert!(!needs_ipv4_fallback(any_v6, &in_use));
        assert!(!needs_ipv4_fallback(loopback_v6, &unsupported));
    }

    #[tokio::test]
    async fn test_listening_on_loopback() {
        let establisher = Establisher::new().listening_on(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let pending = establisher.bind(0).await.unwrap();
        assert_eq!(pending.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_dial_times_out_when_connect_hangs() {
        let timeout = Duration::from_millis(100);
        let establisher = Establisher::with_timeout(timeout);

        let started = Instant::now();
        let result = establisher
            .dial_with("127.0.0.1", 4444, |_| {
                std::future::pending::<io::Result<TcpStream>>()
            })
            .await;
        let elapsed = started.elapsed();

        match result {
            Err(SessionError::DialTimeout { target, timeout: t }) => {
                assert_eq!(target, "127.0.0.1:4444");
                assert_eq!(t, timeout);
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(1), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_dial_reports_last_connect_error() {
        let establisher = Establisher::new();
        let result = establisher
            .dial_with("127.0.0.1", 4444, |_| async {
                Err::<TcpStream, _>(io::Error::from(io::ErrorKind::ConnectionRefused))
            })
            .await;

        match result {
            Err(SessionError::Dial { target, source }) => {
                assert_eq!(target, "127.0.0.1:4444");
                assert_eq!(source.kind(), io::ErrorKind::ConnectionRefused);
            }
            other => panic!("expected a dial failure, got {:?}", other),
        }
    }
}
