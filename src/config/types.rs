//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

/// Default dial timeout for client sessions
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub relay: RelayConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

/// Socket settings used by the establisher
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Interface the listener binds to. `::` accepts IPv4 peers as well
    /// where the host allows dual-stack sockets.
    pub listen_addr: IpAddr,
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Duration,
    /// Disable Nagle's algorithm on established connections
    pub nodelay: bool,
}

/// Relay settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    pub buffer_size: usize,
}

/// Interactive navigator settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(with = "humantime_serde")]
    pub tick_rate: Duration,
    pub input_limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                listen_addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
                dial_timeout: DEFAULT_DIAL_TIMEOUT,
                nodelay: true,
            },
            relay: RelayConfig { buffer_size: 8192 },
            ui: UiConfig {
                tick_rate: Duration::from_millis(80),
                input_limit: 156,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
            },
        }
    }
}
