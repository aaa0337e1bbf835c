//! Netly Library
//!
//! A netcat-style TCP tool: listen for or dial a single peer, then relay the
//! local standard streams over the connection until either side finishes.
//! Sessions can be set up directly or through an interactive terminal
//! navigator.

pub mod config;
pub mod console;
pub mod error;
pub mod navigator;
pub mod relay;
pub mod session;
pub mod shutdown;
pub mod theme;

pub use config::Config;
pub use console::Console;
pub use error::SessionError;
pub use relay::{RelayEngine, RelayOutcome, Termination};
pub use session::{Establisher, Session, Target};
pub use shutdown::ShutdownCoordinator;
pub use theme::Theme;

/// Common error type for netly
pub type Result<T> = anyhow::Result<T>;
