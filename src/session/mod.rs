//! Session Module
//!
//! A session is one TCP connection with a role and a forward-only lifecycle.
//! The establisher is the only place sessions are created.

pub mod establisher;
pub mod types;

pub use establisher::{parse_port, Establisher, PendingListener, Target};
pub use types::{Role, Session, SessionState};
