//! Navigator state
//!
//! Each variant carries only the fields meaningful in that mode, so a
//! captured port outside client-port or an error message outside the error
//! screen cannot be represented.

use std::fmt;

use crate::session::Target;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigatorState {
    /// Role selection
    Menu { input: String },
    /// Listen mode, asking for the port
    ServerConfig { input: String },
    /// Connect mode, asking for the host
    ClientHost { input: String },
    /// Connect mode, host captured, asking for the port
    ClientPort { host: String, input: String },
    /// Establishment running in the background
    Loading { target: Target },
    /// Establishment failed
    Error { message: String },
    /// Help overlay on top of the menu
    Help,
}

/// Discriminant of [`NavigatorState`], for display and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Menu,
    ServerConfig,
    ClientHost,
    ClientPort,
    Loading,
    Error,
    Help,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Menu => "menu",
            Mode::ServerConfig => "server-config",
            Mode::ClientHost => "client-config-host",
            Mode::ClientPort => "client-config-port",
            Mode::Loading => "loading",
            Mode::Error => "error",
            Mode::Help => "help",
        };
        f.write_str(name)
    }
}

impl Default for NavigatorState {
    fn default() -> Self {
        Self::menu()
    }
}

impl NavigatorState {
    /// Fresh menu with an empty input line
    pub fn menu() -> Self {
        NavigatorState::Menu {
            input: String::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            NavigatorState::Menu { .. } => Mode::Menu,
            NavigatorState::ServerConfig { .. } => Mode::ServerConfig,
            NavigatorState::ClientHost { .. } => Mode::ClientHost,
            NavigatorState::ClientPort { .. } => Mode::ClientPort,
            NavigatorState::Loading { .. } => Mode::Loading,
            NavigatorState::Error { .. } => Mode::Error,
            NavigatorState::Help => Mode::Help,
        }
    }

    /// Current input line, if this mode takes typed input
    pub fn input(&self) -> Option<&str> {
        match self {
            NavigatorState::Menu { input }
            | NavigatorState::ServerConfig { input }
            | NavigatorState::ClientHost { input }
            | NavigatorState::ClientPort { input, .. } => Some(input),
            _ => None,
        }
    }

    pub(crate) fn input_mut(&mut self) -> Option<&mut String> {
        match self {
            NavigatorState::Menu { input }
            | NavigatorState::ServerConfig { input }
            | NavigatorState::ClientHost { input }
            | NavigatorState::ClientPort { input, .. } => Some(input),
            _ => None,
        }
    }

    pub fn accepts_text(&self) -> bool {
        self.input().is_some()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, NavigatorState::Loading { .. })
    }
}
