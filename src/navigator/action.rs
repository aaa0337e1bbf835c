//! Navigator transitions
//!
//! `update` is the only place the navigator state changes. It never performs
//! I/O; anything that has to happen outside the state is returned as an
//! [`Effect`] for the event loop to carry out.

use std::net::SocketAddr;

use tracing::debug;

use super::state::NavigatorState;
use crate::error::SessionError;
use crate::session::{Session, Target};

/// Something the user did, or a background result
#[derive(Debug)]
pub enum Action {
    Char(char),
    Backspace,
    Submit,
    Cancel,
    Help,
    Quit,
    /// The listener is bound and waiting for its peer
    Listening(SocketAddr),
    Established(Result<Session, SessionError>),
}

/// What the event loop has to do after an update
#[derive(Debug)]
pub enum Effect {
    None,
    /// Start establishing in the background
    Establish(Target),
    /// Leave the navigator and relay over this session
    Relay(Session),
    /// Exit without a session
    Quit,
}

/// The interactive front end's state machine
#[derive(Debug)]
pub struct Navigator {
    state: NavigatorState,
    input_limit: usize,
}

impl Navigator {
    pub fn new(input_limit: usize) -> Self {
        Self {
            state: NavigatorState::menu(),
            input_limit,
        }
    }

    pub fn state(&self) -> &NavigatorState {
        &self.state
    }

    /// Apply one action
    pub fn update(&mut self, action: Action) -> Effect {
        let before = self.state.mode();
        let effect = self.apply(action);
        let after = self.state.mode();
        if before != after {
            debug!("Navigator {} -> {}", before, after);
        }
        effect
    }

    fn apply(&mut self, action: Action) -> Effect {
        match action {
            Action::Quit => Effect::Quit,
            Action::Cancel => {
                if !self.state.is_loading() {
                    self.state = NavigatorState::menu();
                }
                Effect::None
            }
            Action::Help => {
                if matches!(self.state, NavigatorState::Menu { .. }) {
                    self.state = NavigatorState::Help;
                }
                Effect::None
            }
            Action::Char(c) => {
                let limit = self.input_limit;
                if let Some(input) = self.state.input_mut() {
                    if input.chars().count() < limit {
                        input.push(c);
                    }
                }
                Effect::None
            }
            Action::Backspace => {
                if let Some(input) = self.state.input_mut() {
                    input.pop();
                }
                Effect::None
            }
            Action::Listening(addr) => {
                // Show the bound port, which differs from the typed one for port 0
                if let NavigatorState::Loading {
                    target: Target::Listen { port },
                } = &mut self.state
                {
                    *port = addr.port().to_string();
                }
                Effect::None
            }
            Action::Submit => self.submit(),
            Action::Established(result) => self.established(result),
        }
    }

    fn submit(&mut self) -> Effect {
        match &self.state {
            NavigatorState::Menu { input } => match input.trim() {
                "1" => {
                    self.state = NavigatorState::ServerConfig {
                        input: String::new(),
                    };
                    Effect::None
                }
                "2" => {
                    self.state = NavigatorState::ClientHost {
                        input: String::new(),
                    };
                    Effect::None
                }
                "3" => Effect::Quit,
                _ => Effect::None,
            },
            NavigatorState::ServerConfig { input } => {
                let port = input.trim();
                if port.is_empty() {
                    return Effect::None;
                }
                let target = Target::Listen {
                    port: port.to_string(),
                };
                self.state = NavigatorState::Loading {
                    target: target.clone(),
                };
                Effect::Establish(target)
            }
            NavigatorState::ClientHost { input } => {
                let host = input.trim();
                if host.is_empty() {
                    return Effect::None;
                }
                self.state = NavigatorState::ClientPort {
                    host: host.to_string(),
                    input: String::new(),
                };
                Effect::None
            }
            NavigatorState::ClientPort { host, input } => {
                let port = input.trim();
                if port.is_empty() {
                    return Effect::None;
                }
                let target = Target::Dial {
                    host: host.clone(),
                    port: port.to_string(),
                };
                self.state = NavigatorState::Loading {
                    target: target.clone(),
                };
                Effect::Establish(target)
            }
            NavigatorState::Error { .. } => {
                self.state = NavigatorState::menu();
                Effect::None
            }
            NavigatorState::Loading { .. } | NavigatorState::Help => Effect::None,
        }
    }

    fn established(&mut self, result: Result<Session, SessionError>) -> Effect {
        if !self.state.is_loading() {
            debug!("Ignoring establishment result outside the loading screen");
            return Effect::None;
        }

        match result {
            Ok(session) => Effect::Relay(session),
            Err(e) => {
                self.state = NavigatorState::Error {
                    message: e.to_string(),
                };
                Effect::None
            }
        }
    }
}
