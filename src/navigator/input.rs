//! Terminal input
//!
//! Key events are read on a dedicated thread and forwarded into the event
//! loop's channel. The thread polls with a short timeout so it can be stopped
//! before the relay starts reading standard input.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::action::Action;
use super::state::NavigatorState;
use super::NavEvent;

/// How long the input thread blocks before re-checking whether to stop
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Translate a key press into a navigator action for the current state
pub fn map_key(state: &NavigatorState, key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::F(1) => Some(Action::Help),
        KeyCode::Char('?') if matches!(state, NavigatorState::Menu { .. }) => Some(Action::Help),
        KeyCode::Char(c) if state.accepts_text() => Some(Action::Char(c)),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    }
}

/// Background thread feeding terminal events into the event loop
pub struct InputPump {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl InputPump {
    pub fn spawn(tx: mpsc::UnboundedSender<NavEvent>, poll_interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            debug!("Terminal input thread started");
            while flag.load(Ordering::Relaxed) {
                let event = match event::poll(poll_interval) {
                    Ok(true) => event::read(),
                    Ok(false) => continue,
                    Err(e) => Err(e),
                };

                let forwarded = match event {
                    Ok(Event::Key(key)) => tx.send(NavEvent::Key(key)),
                    Ok(Event::Resize(..)) => tx.send(NavEvent::Resize),
                    Ok(_) => Ok(()),
                    Err(e) => {
                        warn!("Failed to read terminal event: {}", e);
                        let _ = tx.send(NavEvent::InputFailed(e.to_string()));
                        break;
                    }
                };

                // Receiver gone: the event loop has exited
                if forwarded.is_err() {
                    break;
                }
            }
            debug!("Terminal input thread stopped");
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the thread and wait for it, so no further input is consumed
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Terminal input thread panicked");
            }
        }
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Target;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(map_key(&NavigatorState::menu(), ctrl_c), Some(Action::Quit)));
        let loading = NavigatorState::Loading {
            target: Target::Listen { port: "1".into() },
        };
        assert!(matches!(map_key(&loading, ctrl_c), Some(Action::Quit)));
    }

    #[test]
    fn test_q_is_text_while_typing() {
        let host = NavigatorState::ClientHost {
            input: String::new(),
        };
        assert!(matches!(map_key(&host, press(KeyCode::Char('q'))), Some(Action::Char('q'))));
        assert!(matches!(
            map_key(&NavigatorState::Help, press(KeyCode::Char('q'))),
            Some(Action::Quit)
        ));
        let error = NavigatorState::Error {
            message: "refused".into(),
        };
        assert!(matches!(map_key(&error, press(KeyCode::Char('q'))), Some(Action::Quit)));
    }

    #[test]
    fn test_help_keys() {
        assert!(matches!(
            map_key(&NavigatorState::menu(), press(KeyCode::Char('?'))),
            Some(Action::Help)
        ));
        assert!(matches!(
            map_key(&NavigatorState::menu(), press(KeyCode::F(1))),
            Some(Action::Help)
        ));
        let server = NavigatorState::ServerConfig {
            input: String::new(),
        };
        assert!(matches!(map_key(&server, press(KeyCode::Char('?'))), Some(Action::Char('?'))));
    }

    #[test]
    fn test_editing_keys() {
        let menu = NavigatorState::menu();
        assert!(matches!(map_key(&menu, press(KeyCode::Enter)), Some(Action::Submit)));
        assert!(matches!(map_key(&menu, press(KeyCode::Esc)), Some(Action::Cancel)));
        assert!(matches!(map_key(&menu, press(KeyCode::Backspace)), Some(Action::Backspace)));
        assert!(map_key(&menu, press(KeyCode::Tab)).is_none());
        assert!(map_key(&NavigatorState::Help, press(KeyCode::Char('1'))).is_none());
    }

    #[test]
    fn test_release_events_are_ignored() {
        let mut key = press(KeyCode::Enter);
        key.kind = KeyEventKind::Release;
        assert!(map_key(&NavigatorState::menu(), key).is_none());
    }
}
