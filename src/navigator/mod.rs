//! Interactive Navigator
//!
//! A single-threaded event loop over one channel. Terminal input (from the
//! input thread) and establishment results (from spawned tasks) arrive as
//! [`NavEvent`]s and are applied to the [`Navigator`] one at a time, so the
//! state is never touched concurrently.

pub mod action;
pub mod input;
pub mod state;
pub mod view;

pub use action::{Action, Effect, Navigator};
pub use state::{Mode, NavigatorState};

use std::net::SocketAddr;

use anyhow::{bail, Context};
use crossterm::event::KeyEvent;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::SessionError;
use crate::session::{parse_port, Establisher, Session, Target};
use crate::theme::Theme;
use crate::Result;
use input::{InputPump, INPUT_POLL_INTERVAL};

/// Everything the event loop reacts to
#[derive(Debug)]
pub enum NavEvent {
    Key(KeyEvent),
    Resize,
    Listening(SocketAddr),
    Established(std::result::Result<Session, SessionError>),
    InputFailed(String),
}

/// Run the interactive front end.
///
/// Returns the established session, or `None` when the user quit. The
/// terminal is restored and the input thread stopped before returning.
pub async fn run(config: &Config, theme: &Theme) -> Result<Option<Session>> {
    let establisher = Establisher::from_config(config);
    let mut navigator = Navigator::new(config.ui.input_limit);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut terminal = ratatui::try_init().context("Failed to initialise terminal")?;
    let pump = InputPump::spawn(tx.clone(), INPUT_POLL_INTERVAL);

    let result = event_loop(
        &mut terminal,
        &mut navigator,
        &establisher,
        theme,
        config,
        tx,
        &mut rx,
    )
    .await;

    pump.stop();
    ratatui::restore();

    match &result {
        Ok(Some(session)) => info!("Navigator handing session {} to the relay", session.id()),
        Ok(None) => debug!("Navigator exited without a session"),
        Err(e) => debug!("Navigator failed: {:#}", e),
    }
    result
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    navigator: &mut Navigator,
    establisher: &Establisher,
    theme: &Theme,
    config: &Config,
    tx: mpsc::UnboundedSender<NavEvent>,
    rx: &mut mpsc::UnboundedReceiver<NavEvent>,
) -> Result<Option<Session>> {
    let mut ticker = interval(config.ui.tick_rate);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick: usize = 0;

    loop {
        terminal.draw(|f| view::draw(f, navigator.state(), theme, tick))?;

        let event = tokio::select! {
            Some(event) = rx.recv() => event,
            _ = ticker.tick() => {
                tick = tick.wrapping_add(1);
                continue;
            }
        };

        let action = match event {
            NavEvent::Key(key) => match input::map_key(navigator.state(), key) {
                Some(action) => action,
                None => continue,
            },
            NavEvent::Resize => continue,
            NavEvent::Listening(addr) => Action::Listening(addr),
            NavEvent::Established(result) => Action::Established(result),
            NavEvent::InputFailed(message) => bail!("Terminal input failed: {}", message),
        };

        match navigator.update(action) {
            Effect::None => {}
            Effect::Establish(target) => spawn_establish(establisher.clone(), target, tx.clone()),
            Effect::Relay(session) => return Ok(Some(session)),
            Effect::Quit => return Ok(None),
        }
    }
}

/// Establish in the background and post the result back to the loop
fn spawn_establish(establisher: Establisher, target: Target, tx: mpsc::UnboundedSender<NavEvent>) {
    debug!("Establishing {}", target);
    tokio::spawn(async move {
        let result = match &target {
            Target::Listen { port } => listen_reporting(&establisher, port, &tx).await,
            Target::Dial { .. } => establisher.establish(&target).await,
        };
        if let Err(e) = &result {
            debug!("Establishing {} failed: {}", target, e);
        }
        // The loop may already have quit
        let _ = tx.send(NavEvent::Established(result));
    });
}

/// Bind, post the bound address, then wait for the peer
async fn listen_reporting(
    establisher: &Establisher,
    port: &str,
    tx: &mpsc::UnboundedSender<NavEvent>,
) -> std::result::Result<Session, SessionError> {
    let pending = establisher.bind(parse_port(port)?).await?;
    let _ = tx.send(NavEvent::Listening(pending.local_addr()));
    pending.accept().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failed_establishment_is_posted_back() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let target = Target::Listen {
            port: "not-a-port".to_string(),
        };

        spawn_establish(Establisher::new(), target, tx);

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            event,
            NavEvent::Established(Err(SessionError::InvalidPort(_)))
        ));
    }

    #[tokio::test]
    async fn test_dial_result_drives_navigator() {
        let establisher = Establisher::new();
        let pending = establisher.bind(0).await.unwrap();
        let port = pending.local_addr().port();
        let server = tokio::spawn(pending.accept());

        let mut navigator = Navigator::new(156);
        let (tx, mut rx) = mpsc::unbounded_channel();
        for action in [Action::Char('2'), Action::Submit] {
            navigator.update(action);
        }
        for c in "127.0.0.1".chars() {
            navigator.update(Action::Char(c));
        }
        navigator.update(Action::Submit);
        for c in port.to_string().chars() {
            navigator.update(Action::Char(c));
        }

        match navigator.update(Action::Submit) {
            Effect::Establish(target) => spawn_establish(establisher.clone(), target, tx),
            other => panic!("unexpected effect {:?}", other),
        }

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let result = match event {
            NavEvent::Established(result) => result,
            other => panic!("unexpected event {:?}", other),
        };

        match navigator.update(Action::Established(result)) {
            Effect::Relay(session) => {
                assert_eq!(session.role(), crate::session::Role::Client);
                assert_eq!(session.remote_addr().map(|a| a.port()), Some(port));
            }
            other => panic!("unexpected effect {:?}", other),
        }
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_listen_posts_bound_address_first() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let establisher = Establisher::new();
        let target = Target::Listen {
            port: "0".to_string(),
        };

        spawn_establish(establisher.clone(), target, tx);

        let port = match tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
        {
            NavEvent::Listening(addr) => addr.port(),
            other => panic!("unexpected event {:?}", other),
        };
        assert_ne!(port, 0);

        let _client = establisher.dial("127.0.0.1", port).await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, NavEvent::Established(Ok(_))));
    }
}
