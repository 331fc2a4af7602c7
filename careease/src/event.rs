//! Event bus for careease.
//!
//! Terminal input, timers, reveal ticks and backend results are normalised
//! into [`AppEvent`] and sent over one tokio unbounded channel. The main loop
//! is the only consumer and the only place state is mutated.
//!
//! - **Render interval** (33 ms) triggers a `terminal.draw()` call.
//! - **Tick interval** (250 ms) drives toasts, polling and alarm checks.
//! - **Reveal timer** (per reveal, default 50 ms) is spawned on demand with
//!   [`spawn_reveal_timer`] and aborted when the reveal ends or the chat changes.

use std::time::Duration;

use careease_core::RevealToken;
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant};

use crate::backend::types::Response;

#[derive(Debug)]
#[non_exhaustive]
pub enum AppEvent {
    /// Key press (`KeyEventKind::Press` only).
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Terminal was resized to (columns, rows).
    Resize(u16, u16),
    /// Logic tick (250 ms).
    Tick,
    /// Render tick (33 ms).
    Render,
    /// One step of the reveal identified by the token.
    RevealTick(RevealToken),
    /// Result from the backend worker.
    Backend(Box<Response>),
    Quit,
}

/// Sender and receiver ends of the unified event channel.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the task that forwards terminal input and the render/logic ticks.
///
/// Exits once the receiver is gone.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            let sent = tokio::select! {
                _ = tick_tick => tx.send(AppEvent::Tick),
                _ = render_tick => tx.send(AppEvent::Render),
                maybe_event = crossterm_event => match maybe_event {
                    // Windows reports both press and release.
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        tx.send(AppEvent::Key(key))
                    }
                    Some(Ok(Event::Resize(w, h))) => tx.send(AppEvent::Resize(w, h)),
                    Some(Ok(Event::Mouse(mouse))) => tx.send(AppEvent::Mouse(mouse)),
                    _ => Ok(()),
                },
            };
            if sent.is_err() {
                break;
            }
        }
    });
}

/// Sends `RevealTick(token)` every `period`, first one after a full period,
/// and stops after `ticks` sends.
///
/// The engine ignores ticks for a token it no longer runs, so a timer aborted
/// late does no harm.
pub fn spawn_reveal_timer(
    tx: mpsc::UnboundedSender<AppEvent>,
    token: RevealToken,
    ticks: usize,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        for _ in 0..ticks {
            interval.tick().await;
            if tx.send(AppEvent::RevealTick(token)).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use careease_core::types::{Message, Role};
    use careease_core::{Reconcile, Transcript};

    use super::*;

    fn running_token() -> RevealToken {
        let mut t = Transcript::new();
        t.switch_session(Some("c1".to_owned()));
        t.submit("q").expect("submit");
        let snapshot = [Message::new(Role::User, "q"), Message::new(Role::Assistant, "a b")];
        match t.apply_server_messages("c1", &snapshot) {
            Reconcile::Applied { started: Some(token) } => token,
            other => panic!("expected a reveal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reveal_timer_stops_after_its_tick_budget() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = running_token();
        let handle = spawn_reveal_timer(tx, token, 3, Duration::from_millis(1));

        let mut received = 0;
        while let Some(event) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timer finished in time")
        {
            assert!(matches!(event, AppEvent::RevealTick(t) if t == token));
            received += 1;
        }
        assert_eq!(received, 3);
        assert!(handle.await.is_ok());
    }
}
