//! Chat transcript engine: optimistic sends, server reconciliation, and the
//! word-by-word reveal of new assistant replies.
//!
//! The engine is pure state. It owns no timers and performs no I/O; the host
//! event loop calls [`Transcript::advance_reveal`] on a fixed interval with the
//! token handed out when the reveal started, and feeds server snapshots through
//! [`Transcript::apply_server_messages`].
//!
//! # Reveal state machine
//!
//! `Idle -> Revealing(target, revealed) -> Idle`. A session switch forces
//! `Idle` and bumps the generation, so every token issued before the switch
//! becomes stale and its ticks are ignored.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::SubmitError;
use crate::types::{DisplayMessage, Message, Role};

/// Delay between two revealed words. Constant across words.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(50);

/// Identifies one reveal run. Ticks carrying any other token are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevealToken {
    generation: u64,
    serial: u64,
}

/// A user message accepted by [`Transcript::submit`], to be sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: String,
    pub content: String,
}

/// Result of feeding a server snapshot into the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Snapshot belongs to a chat that is no longer open.
    Stale,
    /// Server count did not grow; nothing changed.
    Unchanged,
    /// `displayed` was rebuilt. `started` is set when a reveal began and the
    /// host must start driving its timer.
    Applied { started: Option<RevealToken> },
}

/// Result of one reveal tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    /// Token does not match the running reveal (or nothing is running).
    Stale,
    /// One more word is visible.
    Progress { revealed: usize, total: usize },
    /// Full text is in place. `next` is a queued reveal that started right away.
    Completed { next: Option<RevealToken> },
}

#[derive(Debug)]
struct Reveal {
    token: RevealToken,
    message_id: Uuid,
    target: String,
    words: Vec<String>,
    revealed: usize,
}

#[derive(Debug, Default)]
enum RevealState {
    #[default]
    Idle,
    Revealing(Reveal),
}

/// Transcript of the chat currently open in the UI.
#[derive(Debug, Default)]
pub struct Transcript {
    chat_id: Option<String>,
    generation: u64,
    next_serial: u64,
    displayed: Vec<DisplayMessage>,
    reveal: RevealState,
    /// Slot id and full text of each reply waiting for its reveal.
    queued: VecDeque<(Uuid, String)>,
    server_count: usize,
    sending: bool,
    scroll_requested: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages to render, oldest first.
    pub fn displayed(&self) -> &[DisplayMessage] {
        &self.displayed
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn is_revealing(&self) -> bool {
        matches!(self.reveal, RevealState::Revealing(_))
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// A send is outstanding and no reply is being revealed yet.
    pub fn awaiting_reply(&self) -> bool {
        self.sending && !self.is_revealing()
    }

    /// Message count of the last snapshot accepted for this chat.
    pub fn server_count(&self) -> usize {
        self.server_count
    }

    /// Ticks the reveal `token` still needs: one per unrevealed word plus the
    /// completing tick. Zero when `token` is not the running reveal.
    pub fn remaining_ticks(&self, token: RevealToken) -> usize {
        match &self.reveal {
            RevealState::Revealing(r) if r.token == token => r.words.len() - r.revealed + 1,
            _ => 0,
        }
    }

    /// Number of assistant replies waiting for the current reveal to finish.
    pub fn queued_reveals(&self) -> usize {
        self.queued.len()
    }

    /// Returns and clears the pending scroll-to-bottom request.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    /// Makes `chat_id` the open chat and drops everything held for the old one.
    ///
    /// Tokens issued before the switch become stale. The next snapshot for the
    /// new chat rebuilds `displayed` from server data alone.
    pub fn switch_session(&mut self, chat_id: Option<String>) {
        debug!(from = ?self.chat_id, to = ?chat_id, "switching transcript session");
        self.generation = self.generation.wrapping_add(1);
        self.chat_id = chat_id;
        self.displayed.clear();
        self.reveal = RevealState::Idle;
        self.queued.clear();
        self.server_count = 0;
        self.sending = false;
        self.scroll_requested = true;
    }

    /// Shows `text` as a user message immediately and marks a send in flight.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Empty`] when `text` is blank after trimming.
    /// - [`SubmitError::NoSession`] when no chat is open.
    /// - [`SubmitError::InFlight`] while a previous send is outstanding.
    ///
    /// A rejected submission leaves the transcript untouched.
    pub fn submit(&mut self, text: &str) -> Result<OutgoingMessage, SubmitError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(SubmitError::Empty);
        }
        let chat_id = self.chat_id.clone().ok_or(SubmitError::NoSession)?;
        if self.sending {
            return Err(SubmitError::InFlight);
        }

        self.displayed.push(DisplayMessage::optimistic(content));
        self.sending = true;
        self.scroll_requested = true;
        Ok(OutgoingMessage {
            chat_id,
            content: content.to_owned(),
        })
    }

    /// Clears the in-flight flag after the server accepted a send.
    ///
    /// Returns `false` when `chat_id` is no longer open (the result is dropped).
    pub fn send_succeeded(&mut self, chat_id: &str) -> bool {
        if self.chat_id.as_deref() != Some(chat_id) {
            return false;
        }
        self.sending = false;
        true
    }

    /// Clears the in-flight flag after a failed send so the user can retry.
    ///
    /// The optimistic entry stays where it is.
    pub fn send_failed(&mut self, chat_id: &str) -> bool {
        self.send_succeeded(chat_id)
    }

    /// Reconciles a server snapshot of `chat_id` with the local transcript.
    ///
    /// An empty transcript adopts the snapshot verbatim. Otherwise the snapshot
    /// is merged only when it holds strictly more messages than are displayed:
    /// local user entries are kept in order, assistant entries come from the
    /// server, and a fresh newest assistant reply is revealed instead of
    /// inserted (or queued behind a running reveal).
    pub fn apply_server_messages(&mut self, chat_id: &str, messages: &[Message]) -> Reconcile {
        if self.chat_id.as_deref() != Some(chat_id) {
            debug!(chat_id, "dropping snapshot for a chat that is no longer open");
            return Reconcile::Stale;
        }
        self.server_count = messages.len();

        if self.displayed.is_empty() {
            if messages.is_empty() {
                return Reconcile::Unchanged;
            }
            self.displayed = messages.iter().map(DisplayMessage::confirmed).collect();
            self.scroll_requested = true;
            return Reconcile::Applied { started: None };
        }

        // Server edits or deletions of earlier messages never reach this point.
        if messages.len() <= self.displayed.len() {
            return Reconcile::Unchanged;
        }

        let started = self.merge(messages);
        self.scroll_requested = true;
        Reconcile::Applied { started }
    }

    /// Role-based merge. The backend sends no per-message ids, so local user
    /// entries are matched to server user entries by position.
    ///
    /// A fresh reply gets its slot right away: a reveal placeholder, or a
    /// queued placeholder when another reveal is running. Either way
    /// `displayed` holds one entry per server message plus unechoed sends.
    fn merge(&mut self, messages: &[Message]) -> Option<RevealToken> {
        let newest_is_assistant = self
            .displayed
            .last()
            .is_some_and(|m| m.role == Role::Assistant);
        let reveal_running = self.is_revealing();

        let mut local_users: VecDeque<DisplayMessage> = VecDeque::new();
        let mut local_assistants: VecDeque<DisplayMessage> = VecDeque::new();
        for entry in self.displayed.drain(..) {
            match entry.role {
                Role::User => local_users.push_back(entry),
                Role::Assistant => local_assistants.push_back(entry),
            }
        }

        let last = messages.len() - 1;
        let mut merged = Vec::with_capacity(messages.len() + local_users.len());
        let mut fresh_reply = None;

        for (idx, msg) in messages.iter().enumerate() {
            match msg.role {
                Role::User => merged.push(
                    local_users
                        .pop_front()
                        .unwrap_or_else(|| DisplayMessage::confirmed(msg)),
                ),
                Role::Assistant => match local_assistants.pop_front() {
                    Some(existing) if existing.revealing || existing.queued => {
                        merged.push(existing);
                    }
                    Some(existing) => merged.push(DisplayMessage {
                        content: msg.content.clone(),
                        timestamp: msg.timestamp,
                        ..existing
                    }),
                    None if idx == last && !newest_is_assistant => {
                        let slot = if reveal_running {
                            DisplayMessage::queued_placeholder()
                        } else {
                            DisplayMessage::reveal_placeholder()
                        };
                        fresh_reply = Some((slot.id, msg.content.clone()));
                        merged.push(slot);
                    }
                    None => merged.push(DisplayMessage::confirmed(msg)),
                },
            }
        }
        // User messages the server has not echoed yet stay at the tail.
        merged.extend(local_users);
        self.displayed = merged;

        let (slot_id, target) = fresh_reply?;
        if reveal_running {
            debug!(queued = self.queued.len() + 1, "reveal running, queueing reply");
            self.queued.push_back((slot_id, target));
            return None;
        }
        Some(self.start_reveal(slot_id, target))
    }

    /// Turns the entry `message_id` into the running reveal of `target`.
    fn start_reveal(&mut self, message_id: Uuid, target: String) -> RevealToken {
        let token = RevealToken {
            generation: self.generation,
            serial: self.next_serial,
        };
        self.next_serial = self.next_serial.wrapping_add(1);

        let words: Vec<String> = target.split_whitespace().map(str::to_owned).collect();
        debug!(words = words.len(), "starting reveal");
        if let Some(entry) = self.displayed.iter_mut().find(|m| m.id == message_id) {
            entry.content.clear();
            entry.revealing = true;
            entry.queued = false;
        }

        self.reveal = RevealState::Revealing(Reveal {
            token,
            message_id,
            target,
            words,
            revealed: 0,
        });
        self.scroll_requested = true;
        token
    }

    /// Advances the reveal identified by `token` by one word.
    ///
    /// After the last word, the next tick writes the target text verbatim,
    /// clears the revealing flag and starts the next queued reply if any.
    pub fn advance_reveal(&mut self, token: RevealToken) -> RevealStep {
        let reveal = match &mut self.reveal {
            RevealState::Revealing(r) if r.token == token => r,
            _ => {
                trace!(?token, "ignoring stale reveal tick");
                return RevealStep::Stale;
            }
        };
        self.scroll_requested = true;

        if reveal.revealed < reveal.words.len() {
            reveal.revealed += 1;
            let text = reveal.words[..reveal.revealed].join(" ");
            if let Some(entry) = self.displayed.iter_mut().find(|m| m.id == reveal.message_id) {
                entry.content = text;
            }
            return RevealStep::Progress {
                revealed: reveal.revealed,
                total: reveal.words.len(),
            };
        }

        let message_id = reveal.message_id;
        let target = std::mem::take(&mut reveal.target);
        self.reveal = RevealState::Idle;
        if let Some(entry) = self.displayed.iter_mut().find(|m| m.id == message_id) {
            entry.content = target;
            entry.revealing = false;
        }
        debug!("reveal completed");

        let next = self
            .queued
            .pop_front()
            .map(|(id, target)| self.start_reveal(id, target));
        RevealStep::Completed { next }
    }
}
