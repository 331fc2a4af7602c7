//! Central application state for careease.
//!
//! Owns everything the UI shows: focus and mode, the chat list, the open
//! [`Transcript`], form buffers, alarms and toasts. No rendering lives here.
//! The keybinding dispatcher and the main loop mutate it; backend results
//! arrive through [`AppState::apply_response`].
//!
//! Side effects leave this module in two ways only: requests pushed onto
//! `api_tx`, and a pending [`TimerCommand`] the main loop picks up to start or
//! stop the reveal timer.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use careease_core::types::{
    parse_local_time, Alarm, AlarmUpdate, Category, ChatSession, ChatStatus, Dashboard, NewAlarm,
    NewChat, Priority, Review, Role, User, ALARM_TIME_FORMAT,
};
use careease_core::{ApiError, Reconcile, RevealStep, RevealToken, SubmitError, Transcript};
use chrono::{DateTime, Local, Utc};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::backend::types::{AlarmChange, Request, Response};
use crate::theme::{Theme, ThemeName};

const TOAST_TTL: Duration = Duration::from_secs(4);
const ALARM_TOAST_TTL: Duration = Duration::from_secs(15);
const MAX_TOASTS: usize = 4;
/// How often loaded alarms are checked for being due.
pub const ALARM_CHECK_INTERVAL: Duration = Duration::from_secs(30);
/// How often the dashboard reloads while it is shown.
pub const DASHBOARD_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Typing into the message composer.
    Compose,
    NewChat,
    Review,
    NewAlarm,
    Help,
    ConfirmDelete,
    /// Stats overlay with the chats awaiting a rating.
    Dashboard,
}

/// Which panel receives navigation keys.
///
/// Cycle order: `Chats` -> `Transcript` -> `Alarms` -> `Chats`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    #[default]
    Chats,
    Transcript,
    Alarms,
}

impl PanelFocus {
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::Chats => PanelFocus::Alarms,
            PanelFocus::Transcript => PanelFocus::Chats,
            PanelFocus::Alarms => PanelFocus::Transcript,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PanelFocus::Chats => PanelFocus::Transcript,
            PanelFocus::Transcript => PanelFocus::Alarms,
            PanelFocus::Alarms => PanelFocus::Chats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
    Alarm,
}

/// A transient notification in the top-right corner.
#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

/// What the confirmation dialog will delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Chat { id: String, title: String },
    Alarm { id: String, name: String },
}

impl DeleteTarget {
    pub fn describe(&self) -> String {
        match self {
            DeleteTarget::Chat { title, .. } => format!("chat \"{title}\""),
            DeleteTarget::Alarm { name, .. } => format!("alarm \"{name}\""),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NewChatField {
    #[default]
    Title,
    Issue,
    Category,
    Priority,
}

impl NewChatField {
    pub fn next(self) -> Self {
        match self {
            NewChatField::Title => NewChatField::Issue,
            NewChatField::Issue => NewChatField::Category,
            NewChatField::Category => NewChatField::Priority,
            NewChatField::Priority => NewChatField::Title,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct NewChatForm {
    pub title: String,
    pub issue: String,
    pub category: Category,
    pub priority: Priority,
    pub field: NewChatField,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReviewField {
    #[default]
    Rating,
    Feedback,
}

#[derive(Debug, Clone)]
pub struct ReviewForm {
    pub rating: u8,
    pub feedback: String,
    pub field: ReviewField,
}

impl Default for ReviewForm {
    fn default() -> Self {
        Self {
            rating: 5,
            feedback: String::new(),
            field: ReviewField::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AlarmField {
    #[default]
    Name,
    Time,
    Description,
}

impl AlarmField {
    pub fn next(self) -> Self {
        match self {
            AlarmField::Name => AlarmField::Time,
            AlarmField::Time => AlarmField::Description,
            AlarmField::Description => AlarmField::Name,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AlarmForm {
    pub name: String,
    /// Local time as typed, `YYYY-MM-DD HH:MM`.
    pub time: String,
    pub description: String,
    pub field: AlarmField,
}

/// Instruction for the main loop's reveal timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Abort any running timer and tick this token instead, at most `ticks`
    /// times.
    Start { token: RevealToken, ticks: usize },
    Stop,
}

pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,

    pub user: Option<User>,
    /// Cleared on a 401; polling stops until the next login.
    pub signed_in: bool,

    pub chats: Vec<ChatSession>,
    pub chat_list_state: ListState,
    pub chats_loading: bool,

    pub transcript: Transcript,
    /// The open chat's first snapshot has not arrived yet.
    pub chat_loading: bool,
    /// Server message count at the time the last send was accepted. Set until a
    /// snapshot with a newer assistant reply shows up.
    reply_baseline: Option<usize>,
    last_poll: Option<Instant>,
    poll_interval: Duration,

    /// Top line of the transcript viewport. Clamped by the renderer.
    pub transcript_scroll: usize,
    /// Pin the viewport to the newest line.
    pub follow_transcript: bool,
    pub transcript_viewport_height: u16,
    pub chat_list_viewport_height: u16,
    pub alarm_list_viewport_height: u16,

    pub dashboard: Option<Dashboard>,
    pub dashboard_loading: bool,
    last_dashboard_load: Option<Instant>,
    /// Resolved chats without a review, oldest prompt first.
    pub pending_ratings: Vec<ChatSession>,
    pub pending_rating_state: ListState,
    /// Chats the user was already told about.
    prompted_ratings: HashSet<String>,

    pub composer: String,
    pub new_chat: NewChatForm,
    pub review: ReviewForm,
    /// Chat the review form is for.
    review_target: Option<String>,
    /// Mode to return to when the review form closes.
    review_return: Mode,
    pub new_alarm: AlarmForm,
    pub pending_delete: Option<DeleteTarget>,

    pub alarms: Vec<Alarm>,
    pub alarm_list_state: ListState,
    notified_alarms: HashSet<String>,
    last_alarm_check: Option<Instant>,

    pub toasts: VecDeque<Toast>,
    pub help_scroll: u16,

    pub theme_name: ThemeName,
    pub theme: Theme,

    /// Outer rects of [chats, transcript, alarms] from the last frame, for
    /// click-to-focus.
    pub panel_rects: [Rect; 3],

    pub api_tx: Option<UnboundedSender<Request>>,
    timer_command: Option<TimerCommand>,
}

impl AppState {
    pub fn new(theme_name: ThemeName, poll_interval: Duration) -> Self {
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            user: None,
            signed_in: true,
            chats: Vec::new(),
            chat_list_state: ListState::default(),
            chats_loading: false,
            transcript: Transcript::new(),
            chat_loading: false,
            reply_baseline: None,
            last_poll: None,
            poll_interval,
            transcript_scroll: 0,
            follow_transcript: true,
            transcript_viewport_height: 0,
            chat_list_viewport_height: 0,
            alarm_list_viewport_height: 0,
            dashboard: None,
            dashboard_loading: false,
            last_dashboard_load: None,
            pending_ratings: Vec::new(),
            pending_rating_state: ListState::default(),
            prompted_ratings: HashSet::new(),
            composer: String::new(),
            new_chat: NewChatForm::default(),
            review: ReviewForm::default(),
            review_target: None,
            review_return: Mode::Normal,
            new_alarm: AlarmForm::default(),
            pending_delete: None,
            alarms: Vec::new(),
            alarm_list_state: ListState::default(),
            notified_alarms: HashSet::new(),
            last_alarm_check: None,
            toasts: VecDeque::new(),
            help_scroll: 0,
            theme_name,
            theme: Theme::from_name(theme_name),
            panel_rects: [Rect::default(); 3],
            api_tx: None,
            timer_command: None,
        }
    }

    fn request(&self, request: Request) {
        match &self.api_tx {
            Some(tx) => {
                let _ = tx.send(request);
            }
            None => debug!(?request, "no backend attached, dropping request"),
        }
    }

    /// Requests everything the first frame needs.
    pub fn load_initial(&mut self) {
        self.chats_loading = true;
        self.request(Request::LoadProfile);
        self.request(Request::LoadChats);
        self.request(Request::LoadAlarms);
        self.request(Request::LoadPendingRatings);
    }

    /// Returns and clears the pending reveal-timer instruction.
    pub fn take_timer_command(&mut self) -> Option<TimerCommand> {
        self.timer_command.take()
    }

    // -----------------------------------------------------------------------
    // Toasts
    // -----------------------------------------------------------------------

    pub fn notify(&mut self, level: ToastLevel, text: impl Into<String>) {
        let ttl = if level == ToastLevel::Alarm {
            ALARM_TOAST_TTL
        } else {
            TOAST_TTL
        };
        self.toasts.push_back(Toast {
            text: text.into(),
            level,
            expires_at: Instant::now() + ttl,
        });
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    fn notify_api_error(&mut self, action: &str, err: &ApiError) {
        let text = match err {
            ApiError::Unauthorized(_) => {
                self.signed_in = false;
                self.reply_baseline = None;
                "Session expired. Run `careease login` to sign in again.".to_owned()
            }
            ApiError::NotSignedIn => {
                self.signed_in = false;
                "Not signed in. Run `careease login` first.".to_owned()
            }
            ApiError::Network(_) => err.to_string(),
            _ => format!("{action}: {err}"),
        };
        self.notify(ToastLevel::Error, text);
    }

    // -----------------------------------------------------------------------
    // Chat list and the open chat
    // -----------------------------------------------------------------------

    /// Index of the highlighted chat, clamped to the list.
    pub fn selected_chat_index(&self) -> Option<usize> {
        let last = self.chats.len().checked_sub(1)?;
        self.chat_list_state.selected().map(|i| i.min(last))
    }

    pub fn selected_chat(&self) -> Option<&ChatSession> {
        self.selected_chat_index().and_then(|i| self.chats.get(i))
    }

    /// The chat shown in the transcript panel.
    pub fn open_chat(&self) -> Option<&ChatSession> {
        let id = self.transcript.chat_id()?;
        self.chats.iter().find(|c| c.id == id)
    }

    /// Open chat if any, else the highlighted one.
    fn target_chat(&self) -> Option<&ChatSession> {
        self.open_chat().or_else(|| self.selected_chat())
    }

    /// Opens the highlighted chat and moves focus to the transcript.
    pub fn open_selected_chat(&mut self) {
        let Some(chat_id) = self.selected_chat().map(|c| c.id.clone()) else {
            return;
        };
        self.focus = PanelFocus::Transcript;
        if self.transcript.chat_id() == Some(chat_id.as_str()) {
            return;
        }
        self.open_chat_by_id(chat_id);
    }

    fn open_chat_by_id(&mut self, chat_id: String) {
        info!(chat_id, "opening chat");
        self.transcript.switch_session(Some(chat_id.clone()));
        self.timer_command = Some(TimerCommand::Stop);
        self.reply_baseline = None;
        self.chat_loading = true;
        self.composer.clear();
        self.transcript_scroll = 0;
        self.follow_transcript = true;
        self.request(Request::LoadChat(chat_id));
    }

    fn close_chat(&mut self) {
        self.transcript.switch_session(None);
        self.timer_command = Some(TimerCommand::Stop);
        self.reply_baseline = None;
        self.chat_loading = false;
        self.composer.clear();
    }

    /// "Typing" indicator: a reply is expected and none is being revealed.
    pub fn typing_indicator(&self) -> bool {
        !self.transcript.is_revealing()
            && (self.transcript.awaiting_reply() || self.reply_baseline.is_some())
    }

    /// Enters compose mode when a chat is open.
    pub fn start_compose(&mut self) {
        if self.transcript.chat_id().is_none() {
            self.notify(ToastLevel::Info, "Open a chat first (Enter on the chat list).");
            return;
        }
        self.focus = PanelFocus::Transcript;
        self.mode = Mode::Compose;
    }

    /// Submits the composer through the transcript engine.
    ///
    /// The composer is cleared only when the message was accepted.
    pub fn submit_composer(&mut self) {
        match self.transcript.submit(&self.composer) {
            Ok(outgoing) => {
                self.composer.clear();
                self.follow_transcript = true;
                self.request(Request::Send(outgoing));
            }
            Err(SubmitError::Empty) => {}
            Err(SubmitError::NoSession) => {
                self.notify(ToastLevel::Info, "Open a chat first (Enter on the chat list).");
            }
            Err(SubmitError::InFlight) => {
                self.notify(ToastLevel::Info, "Still sending the previous message.");
            }
        }
    }

    fn start_timer(&mut self, token: RevealToken) {
        let ticks = self.transcript.remaining_ticks(token);
        self.timer_command = Some(TimerCommand::Start { token, ticks });
    }

    pub fn on_reveal_tick(&mut self, token: RevealToken) {
        match self.transcript.advance_reveal(token) {
            RevealStep::Completed { next: Some(next) } => {
                self.start_timer(next);
            }
            RevealStep::Completed { next: None } => {
                self.timer_command = Some(TimerCommand::Stop);
            }
            RevealStep::Progress { .. } | RevealStep::Stale => {}
        }
    }

    // -----------------------------------------------------------------------
    // Periodic work
    // -----------------------------------------------------------------------

    /// Expires toasts, polls the open chat while a reply is awaited, and checks
    /// alarms every [`ALARM_CHECK_INTERVAL`].
    pub fn on_tick(&mut self, now: Instant, wall_clock: DateTime<Utc>) {
        self.toasts.retain(|t| t.expires_at > now);

        if self.signed_in && self.reply_baseline.is_some() {
            let due = self
                .last_poll
                .is_none_or(|last| now.duration_since(last) >= self.poll_interval);
            if let (true, Some(chat_id)) = (due, self.transcript.chat_id()) {
                let chat_id = chat_id.to_owned();
                self.last_poll = Some(now);
                self.request(Request::LoadChat(chat_id));
            }
        }

        if self.signed_in && self.mode == Mode::Dashboard {
            let stale = self
                .last_dashboard_load
                .is_none_or(|last| now.duration_since(last) >= DASHBOARD_REFRESH_INTERVAL);
            if stale {
                self.load_dashboard(now);
            }
        }

        let check_alarms = self
            .last_alarm_check
            .is_none_or(|last| now.duration_since(last) >= ALARM_CHECK_INTERVAL);
        if check_alarms {
            self.last_alarm_check = Some(now);
            self.check_due_alarms(wall_clock);
        }
    }

    /// Raises one notification per due alarm. Returns how many were raised.
    pub fn check_due_alarms(&mut self, now: DateTime<Utc>) -> usize {
        let due: Vec<(String, String)> = self
            .alarms
            .iter()
            .filter(|a| a.is_due(now) && !self.notified_alarms.contains(&a.id))
            .map(|a| {
                let text = match &a.description {
                    Some(d) => format!("Alarm: {} - {}", a.name, d),
                    None => format!("Alarm: {}", a.name),
                };
                (a.id.clone(), text)
            })
            .collect();
        for (id, text) in &due {
            info!(alarm_id = %id, "alarm due");
            self.notified_alarms.insert(id.clone());
            self.notify(ToastLevel::Alarm, text.clone());
        }
        due.len()
    }

    // -----------------------------------------------------------------------
    // Backend responses
    // -----------------------------------------------------------------------

    pub fn apply_response(&mut self, response: Response) {
        match response {
            Response::Profile(Ok(user)) => {
                self.signed_in = true;
                self.user = Some(user);
            }
            Response::Profile(Err(e)) => self.notify_api_error("Loading profile", &e),

            Response::Dashboard(result) => {
                self.dashboard_loading = false;
                match result {
                    Ok(dashboard) => self.dashboard = Some(dashboard),
                    Err(e) => self.notify_api_error("Loading dashboard", &e),
                }
            }
            Response::PendingRatings(Ok(chats)) => self.replace_pending_ratings(chats),
            Response::PendingRatings(Err(e)) => {
                self.notify_api_error("Loading pending ratings", &e);
            }

            Response::Chats(result) => {
                self.chats_loading = false;
                match result {
                    Ok(chats) => self.replace_chats(chats),
                    Err(e) => self.notify_api_error("Loading chats", &e),
                }
            }

            Response::Chat { chat_id, result } => self.apply_chat(chat_id, result),

            Response::ChatCreated(Ok(chat)) => {
                let chat_id = chat.id.clone();
                self.chats.insert(0, chat);
                self.chat_list_state.select(Some(0));
                self.notify(ToastLevel::Success, "Chat created.");
                self.focus = PanelFocus::Transcript;
                self.open_chat_by_id(chat_id);
            }
            Response::ChatCreated(Err(e)) => self.notify_api_error("Creating chat", &e),

            Response::Sent { chat_id, result } => match result {
                Ok(()) => {
                    if self.transcript.send_succeeded(&chat_id) {
                        self.reply_baseline = Some(self.transcript.server_count());
                        self.last_poll = Some(Instant::now());
                        self.request(Request::LoadChat(chat_id));
                    }
                }
                Err(e) => {
                    if self.transcript.send_failed(&chat_id) {
                        self.notify_api_error("Message not sent", &e);
                    }
                }
            },

            Response::StatusUpdated {
                chat_id,
                status,
                result,
            } => match result {
                Ok(()) => {
                    if let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) {
                        chat.status = status;
                    }
                    self.notify(
                        ToastLevel::Success,
                        format!("Chat marked {}.", status.label()),
                    );
                }
                Err(e) => self.notify_api_error("Updating chat", &e),
            },

            Response::Reviewed { chat_id, result } => match result {
                Ok(()) => {
                    self.notify(ToastLevel::Success, "Thanks for your feedback.");
                    self.pending_ratings.retain(|c| c.id != chat_id);
                    clamp_selection(&mut self.pending_rating_state, self.pending_ratings.len());
                    if self.chats.iter().any(|c| c.id == chat_id) {
                        self.request(Request::LoadChat(chat_id));
                    }
                }
                Err(e) => self.notify_api_error("Submitting review", &e),
            },

            Response::ChatDeleted { chat_id, result } => match result {
                Ok(()) => {
                    self.chats.retain(|c| c.id != chat_id);
                    if self.transcript.chat_id() == Some(chat_id.as_str()) {
                        self.close_chat();
                    }
                    if self.chats.is_empty() {
                        self.chat_list_state.select(None);
                    }
                    self.notify(ToastLevel::Success, "Chat deleted.");
                }
                Err(e) => self.notify_api_error("Deleting chat", &e),
            },

            Response::Alarms(Ok(mut alarms)) => {
                alarms.sort_by_key(|a| a.time);
                self.notified_alarms
                    .retain(|id| alarms.iter().any(|a| &a.id == id));
                if self.alarm_list_state.selected().is_none() && !alarms.is_empty() {
                    self.alarm_list_state.select(Some(0));
                }
                self.alarms = alarms;
            }
            Response::Alarms(Err(e)) => self.notify_api_error("Loading alarms", &e),

            Response::AlarmChanged { change, result } => match result {
                Ok(()) => {
                    let text = match change {
                        AlarmChange::Created => "Alarm created.",
                        AlarmChange::Updated => "Alarm updated.",
                        AlarmChange::Deleted => "Alarm deleted.",
                    };
                    self.notify(ToastLevel::Success, text);
                    self.request(Request::LoadAlarms);
                }
                Err(e) => self.notify_api_error("Updating alarms", &e),
            },
        }
    }

    /// Newest activity first; keeps the highlight on the same chat.
    fn replace_chats(&mut self, mut chats: Vec<ChatSession>) {
        let selected_id = self.selected_chat().map(|c| c.id.clone());
        chats.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
        self.chats = chats;
        let index = selected_id
            .and_then(|id| self.chats.iter().position(|c| c.id == id))
            .or(if self.chats.is_empty() { None } else { Some(0) });
        self.chat_list_state.select(index);
    }

    /// Stores the chats awaiting a rating and prompts once for each new one.
    fn replace_pending_ratings(&mut self, chats: Vec<ChatSession>) {
        let fresh = chats
            .iter()
            .filter(|c| !self.prompted_ratings.contains(&c.id))
            .count();
        self.prompted_ratings.extend(chats.iter().map(|c| c.id.clone()));
        self.pending_ratings = chats;
        clamp_selection(&mut self.pending_rating_state, self.pending_ratings.len());

        if fresh > 0 && self.mode != Mode::Dashboard {
            let text = match fresh {
                1 => "A resolved chat is waiting for your rating. Press D to rate it.".to_owned(),
                n => format!("{n} resolved chats are waiting for your rating. Press D to rate them."),
            };
            self.notify(ToastLevel::Info, text);
        }
    }

    fn apply_chat(&mut self, chat_id: String, result: Result<ChatSession, ApiError>) {
        let is_open = self.transcript.chat_id() == Some(chat_id.as_str());
        let chat = match result {
            Ok(chat) => chat,
            Err(e) => {
                if is_open {
                    self.chat_loading = false;
                    self.notify_api_error("Loading chat", &e);
                }
                return;
            }
        };

        if is_open {
            self.chat_loading = false;
            match self.transcript.apply_server_messages(&chat_id, &chat.messages) {
                Reconcile::Applied {
                    started: Some(token),
                } => self.start_timer(token),
                Reconcile::Applied { started: None } | Reconcile::Unchanged | Reconcile::Stale => {}
            }
            if let Some(baseline) = self.reply_baseline {
                let replied = chat.messages.len() > baseline
                    && chat.messages.last().is_some_and(|m| m.role == Role::Assistant);
                if replied {
                    self.reply_baseline = None;
                }
            }
        }

        match self.chats.iter_mut().find(|c| c.id == chat_id) {
            Some(entry) => *entry = chat,
            None if is_open => self.chats.insert(0, chat),
            None => {}
        }
    }

    // -----------------------------------------------------------------------
    // Forms and actions
    // -----------------------------------------------------------------------

    pub fn start_new_chat(&mut self) {
        self.new_chat = NewChatForm::default();
        self.mode = Mode::NewChat;
    }

    /// Validates the form and sends it. Stays in the form on invalid input.
    pub fn submit_new_chat(&mut self) {
        let form = &self.new_chat;
        match NewChat::new(&form.title, &form.issue, form.category, form.priority) {
            Ok(chat) => {
                self.mode = Mode::Normal;
                self.request(Request::CreateChat(chat));
            }
            Err(e) => self.notify(ToastLevel::Error, e.to_string()),
        }
    }

    pub fn start_review(&mut self) {
        let Some(chat) = self.target_chat() else {
            self.notify(ToastLevel::Info, "Select a chat to review.");
            return;
        };
        if chat.review.is_some() {
            self.notify(ToastLevel::Info, "This chat already has a review.");
            return;
        }
        let chat_id = chat.id.clone();
        self.open_review(chat_id, Mode::Normal);
    }

    fn open_review(&mut self, chat_id: String, return_to: Mode) {
        self.review = ReviewForm::default();
        self.review_target = Some(chat_id);
        self.review_return = return_to;
        self.mode = Mode::Review;
    }

    pub fn submit_review(&mut self) {
        let Some(chat_id) = self.review_target.clone() else {
            self.mode = self.review_return;
            return;
        };
        match Review::new(self.review.rating, Some(self.review.feedback.clone())) {
            Ok(review) => {
                self.review_target = None;
                self.mode = self.review_return;
                self.request(Request::Review { chat_id, review });
            }
            Err(e) => self.notify(ToastLevel::Error, e.to_string()),
        }
    }

    pub fn review_returns_to_dashboard(&self) -> bool {
        self.review_return == Mode::Dashboard
    }

    /// Title of the chat the review form is for.
    pub fn review_chat_title(&self) -> Option<&str> {
        let id = self.review_target.as_deref()?;
        self.chats
            .iter()
            .chain(&self.pending_ratings)
            .find(|c| c.id == id)
            .map(|c| c.title.as_str())
    }

    pub fn cancel_review(&mut self) {
        self.review_target = None;
        self.mode = self.review_return;
    }

    // -----------------------------------------------------------------------
    // Dashboard
    // -----------------------------------------------------------------------

    pub fn open_dashboard(&mut self) {
        self.mode = Mode::Dashboard;
        self.load_dashboard(Instant::now());
    }

    pub fn close_dashboard(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn load_dashboard(&mut self, now: Instant) {
        self.dashboard_loading = true;
        self.last_dashboard_load = Some(now);
        self.request(Request::LoadDashboard);
        self.request(Request::LoadPendingRatings);
    }

    pub fn selected_pending_rating(&self) -> Option<&ChatSession> {
        let last = self.pending_ratings.len().checked_sub(1)?;
        self.pending_rating_state
            .selected()
            .map(|i| i.min(last))
            .and_then(|i| self.pending_ratings.get(i))
    }

    /// Opens the review form for the highlighted pending chat; the form
    /// returns to the dashboard when it closes.
    pub fn rate_selected_pending(&mut self) {
        let Some(chat_id) = self.selected_pending_rating().map(|c| c.id.clone()) else {
            return;
        };
        self.open_review(chat_id, Mode::Dashboard);
    }

    /// Marks the open (or highlighted) chat resolved or archived.
    pub fn set_chat_status(&mut self, status: ChatStatus) {
        let Some(chat) = self.target_chat() else {
            return;
        };
        if chat.status == status {
            return;
        }
        let chat_id = chat.id.clone();
        self.request(Request::SetStatus { chat_id, status });
    }

    /// Opens the alarm form with the time prefilled one hour ahead.
    pub fn start_new_alarm(&mut self) {
        let suggested = Local::now() + chrono::Duration::hours(1);
        self.new_alarm = AlarmForm {
            time: suggested.format(ALARM_TIME_FORMAT).to_string(),
            ..AlarmForm::default()
        };
        self.mode = Mode::NewAlarm;
    }

    pub fn submit_new_alarm(&mut self, now: DateTime<Utc>) {
        let form = &self.new_alarm;
        let alarm = parse_local_time(&form.time).and_then(|time| {
            NewAlarm::new(&form.name, time, Some(form.description.clone()), now)
        });
        match alarm {
            Ok(alarm) => {
                self.mode = Mode::Normal;
                self.request(Request::CreateAlarm(alarm));
            }
            Err(e) => self.notify(ToastLevel::Error, e.to_string()),
        }
    }

    pub fn selected_alarm(&self) -> Option<&Alarm> {
        let last = self.alarms.len().checked_sub(1)?;
        self.alarm_list_state
            .selected()
            .map(|i| i.min(last))
            .and_then(|i| self.alarms.get(i))
    }

    pub fn toggle_selected_alarm(&mut self) {
        let Some(alarm) = self.selected_alarm() else {
            return;
        };
        let alarm_id = alarm.id.clone();
        let update = AlarmUpdate {
            is_active: Some(!alarm.is_active),
            ..AlarmUpdate::default()
        };
        self.request(Request::UpdateAlarm { alarm_id, update });
    }

    pub fn complete_selected_alarm(&mut self) {
        let Some(alarm) = self.selected_alarm().filter(|a| !a.is_completed) else {
            return;
        };
        let alarm_id = alarm.id.clone();
        let update = AlarmUpdate {
            is_completed: Some(true),
            ..AlarmUpdate::default()
        };
        self.request(Request::UpdateAlarm { alarm_id, update });
    }

    /// Asks for confirmation before deleting the focused item.
    pub fn request_delete(&mut self) {
        let target = match self.focus {
            PanelFocus::Alarms => self.selected_alarm().map(|a| DeleteTarget::Alarm {
                id: a.id.clone(),
                name: a.name.clone(),
            }),
            PanelFocus::Chats => self.selected_chat().map(|c| DeleteTarget::Chat {
                id: c.id.clone(),
                title: c.title.clone(),
            }),
            PanelFocus::Transcript => self.open_chat().map(|c| DeleteTarget::Chat {
                id: c.id.clone(),
                title: c.title.clone(),
            }),
        };
        if let Some(target) = target {
            self.pending_delete = Some(target);
            self.mode = Mode::ConfirmDelete;
        }
    }

    pub fn confirm_delete(&mut self) {
        self.mode = Mode::Normal;
        match self.pending_delete.take() {
            Some(DeleteTarget::Chat { id, .. }) => self.request(Request::DeleteChat(id)),
            Some(DeleteTarget::Alarm { id, .. }) => self.request(Request::DeleteAlarm(id)),
            None => {}
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.mode = Mode::Normal;
    }

    /// Switches light/dark and persists the choice.
    pub fn toggle_theme(&mut self) {
        self.theme_name = self.theme_name.toggled();
        self.theme = Theme::from_name(self.theme_name);
        self.request(Request::SaveTheme(self.theme_name.as_str().to_owned()));
    }

    /// Reloads the chat list, the alarms and the open chat.
    pub fn refresh(&mut self) {
        self.chats_loading = true;
        self.request(Request::LoadChats);
        self.request(Request::LoadAlarms);
        if let Some(chat_id) = self.transcript.chat_id() {
            self.request(Request::LoadChat(chat_id.to_owned()));
        }
    }

    // -----------------------------------------------------------------------
    // Scrolling
    // -----------------------------------------------------------------------

    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Chats => self.chat_list_state.scroll_down_by(lines),
            PanelFocus::Transcript => {
                self.transcript_scroll = self.transcript_scroll.saturating_add(lines as usize);
            }
            PanelFocus::Alarms => self.alarm_list_state.scroll_down_by(lines),
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Chats => self.chat_list_state.scroll_up_by(lines),
            PanelFocus::Transcript => {
                self.follow_transcript = false;
                self.transcript_scroll = self.transcript_scroll.saturating_sub(lines as usize);
            }
            PanelFocus::Alarms => self.alarm_list_state.scroll_up_by(lines),
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::Chats => self.chat_list_state.select_first(),
            PanelFocus::Transcript => {
                self.follow_transcript = false;
                self.transcript_scroll = 0;
            }
            PanelFocus::Alarms => self.alarm_list_state.select_first(),
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::Chats => self.chat_list_state.select_last(),
            PanelFocus::Transcript => self.follow_transcript = true,
            PanelFocus::Alarms => self.alarm_list_state.select_last(),
        }
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::Chats => self.chat_list_viewport_height,
            PanelFocus::Transcript => self.transcript_viewport_height,
            PanelFocus::Alarms => self.alarm_list_viewport_height,
        }
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down((self.focused_viewport_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.focused_viewport_height() / 2).max(1));
    }
}

/// Keeps a list highlight inside `len` items, selecting the first when unset.
fn clamp_selection(list: &mut ListState, len: usize) {
    match (len, list.selected()) {
        (0, _) => list.select(None),
        (_, None) => list.select(Some(0)),
        (n, Some(i)) if i >= n => list.select(Some(n - 1)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use careease_core::types::{ChatMetadata, Message};
    use chrono::Duration as ChronoDuration;
    use tokio::sync::mpsc;

    use super::*;

    fn chat(id: &str, messages: Vec<Message>) -> ChatSession {
        ChatSession {
            id: id.to_owned(),
            title: format!("Chat {id}"),
            issue: "issue".to_owned(),
            category: Category::default(),
            priority: Priority::default(),
            status: ChatStatus::default(),
            messages,
            review: None,
            metadata: ChatMetadata::default(),
        }
    }

    fn state_with_backend() -> (AppState, mpsc::UnboundedReceiver<Request>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = AppState::new(ThemeName::Dark, Duration::from_secs(3));
        state.api_tx = Some(tx);
        (state, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Request>) -> Vec<Request> {
        let mut out = Vec::new();
        while let Ok(req) = rx.try_recv() {
            out.push(req);
        }
        out
    }

    /// Loads `c1` into the list, opens it and applies its first snapshot.
    fn open_c1(
        state: &mut AppState,
        rx: &mut mpsc::UnboundedReceiver<Request>,
        messages: Vec<Message>,
    ) {
        state.apply_response(Response::Chats(Ok(vec![chat("c1", messages.clone())])));
        state.open_selected_chat();
        let reqs = drain(rx);
        assert!(matches!(reqs.as_slice(), [Request::LoadChat(id)] if id == "c1"));
        state.apply_response(Response::Chat {
            chat_id: "c1".to_owned(),
            result: Ok(chat("c1", messages)),
        });
    }

    #[test]
    fn send_then_reply_drives_the_reveal_timer() {
        let (mut state, mut rx) = state_with_backend();
        open_c1(&mut state, &mut rx, vec![Message::new(Role::Assistant, "Welcome")]);
        assert_eq!(state.transcript.displayed().len(), 1);
        let _ = state.take_timer_command();

        state.composer = "Hello".to_owned();
        state.submit_composer();
        assert!(state.composer.is_empty());
        assert_eq!(state.transcript.displayed().len(), 2);
        assert!(state.typing_indicator());
        let reqs = drain(&mut rx);
        assert!(matches!(reqs.as_slice(), [Request::Send(out)] if out.content == "Hello"));

        state.apply_response(Response::Sent {
            chat_id: "c1".to_owned(),
            result: Ok(()),
        });
        assert!(state.typing_indicator(), "reply still awaited after the send returns");
        let reqs = drain(&mut rx);
        assert!(matches!(reqs.as_slice(), [Request::LoadChat(id)] if id == "c1"));

        state.apply_response(Response::Chat {
            chat_id: "c1".to_owned(),
            result: Ok(chat(
                "c1",
                vec![
                    Message::new(Role::Assistant, "Welcome"),
                    Message::new(Role::User, "Hello"),
                    Message::new(Role::Assistant, "Hi there friend"),
                ],
            )),
        });
        let Some(TimerCommand::Start { token, ticks }) = state.take_timer_command() else {
            panic!("reply should start a reveal");
        };
        assert_eq!(ticks, 4, "three words and the completing tick");
        assert!(!state.typing_indicator());

        for _ in 0..3 {
            state.on_reveal_tick(token);
        }
        assert_eq!(state.take_timer_command(), None);
        state.on_reveal_tick(token);
        assert_eq!(state.take_timer_command(), Some(TimerCommand::Stop));
        let last = state.transcript.displayed().last().unwrap();
        assert_eq!(last.content, "Hi there friend");
        assert!(!last.revealing);
    }

    #[test]
    fn composer_is_kept_when_submission_is_refused() {
        let (mut state, mut rx) = state_with_backend();
        state.composer = "Hello".to_owned();
        state.submit_composer();
        assert_eq!(state.composer, "Hello");
        assert!(drain(&mut rx).is_empty());
        assert_eq!(state.toasts.len(), 1);
    }

    #[test]
    fn failed_send_notifies_and_allows_retry() {
        let (mut state, mut rx) = state_with_backend();
        open_c1(&mut state, &mut rx, vec![]);
        state.composer = "Hello".to_owned();
        state.submit_composer();
        drain(&mut rx);

        state.apply_response(Response::Sent {
            chat_id: "c1".to_owned(),
            result: Err(ApiError::Status {
                status: 500,
                message: "boom".to_owned(),
            }),
        });
        assert!(!state.transcript.is_sending());
        assert!(!state.typing_indicator());
        assert_eq!(state.toasts.back().map(|t| t.level), Some(ToastLevel::Error));

        state.composer = "Hello again".to_owned();
        state.submit_composer();
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn switching_chats_stops_the_timer_and_drops_late_results() {
        let (mut state, mut rx) = state_with_backend();
        state.apply_response(Response::Chats(Ok(vec![chat("c1", vec![]), chat("c2", vec![])])));
        state.chat_list_state.select(Some(0));
        state.open_selected_chat();
        let first = state.transcript.chat_id().map(str::to_owned);

        state.focus = PanelFocus::Chats;
        state.chat_list_state.select(Some(1));
        state.open_selected_chat();
        assert_eq!(state.take_timer_command(), Some(TimerCommand::Stop));
        drain(&mut rx);

        let first = first.unwrap();
        state.apply_response(Response::Chat {
            chat_id: first.clone(),
            result: Ok(chat(&first, vec![Message::new(Role::User, "late")])),
        });
        assert!(state.transcript.displayed().is_empty());
        assert_eq!(state.take_timer_command(), None);
    }

    #[test]
    fn polling_only_while_a_reply_is_awaited() {
        let (mut state, mut rx) = state_with_backend();
        open_c1(&mut state, &mut rx, vec![]);
        let start = Instant::now();
        state.on_tick(start, Utc::now());
        assert!(drain(&mut rx).is_empty());

        state.composer = "Hi".to_owned();
        state.submit_composer();
        state.apply_response(Response::Sent {
            chat_id: "c1".to_owned(),
            result: Ok(()),
        });
        drain(&mut rx);

        state.on_tick(Instant::now() + Duration::from_secs(4), Utc::now());
        let reqs = drain(&mut rx);
        assert!(matches!(reqs.as_slice(), [Request::LoadChat(id)] if id == "c1"));
    }

    #[test]
    fn unauthorized_marks_signed_out() {
        let (mut state, _rx) = state_with_backend();
        state.apply_response(Response::Chats(Err(ApiError::Unauthorized(
            "Invalid token".to_owned(),
        ))));
        assert!(!state.signed_in);
        assert!(state.toasts.back().unwrap().text.contains("careease login"));
    }

    #[test]
    fn due_alarm_notifies_once() {
        let (mut state, _rx) = state_with_backend();
        let now = Utc::now();
        let alarm = Alarm {
            id: "a1".to_owned(),
            name: "Pills".to_owned(),
            time: now + ChronoDuration::seconds(20),
            description: None,
            is_active: true,
            is_completed: false,
        };
        let later = Alarm {
            id: "a2".to_owned(),
            time: now + ChronoDuration::hours(2),
            ..alarm.clone()
        };
        state.apply_response(Response::Alarms(Ok(vec![later, alarm])));
        assert_eq!(state.alarms[0].id, "a1", "alarms sorted by time");

        assert_eq!(state.check_due_alarms(now), 1);
        assert_eq!(state.check_due_alarms(now), 0);
        assert_eq!(state.toasts.back().map(|t| t.level), Some(ToastLevel::Alarm));
    }

    #[test]
    fn deleting_the_open_chat_closes_it() {
        let (mut state, mut rx) = state_with_backend();
        open_c1(&mut state, &mut rx, vec![Message::new(Role::User, "Hello")]);
        state.request_delete();
        assert_eq!(state.mode, Mode::ConfirmDelete);
        state.confirm_delete();
        let reqs = drain(&mut rx);
        assert!(matches!(reqs.as_slice(), [Request::DeleteChat(id)] if id == "c1"));

        state.apply_response(Response::ChatDeleted {
            chat_id: "c1".to_owned(),
            result: Ok(()),
        });
        assert!(state.chats.is_empty());
        assert_eq!(state.transcript.chat_id(), None);
        assert!(state.transcript.displayed().is_empty());
    }

    #[test]
    fn invalid_forms_stay_open() {
        let (mut state, mut rx) = state_with_backend();
        state.start_new_chat();
        state.new_chat.title = "  ".to_owned();
        state.submit_new_chat();
        assert_eq!(state.mode, Mode::NewChat);

        state.start_new_alarm();
        state.new_alarm.name = "Pills".to_owned();
        state.new_alarm.time = "2000-01-01 08:00".to_owned();
        state.submit_new_alarm(Utc::now());
        assert_eq!(state.mode, Mode::NewAlarm);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn theme_toggle_is_persisted() {
        let (mut state, mut rx) = state_with_backend();
        state.toggle_theme();
        assert_eq!(state.theme_name, ThemeName::Light);
        let reqs = drain(&mut rx);
        assert!(matches!(reqs.as_slice(), [Request::SaveTheme(name)] if name == "light"));
    }

    fn resolved(id: &str) -> ChatSession {
        ChatSession {
            status: ChatStatus::Resolved,
            ..chat(id, vec![])
        }
    }

    #[test]
    fn pending_ratings_prompt_once_per_chat() {
        let (mut state, _rx) = state_with_backend();
        state.apply_response(Response::PendingRatings(Ok(vec![resolved("c4")])));
        assert_eq!(state.toasts.len(), 1);
        assert!(state.toasts[0].text.contains("Press D"));
        assert_eq!(state.pending_rating_state.selected(), Some(0));

        state.apply_response(Response::PendingRatings(Ok(vec![resolved("c4")])));
        assert_eq!(state.toasts.len(), 1, "same chat is not announced twice");

        state.apply_response(Response::PendingRatings(Ok(vec![resolved("c4"), resolved("c5")])));
        assert_eq!(state.toasts.len(), 2);
    }

    #[test]
    fn rating_from_the_dashboard_returns_to_it() {
        let (mut state, mut rx) = state_with_backend();
        state.open_dashboard();
        assert_eq!(state.mode, Mode::Dashboard);
        let reqs = drain(&mut rx);
        assert!(matches!(
            reqs.as_slice(),
            [Request::LoadDashboard, Request::LoadPendingRatings]
        ));

        state.apply_response(Response::Dashboard(Ok(Dashboard::default())));
        assert!(!state.dashboard_loading);
        state.apply_response(Response::PendingRatings(Ok(vec![resolved("c4"), resolved("c5")])));
        assert!(state.toasts.is_empty(), "no prompt while the dashboard is shown");

        state.pending_rating_state.select(Some(1));
        state.rate_selected_pending();
        assert_eq!(state.mode, Mode::Review);
        assert_eq!(state.review_chat_title(), Some("Chat c5"));

        state.review.rating = 4;
        state.submit_review();
        assert_eq!(state.mode, Mode::Dashboard);
        let reqs = drain(&mut rx);
        assert!(matches!(
            reqs.as_slice(),
            [Request::Review { chat_id, review }] if chat_id == "c5" && review.rating == 4
        ));

        state.apply_response(Response::Reviewed {
            chat_id: "c5".to_owned(),
            result: Ok(()),
        });
        assert_eq!(state.pending_ratings.len(), 1);
        assert_eq!(state.pending_rating_state.selected(), Some(0));
        assert!(drain(&mut rx).is_empty(), "c5 is not in the chat list");
    }

    #[test]
    fn cancelled_review_goes_back_where_it_started() {
        let (mut state, mut rx) = state_with_backend();
        open_c1(&mut state, &mut rx, vec![]);
        state.start_review();
        assert_eq!(state.mode, Mode::Review);
        state.cancel_review();
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(state.review_chat_title(), None);
    }

    #[test]
    fn open_dashboard_reloads_every_thirty_seconds() {
        let (mut state, mut rx) = state_with_backend();
        state.open_dashboard();
        drain(&mut rx);

        let now = Instant::now();
        state.on_tick(now + Duration::from_secs(5), Utc::now());
        assert!(drain(&mut rx).is_empty());

        state.on_tick(now + DASHBOARD_REFRESH_INTERVAL, Utc::now());
        let reqs = drain(&mut rx);
        assert!(reqs.iter().any(|r| matches!(r, Request::LoadDashboard)));

        state.close_dashboard();
        state.on_tick(now + DASHBOARD_REFRESH_INTERVAL * 3, Utc::now());
        assert!(!drain(&mut rx).iter().any(|r| matches!(r, Request::LoadDashboard)));
    }
}
