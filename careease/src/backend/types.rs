//! Owned request and response payloads exchanged with the backend worker.
//!
//! Chat-scoped responses carry the chat id they were issued for so the UI can
//! drop results that arrive after the user switched chats.

use careease_core::types::{
    Alarm, AlarmUpdate, ChatSession, ChatStatus, Dashboard, NewAlarm, NewChat, Review, User,
};
use careease_core::{ApiError, OutgoingMessage};

#[derive(Debug, Clone)]
pub enum Request {
    LoadProfile,
    LoadDashboard,
    LoadPendingRatings,
    LoadChats,
    /// Fetch one chat; used on open, after a send, and while polling.
    LoadChat(String),
    CreateChat(NewChat),
    Send(OutgoingMessage),
    SetStatus { chat_id: String, status: ChatStatus },
    Review { chat_id: String, review: Review },
    DeleteChat(String),
    LoadAlarms,
    CreateAlarm(NewAlarm),
    UpdateAlarm { alarm_id: String, update: AlarmUpdate },
    DeleteAlarm(String),
    /// Persist the theme name in the settings store.
    SaveTheme(String),
}

/// What an alarm mutation did, for the confirmation toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmChange {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug)]
pub enum Response {
    Profile(Result<User, ApiError>),
    Dashboard(Result<Dashboard, ApiError>),
    PendingRatings(Result<Vec<ChatSession>, ApiError>),
    Chats(Result<Vec<ChatSession>, ApiError>),
    Chat {
        chat_id: String,
        result: Result<ChatSession, ApiError>,
    },
    ChatCreated(Result<ChatSession, ApiError>),
    Sent {
        chat_id: String,
        result: Result<(), ApiError>,
    },
    StatusUpdated {
        chat_id: String,
        status: ChatStatus,
        result: Result<(), ApiError>,
    },
    Reviewed {
        chat_id: String,
        result: Result<(), ApiError>,
    },
    ChatDeleted {
        chat_id: String,
        result: Result<(), ApiError>,
    },
    Alarms(Result<Vec<Alarm>, ApiError>),
    AlarmChanged {
        change: AlarmChange,
        result: Result<(), ApiError>,
    },
}

impl Response {
    /// The API error carried by this response, if it failed.
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Response::Profile(r) => r.as_ref().err(),
            Response::Dashboard(r) => r.as_ref().err(),
            Response::PendingRatings(r) => r.as_ref().err(),
            Response::Chats(r) => r.as_ref().err(),
            Response::Chat { result, .. } => result.as_ref().err(),
            Response::ChatCreated(r) => r.as_ref().err(),
            Response::Sent { result, .. }
            | Response::StatusUpdated { result, .. }
            | Response::Reviewed { result, .. }
            | Response::ChatDeleted { result, .. }
            | Response::AlarmChanged { result, .. } => result.as_ref().err(),
            Response::Alarms(r) => r.as_ref().err(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.error(), Some(ApiError::Unauthorized(_)))
    }
}
