//! Error types for careease-core.
//!
//! Nothing here is fatal to the client: every variant maps onto a transient
//! notification or a rejected input in the UI.

use thiserror::Error;

/// Failure talking to the CareEase REST API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout. The user is asked to retry.
    #[error("Network error. Please check your connection.")]
    Network(#[source] reqwest::Error),

    /// The stored token was rejected. Callers clear it and ask for a new login.
    #[error("session expired: {0}")]
    Unauthorized(String),

    /// Any other non-2xx response. `message` is the backend's own text when present.
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response from server: {0}")]
    Decode(String),

    /// The client has no token for an endpoint that needs one.
    #[error("not signed in")]
    NotSignedIn,
}

impl ApiError {
    /// True for connectivity problems (as opposed to a server-side refusal).
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err)
        }
    }
}

/// Why a chat submission was refused before any request was issued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    Empty,
    #[error("no chat is open")]
    NoSession,
    #[error("a message is already being sent")]
    InFlight,
}

/// Client-side input checks for forms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    EmptyField(&'static str),
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
    #[error("alarm time must be in the future")]
    AlarmInPast,
    #[error("could not parse time '{0}', expected YYYY-MM-DD HH:MM")]
    BadTime(String),
    #[error("nothing to update")]
    NothingToUpdate,
}

/// Failure reading or writing the local settings store.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
}
