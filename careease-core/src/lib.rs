//! Core library of the CareEase terminal client.
//!
//! - [`types`]: chats, messages, reviews, alarms and the client-only `DisplayMessage`.
//! - [`transcript`]: reconciliation of optimistic and server messages plus the reveal state machine.
//! - [`api`]: the `CareApi` seam and its reqwest implementation.
//! - [`db`]: the settings store (auth token, theme) in SQLite.

pub mod api;
pub mod db;
pub mod error;
pub mod schema;
pub mod transcript;
pub mod types;

pub use error::{ApiError, SettingsError, SubmitError, ValidationError};
pub use transcript::{OutgoingMessage, Reconcile, RevealStep, RevealToken, Transcript};
