//! Domain types shared by the engine, the REST client and the terminal UI.
//!
//! Server-side shapes mirror the backend JSON (`_id` identifiers, camelCase
//! fields). `DisplayMessage` is the only client-only type: it never crosses the
//! wire and lives only as long as a chat is open.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Topic a chat was opened under. Chosen once at creation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Health,
    Medication,
    Mobility,
    Emotional,
    DailyCare,
    Emergency,
    Other,
}

impl Category {
    /// Every category in menu order.
    pub const ALL: [Category; 7] = [
        Category::Health,
        Category::Medication,
        Category::Mobility,
        Category::Emotional,
        Category::DailyCare,
        Category::Emergency,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Health => "health",
            Category::Medication => "medication",
            Category::Mobility => "mobility",
            Category::Emotional => "emotional",
            Category::DailyCare => "daily care",
            Category::Emergency => "emergency",
            Category::Other => "other",
        }
    }

    /// Returns the category after `self` in menu order (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Urgency of a chat.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Returns the priority after `self` (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Lifecycle status of a chat.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    #[default]
    Active,
    Resolved,
    Archived,
}

impl ChatStatus {
    pub fn label(self) -> &'static str {
        match self {
            ChatStatus::Active => "active",
            ChatStatus::Resolved => "resolved",
            ChatStatus::Archived => "archived",
        }
    }
}

/// A persisted chat message. Immutable once the server has it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// User feedback attached to a chat. At most one per chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Builds a review, rejecting ratings outside `1..=5`.
    ///
    /// Blank feedback is dropped rather than sent as an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RatingOutOfRange`] for ratings outside `1..=5`.
    pub fn new(rating: u8, feedback: Option<String>) -> Result<Self, ValidationError> {
        if !(1..=5).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange(rating));
        }
        let feedback = feedback
            .map(|f| f.trim().to_owned())
            .filter(|f| !f.is_empty());
        Ok(Self {
            rating,
            feedback,
            reviewed_at: None,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

/// A conversation between the user and the assistant backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: ChatStatus,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub review: Option<Review>,
    #[serde(default)]
    pub metadata: ChatMetadata,
}

impl ChatSession {
    /// Last activity reported by the server, or the newest message timestamp.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.metadata
            .last_activity
            .or_else(|| self.messages.last().map(|m| m.timestamp))
    }
}

/// Payload for opening a new chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChat {
    pub title: String,
    pub issue: String,
    pub category: Category,
    pub priority: Priority,
}

impl NewChat {
    /// Trims the free-text fields and rejects blank ones.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] naming the first blank field.
    pub fn new(
        title: &str,
        issue: &str,
        category: Category,
        priority: Priority,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        let issue = issue.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        if issue.is_empty() {
            return Err(ValidationError::EmptyField("issue"));
        }
        Ok(Self {
            title: title.to_owned(),
            issue: issue.to_owned(),
            category,
            priority,
        })
    }
}

fn default_true() -> bool {
    true
}

/// A reminder owned by the user. Independent of any chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_completed: bool,
}

impl Alarm {
    /// Window on either side of the trigger time in which an alarm counts as due.
    pub const DUE_WINDOW_MS: i64 = 60_000;

    /// True when the alarm is active, not completed, and `now` is within one
    /// minute of its trigger time (exclusive on the late side).
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active || self.is_completed {
            return false;
        }
        let diff = (self.time - now).num_milliseconds();
        diff <= Self::DUE_WINDOW_MS && diff > -Self::DUE_WINDOW_MS
    }
}

/// Input format for alarm times typed in the terminal, in local time.
pub const ALARM_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parses a local `YYYY-MM-DD HH:MM` string into UTC.
///
/// # Errors
///
/// Returns [`ValidationError::BadTime`] when the text does not match the format
/// or names a local time that does not exist (DST gap).
pub fn parse_local_time(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let input = input.trim();
    let naive = NaiveDateTime::parse_from_str(input, ALARM_TIME_FORMAT)
        .map_err(|_| ValidationError::BadTime(input.to_owned()))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::BadTime(input.to_owned()))
}

/// Payload for creating an alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAlarm {
    pub name: String,
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewAlarm {
    /// Validates the name and requires a trigger time after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] for a blank name and
    /// [`ValidationError::AlarmInPast`] when `time <= now`.
    pub fn new(
        name: &str,
        time: DateTime<Utc>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if time <= now {
            return Err(ValidationError::AlarmInPast);
        }
        Ok(Self {
            name: name.to_owned(),
            time,
            description: description
                .map(|d| d.trim().to_owned())
                .filter(|d| !d.is_empty()),
        })
    }
}

/// Partial alarm update. Only the set fields are sent.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn label(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(value.to_owned())
}

/// Payload for creating an account.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Trims the name fields and rejects blank ones. The password is kept as
    /// typed but must not be empty.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] naming the first blank field.
    pub fn new(
        first_name: &str,
        last_name: &str,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Self, ValidationError> {
        let first_name = required("first name", first_name)?;
        let last_name = required("last name", last_name)?;
        let username = required("username", username)?;
        let email = required("email", email)?;
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password"));
        }
        Ok(Self {
            first_name,
            last_name,
            username,
            email,
            password: password.to_owned(),
        })
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Partial profile update. Only the set fields are sent.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    /// Trims every field and drops blank ones.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NothingToUpdate`] when no field is left.
    pub fn new(
        first_name: Option<&str>,
        last_name: Option<&str>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Self, ValidationError> {
        fn keep(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        }
        let update = Self {
            first_name: keep(first_name),
            last_name: keep(last_name),
            username: keep(username),
            email: keep(email),
        };
        if update == Self::default() {
            return Err(ValidationError::NothingToUpdate);
        }
        Ok(update)
    }
}

/// Average time to first reply as the backend reports it: either preformatted
/// text or a number of seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResponseTime {
    Text(String),
    Seconds(f64),
}

impl std::fmt::Display for ResponseTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseTime::Text(text) => f.write_str(text),
            ResponseTime::Seconds(secs) => write!(f, "{secs:.1}s"),
        }
    }
}

/// Chat counters for the signed-in user.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatStats {
    pub total_chats: u32,
    pub active_chats: u32,
    /// Chats resolved today.
    pub recent_resolved: u32,
    pub average_rating: Option<f64>,
    pub avg_response_time: Option<ResponseTime>,
}

/// A short tip shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Insight {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// The user's dashboard: counters, latest chats and tips.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dashboard {
    pub stats: ChatStats,
    pub recent_chats: Vec<ChatSession>,
    pub insights: Vec<Insight>,
}

/// Account as listed in the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

/// Owner of a chat in the admin listing: populated, or a bare id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChatOwner {
    User(User),
    Id(String),
}

impl ChatOwner {
    pub fn label(&self) -> String {
        match self {
            ChatOwner::User(user) => user.email.clone(),
            ChatOwner::Id(id) => id.clone(),
        }
    }
}

/// Chat as listed in the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminChat {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: ChatStatus,
    #[serde(default, rename = "userId")]
    pub owner: Option<ChatOwner>,
    #[serde(default)]
    pub review: Option<Review>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Client-side view of a message.
///
/// `id` is synthetic (UUID v4) and unrelated to any server identifier.
/// `revealing` is set only on the placeholder of an in-progress reveal.
/// `queued` marks an assistant reply held back until that reveal finishes;
/// it keeps the reply's slot in the transcript and is not rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub revealing: bool,
    pub queued: bool,
}

impl DisplayMessage {
    /// Wraps a confirmed server message.
    pub fn confirmed(message: &Message) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp,
            revealing: false,
            queued: false,
        }
    }

    /// A user message shown before the server has accepted it.
    pub fn optimistic(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            revealing: false,
            queued: false,
        }
    }

    /// Empty assistant entry that a reveal fills in word by word.
    pub fn reveal_placeholder() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            revealing: true,
            queued: false,
        }
    }

    /// Empty assistant entry waiting for the running reveal to finish.
    pub fn queued_placeholder() -> Self {
        Self {
            revealing: false,
            queued: true,
            ..Self::reveal_placeholder()
        }
    }
}
