//! REST collaborators of the client.
//!
//! [`CareApi`] is the seam the UI talks through; [`HttpCareApi`] implements it
//! over reqwest against the CareEase backend. Every response body is wrapped
//! in `{ "success": .., "data": { .. }, "message": .. }`.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::types::{
    AdminChat, AdminUser, Alarm, AlarmUpdate, ChatSession, ChatStatus, Dashboard, NewAlarm,
    NewChat, NewUser, ProfileUpdate, Review, User,
};

/// Backend location used when neither config nor environment names one.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Per-request timeout used when config does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size of the admin listings.
pub const ADMIN_PAGE_SIZE: u32 = 20;

/// Operations the client needs from the CareEase backend.
///
/// `fetch_chat` and `send_message` are the two collaborators of the transcript
/// engine: a send only reports acceptance, the assistant reply shows up in a
/// later `fetch_chat`.
#[async_trait]
pub trait CareApi: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, email: &str, password: &str) -> Result<(String, User), ApiError>;
    /// Creates an account and signs it in, like [`CareApi::login`].
    async fn register(&self, user: &NewUser) -> Result<(String, User), ApiError>;
    async fn profile(&self) -> Result<User, ApiError>;
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;

    async fn dashboard(&self) -> Result<Dashboard, ApiError>;
    /// Resolved chats the user has not reviewed yet.
    async fn pending_ratings(&self) -> Result<Vec<ChatSession>, ApiError>;

    async fn list_chats(&self) -> Result<Vec<ChatSession>, ApiError>;
    async fn create_chat(&self, chat: &NewChat) -> Result<ChatSession, ApiError>;
    /// Current persisted state of one chat, messages in order.
    async fn fetch_chat(&self, chat_id: &str) -> Result<ChatSession, ApiError>;
    /// Persists a user message and triggers reply generation server-side.
    async fn send_message(&self, chat_id: &str, content: &str) -> Result<(), ApiError>;
    async fn update_status(&self, chat_id: &str, status: ChatStatus) -> Result<(), ApiError>;
    async fn add_review(&self, chat_id: &str, review: &Review) -> Result<(), ApiError>;
    async fn delete_chat(&self, chat_id: &str) -> Result<(), ApiError>;

    async fn list_alarms(&self) -> Result<Vec<Alarm>, ApiError>;
    async fn create_alarm(&self, alarm: &NewAlarm) -> Result<(), ApiError>;
    async fn update_alarm(&self, alarm_id: &str, update: &AlarmUpdate) -> Result<(), ApiError>;
    async fn delete_alarm(&self, alarm_id: &str) -> Result<(), ApiError>;

    /// Every account, one page at a time. Admin accounts only.
    async fn admin_users(&self, page: u32) -> Result<Vec<AdminUser>, ApiError>;
    /// Every user's chats, one page at a time. Admin accounts only.
    async fn admin_chats(&self, page: u32) -> Result<Vec<AdminChat>, ApiError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatData {
    chat: ChatSession,
}

#[derive(Debug, Deserialize)]
struct ChatsData {
    chats: Vec<ChatSession>,
}

#[derive(Debug, Deserialize)]
struct AlarmsData {
    alarms: Vec<Alarm>,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    token: String,
    user: User,
}

#[derive(Debug, Deserialize)]
struct UserData {
    user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingData {
    #[serde(default)]
    pending_chats: Vec<ChatSession>,
}

#[derive(Debug, Deserialize)]
struct AdminUsersData {
    users: Vec<AdminUser>,
}

#[derive(Debug, Deserialize)]
struct AdminChatsData {
    chats: Vec<AdminChat>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct StatusBody {
    status: ChatStatus,
}

/// reqwest-backed [`CareApi`].
///
/// The bearer token is held behind a mutex so a login in one task is seen by
/// requests issued from another.
pub struct HttpCareApi {
    http: reqwest::Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl HttpCareApi {
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client cannot be built (TLS
    /// backend initialisation failure).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = token;
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|g| g.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.http.request(method, url);
        match self.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Sends `req` and turns non-2xx responses into [`ApiError`].
    async fn execute(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let resp = req.send().await.map_err(|e| {
            warn!(error = %e, "request failed to reach the backend");
            ApiError::Network(e)
        })?;
        let status = resp.status();
        debug!(url = %resp.url(), %status, "backend response");
        if status.is_success() {
            return Ok(resp);
        }

        let message = resp
            .json::<Envelope<serde_json::Value>>()
            .await
            .ok()
            .and_then(|env| env.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(message));
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn data<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = self.execute(req).await?;
        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        envelope
            .data
            .ok_or_else(|| ApiError::Decode("response has no data".to_owned()))
    }

    async fn unit(&self, req: RequestBuilder) -> Result<(), ApiError> {
        self.execute(req).await.map(|_| ())
    }

    fn require_token(&self) -> Result<(), ApiError> {
        match self.token() {
            Some(_) => Ok(()),
            None => Err(ApiError::NotSignedIn),
        }
    }
}

#[async_trait]
impl CareApi for HttpCareApi {
    async fn login(&self, email: &str, password: &str) -> Result<(String, User), ApiError> {
        let req = self
            .request(Method::POST, "auth/login")
            .json(&Credentials { email, password });
        let auth: AuthData = self.data(req).await?;
        self.set_token(Some(auth.token.clone()));
        Ok((auth.token, auth.user))
    }

    async fn register(&self, user: &NewUser) -> Result<(String, User), ApiError> {
        let req = self.request(Method::POST, "auth/register").json(user);
        let auth: AuthData = self.data(req).await?;
        self.set_token(Some(auth.token.clone()));
        Ok((auth.token, auth.user))
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.require_token()?;
        let data: UserData = self.data(self.request(Method::GET, "auth/profile")).await?;
        Ok(data.user)
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.require_token()?;
        let req = self.request(Method::PUT, "auth/profile").json(update);
        let data: UserData = self.data(req).await?;
        Ok(data.user)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let result = self.unit(self.request(Method::POST, "auth/logout")).await;
        self.set_token(None);
        result
    }

    async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        self.require_token()?;
        self.data(self.request(Method::GET, "user/dashboard")).await
    }

    async fn pending_ratings(&self) -> Result<Vec<ChatSession>, ApiError> {
        self.require_token()?;
        let data: PendingData = self
            .data(self.request(Method::GET, "user/pending-ratings"))
            .await?;
        Ok(data.pending_chats)
    }

    async fn list_chats(&self) -> Result<Vec<ChatSession>, ApiError> {
        self.require_token()?;
        let data: ChatsData = self.data(self.request(Method::GET, "chat")).await?;
        Ok(data.chats)
    }

    async fn create_chat(&self, chat: &NewChat) -> Result<ChatSession, ApiError> {
        self.require_token()?;
        let data: ChatData = self
            .data(self.request(Method::POST, "chat").json(chat))
            .await?;
        Ok(data.chat)
    }

    async fn fetch_chat(&self, chat_id: &str) -> Result<ChatSession, ApiError> {
        self.require_token()?;
        let data: ChatData = self
            .data(self.request(Method::GET, &format!("chat/{chat_id}")))
            .await?;
        Ok(data.chat)
    }

    async fn send_message(&self, chat_id: &str, content: &str) -> Result<(), ApiError> {
        self.require_token()?;
        let req = self
            .request(Method::POST, &format!("chat/{chat_id}/messages"))
            .json(&MessageBody { content });
        self.unit(req).await
    }

    async fn update_status(&self, chat_id: &str, status: ChatStatus) -> Result<(), ApiError> {
        self.require_token()?;
        let req = self
            .request(Method::PUT, &format!("chat/{chat_id}"))
            .json(&StatusBody { status });
        self.unit(req).await
    }

    async fn add_review(&self, chat_id: &str, review: &Review) -> Result<(), ApiError> {
        self.require_token()?;
        let req = self
            .request(Method::POST, &format!("chat/{chat_id}/review"))
            .json(review);
        self.unit(req).await
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<(), ApiError> {
        self.require_token()?;
        self.unit(self.request(Method::DELETE, &format!("chat/{chat_id}")))
            .await
    }

    async fn list_alarms(&self) -> Result<Vec<Alarm>, ApiError> {
        self.require_token()?;
        let data: AlarmsData = self.data(self.request(Method::GET, "user/alarms")).await?;
        Ok(data.alarms)
    }

    async fn create_alarm(&self, alarm: &NewAlarm) -> Result<(), ApiError> {
        self.require_token()?;
        self.unit(self.request(Method::POST, "user/alarms").json(alarm))
            .await
    }

    async fn update_alarm(&self, alarm_id: &str, update: &AlarmUpdate) -> Result<(), ApiError> {
        self.require_token()?;
        let req = self
            .request(Method::PUT, &format!("user/alarms/{alarm_id}"))
            .json(update);
        self.unit(req).await
    }

    async fn delete_alarm(&self, alarm_id: &str) -> Result<(), ApiError> {
        self.require_token()?;
        self.unit(self.request(Method::DELETE, &format!("user/alarms/{alarm_id}")))
            .await
    }

    async fn admin_users(&self, page: u32) -> Result<Vec<AdminUser>, ApiError> {
        self.require_token()?;
        let req = self
            .request(Method::GET, "admin/users")
            .query(&[("page", page), ("limit", ADMIN_PAGE_SIZE)]);
        let data: AdminUsersData = self.data(req).await?;
        Ok(data.users)
    }

    async fn admin_chats(&self, page: u32) -> Result<Vec<AdminChat>, ApiError> {
        self.require_token()?;
        let req = self
            .request(Method::GET, "admin/chats")
            .query(&[("page", page), ("limit", ADMIN_PAGE_SIZE)]);
        let data: AdminChatsData = self.data(req).await?;
        Ok(data.chats)
    }
}
