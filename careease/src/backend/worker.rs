//! Background task that owns the API client and the settings store.
//!
//! Requests are independent, so each runs on its own task: a slow send never
//! delays a poll of the open chat. A 401 on any request clears the stored
//! token before the response reaches the UI.

use std::sync::Arc;

use careease_core::api::CareApi;
use careease_core::db::SettingsStore;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::backend::types::{AlarmChange, Request, Response};
use crate::event::AppEvent;

/// Serves requests until the sending half is dropped.
pub async fn worker_loop(
    api: Arc<dyn CareApi>,
    settings: SettingsStore,
    mut rx: UnboundedReceiver<Request>,
    event_tx: UnboundedSender<AppEvent>,
) {
    while let Some(request) = rx.recv().await {
        let api = Arc::clone(&api);
        let settings = settings.clone();
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            let Some(response) = handle_request(api.as_ref(), &settings, request).await else {
                return;
            };
            if response.is_unauthorized() {
                warn!("backend rejected the stored token, clearing it");
                if let Err(e) = settings.clear_token().await {
                    warn!(error = %e, "failed to clear stored token");
                }
            }
            let _ = event_tx.send(AppEvent::Backend(Box::new(response)));
        });
    }
    debug!("backend worker stopped");
}

/// Runs one request. Settings-only requests produce no response.
async fn handle_request(
    api: &dyn CareApi,
    settings: &SettingsStore,
    request: Request,
) -> Option<Response> {
    debug!(?request, "backend request");
    let response = match request {
        Request::LoadProfile => Response::Profile(api.profile().await),
        Request::LoadDashboard => Response::Dashboard(api.dashboard().await),
        Request::LoadPendingRatings => Response::PendingRatings(api.pending_ratings().await),
        Request::LoadChats => Response::Chats(api.list_chats().await),
        Request::LoadChat(chat_id) => {
            let result = api.fetch_chat(&chat_id).await;
            Response::Chat { chat_id, result }
        }
        Request::CreateChat(chat) => Response::ChatCreated(api.create_chat(&chat).await),
        Request::Send(outgoing) => {
            let result = api.send_message(&outgoing.chat_id, &outgoing.content).await;
            Response::Sent {
                chat_id: outgoing.chat_id,
                result,
            }
        }
        Request::SetStatus { chat_id, status } => {
            let result = api.update_status(&chat_id, status).await;
            Response::StatusUpdated {
                chat_id,
                status,
                result,
            }
        }
        Request::Review { chat_id, review } => {
            let result = api.add_review(&chat_id, &review).await;
            Response::Reviewed { chat_id, result }
        }
        Request::DeleteChat(chat_id) => {
            let result = api.delete_chat(&chat_id).await;
            Response::ChatDeleted { chat_id, result }
        }
        Request::LoadAlarms => Response::Alarms(api.list_alarms().await),
        Request::CreateAlarm(alarm) => Response::AlarmChanged {
            change: AlarmChange::Created,
            result: api.create_alarm(&alarm).await,
        },
        Request::UpdateAlarm { alarm_id, update } => Response::AlarmChanged {
            change: AlarmChange::Updated,
            result: api.update_alarm(&alarm_id, &update).await,
        },
        Request::DeleteAlarm(alarm_id) => Response::AlarmChanged {
            change: AlarmChange::Deleted,
            result: api.delete_alarm(&alarm_id).await,
        },
        Request::SaveTheme(name) => {
            if let Err(e) = settings.set_theme(&name).await {
                warn!(error = %e, "failed to persist theme");
            }
            return None;
        }
    };
    if let Some(e) = response.error() {
        warn!(error = %e, "backend request failed");
    }
    Some(response)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use careease_core::types::{
        AdminChat, AdminUser, Alarm, AlarmUpdate, ChatSession, ChatStatus, Dashboard, NewAlarm,
        NewChat, NewUser, ProfileUpdate, Review, User,
    };
    use careease_core::ApiError;
    use tokio::sync::mpsc;

    use super::*;

    /// Profile calls are rejected as expired; chats load empty.
    struct ExpiredSession;

    #[async_trait]
    impl CareApi for ExpiredSession {
        async fn login(&self, _: &str, _: &str) -> Result<(String, User), ApiError> {
            Err(ApiError::NotSignedIn)
        }
        async fn register(&self, _: &NewUser) -> Result<(String, User), ApiError> {
            Err(ApiError::NotSignedIn)
        }
        async fn profile(&self) -> Result<User, ApiError> {
            Err(ApiError::Unauthorized("token expired".into()))
        }
        async fn update_profile(&self, _: &ProfileUpdate) -> Result<User, ApiError> {
            Err(ApiError::Unauthorized("token expired".into()))
        }
        async fn logout(&self) -> Result<(), ApiError> {
            Ok(())
        }
        async fn dashboard(&self) -> Result<Dashboard, ApiError> {
            Ok(Dashboard::default())
        }
        async fn pending_ratings(&self) -> Result<Vec<ChatSession>, ApiError> {
            Ok(Vec::new())
        }
        async fn list_chats(&self) -> Result<Vec<ChatSession>, ApiError> {
            Ok(Vec::new())
        }
        async fn create_chat(&self, _: &NewChat) -> Result<ChatSession, ApiError> {
            Err(ApiError::NotSignedIn)
        }
        async fn fetch_chat(&self, chat_id: &str) -> Result<ChatSession, ApiError> {
            serde_json::from_value(serde_json::json!({ "_id": chat_id, "title": "t" }))
                .map_err(|e| ApiError::Decode(e.to_string()))
        }
        async fn send_message(&self, _: &str, _: &str) -> Result<(), ApiError> {
            Ok(())
        }
        async fn update_status(&self, _: &str, _: ChatStatus) -> Result<(), ApiError> {
            Ok(())
        }
        async fn add_review(&self, _: &str, _: &Review) -> Result<(), ApiError> {
            Ok(())
        }
        async fn delete_chat(&self, _: &str) -> Result<(), ApiError> {
            Ok(())
        }
        async fn list_alarms(&self) -> Result<Vec<Alarm>, ApiError> {
            Ok(Vec::new())
        }
        async fn create_alarm(&self, _: &NewAlarm) -> Result<(), ApiError> {
            Ok(())
        }
        async fn update_alarm(&self, _: &str, _: &AlarmUpdate) -> Result<(), ApiError> {
            Ok(())
        }
        async fn delete_alarm(&self, _: &str) -> Result<(), ApiError> {
            Ok(())
        }
        async fn admin_users(&self, _: u32) -> Result<Vec<AdminUser>, ApiError> {
            Ok(Vec::new())
        }
        async fn admin_chats(&self, _: u32) -> Result<Vec<AdminChat>, ApiError> {
            Ok(Vec::new())
        }
    }

    async fn store(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::open(dir.path().join("settings.db"))
            .await
            .expect("open settings")
    }

    #[tokio::test]
    async fn unauthorized_response_clears_the_stored_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = store(&dir).await;
        settings.set_token("stale").await.expect("set token");

        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        tokio::spawn(worker_loop(
            Arc::new(ExpiredSession),
            settings.clone(),
            req_rx,
            event_tx,
        ));
        req_tx.send(Request::LoadProfile).expect("send request");

        let event = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .expect("worker answered")
            .expect("channel open");
        match event {
            AppEvent::Backend(response) => assert!(response.is_unauthorized()),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(settings.token().await.expect("read token"), None);
    }

    #[tokio::test]
    async fn chat_responses_carry_the_requested_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = store(&dir).await;

        let response = handle_request(&ExpiredSession, &settings, Request::LoadChat("c7".into()))
            .await
            .expect("a response");
        match response {
            Response::Chat { chat_id, result } => {
                assert_eq!(chat_id, "c7");
                assert_eq!(result.expect("chat").id, "c7");
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn theme_changes_are_persisted_without_a_response() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = store(&dir).await;

        let response =
            handle_request(&ExpiredSession, &settings, Request::SaveTheme("light".into())).await;
        assert!(response.is_none());
        assert_eq!(
            settings.theme().await.expect("read theme").as_deref(),
            Some("light")
        );
    }

    #[tokio::test]
    async fn dashboard_request_is_answered_with_the_dashboard() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = store(&dir).await;

        let response = handle_request(&ExpiredSession, &settings, Request::LoadDashboard).await;
        match response {
            Some(Response::Dashboard(Ok(dashboard))) => {
                assert_eq!(dashboard.stats.total_chats, 0);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }
}
