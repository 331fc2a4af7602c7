//! HttpCareApi against a mock backend.

use std::time::Duration;

use careease_core::api::{CareApi, HttpCareApi};
use careease_core::types::{
    AlarmUpdate, ChatStatus, NewUser, ProfileUpdate, Review, Role, UserRole,
};
use careease_core::ApiError;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn signed_in(server: &MockServer) -> HttpCareApi {
    let api = HttpCareApi::new(format!("{}/api/", server.uri()), Duration::from_secs(5)).unwrap();
    api.set_token(Some("tok".to_owned()));
    api
}

#[tokio::test]
async fn login_stores_token_for_later_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(serde_json::json!({ "email": "a@b.c", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "token": "tok-123",
                "user": { "_id": "u1", "firstName": "Ada", "lastName": "L", "email": "a@b.c", "role": "user" }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/chat"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "chats": [] }
        })))
        .mount(&server)
        .await;

    let api = HttpCareApi::new(format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap();
    let (token, user) = api.login("a@b.c", "pw").await.unwrap();
    assert_eq!(token, "tok-123");
    assert_eq!(user.first_name, "Ada");
    assert_eq!(api.token().as_deref(), Some("tok-123"));

    assert!(api.list_chats().await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_chat_decodes_backend_shape() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "chat": {
                "_id": "c1",
                "title": "Medication Management",
                "issue": "Forgetting evening pills",
                "category": "daily_care",
                "priority": "urgent",
                "status": "active",
                "messages": [
                    { "role": "user", "content": "Hello", "timestamp": "2025-01-02T10:00:00Z" },
                    { "role": "assistant", "content": "Hi there friend", "timestamp": "2025-01-02T10:00:05Z" }
                ],
                "metadata": { "lastActivity": "2025-01-02T10:00:05Z" }
            }}
        })))
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    let chat = api.fetch_chat("c1").await.unwrap();

    assert_eq!(chat.id, "c1");
    assert_eq!(chat.category, careease_core::types::Category::DailyCare);
    assert_eq!(chat.priority, careease_core::types::Priority::Urgent);
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.messages[1].role, Role::Assistant);
    assert_eq!(chat.messages[1].content, "Hi there friend");
    assert!(chat.review.is_none());
    assert!(chat.last_activity().is_some());
}

#[tokio::test]
async fn send_message_posts_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/c1/messages"))
        .and(body_json(serde_json::json!({ "content": "Hello" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    api.send_message("c1", "Hello").await.unwrap();
}

#[tokio::test]
async fn error_status_keeps_backend_message() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/chat/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "success": false,
            "message": "Chat not found"
        })))
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    match api.delete_chat("missing").await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Chat not found");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_is_its_own_variant() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/alarms"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "success": false,
            "message": "Invalid token"
        })))
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    assert!(matches!(
        api.list_alarms().await,
        Err(ApiError::Unauthorized(msg)) if msg == "Invalid token"
    ));
}

#[tokio::test]
async fn requests_without_token_fail_before_reaching_the_network() {
    let server = MockServer::start().await;
    let api = HttpCareApi::new(server.uri(), Duration::from_secs(5)).unwrap();

    assert!(matches!(api.list_chats().await, Err(ApiError::NotSignedIn)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // Port 9 (discard) is closed on test machines.
    let api = HttpCareApi::new("http://127.0.0.1:9/api", Duration::from_secs(2)).unwrap();
    api.set_token(Some("tok".to_owned()));

    let err = api.fetch_chat("c1").await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(err.to_string(), "Network error. Please check your connection.");
}

#[tokio::test]
async fn review_status_and_alarm_updates_send_camel_case_bodies() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/c1/review"))
        .and(body_json(serde_json::json!({ "rating": 4, "feedback": "helpful" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/chat/c1"))
        .and(body_json(serde_json::json!({ "status": "resolved" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/user/alarms/a1"))
        .and(body_json(serde_json::json!({ "isActive": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    let review = Review::new(4, Some("  helpful ".to_owned())).unwrap();
    api.add_review("c1", &review).await.unwrap();
    api.update_status("c1", ChatStatus::Resolved).await.unwrap();
    api.update_alarm(
        "a1",
        &AlarmUpdate {
            is_active: Some(false),
            ..AlarmUpdate::default()
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn register_sends_camel_case_fields_and_signs_in() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "username": "ada_l",
            "email": "ada@example.com",
            "password": "Secret1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "token": "fresh",
                "user": { "_id": "u9", "firstName": "Ada", "lastName": "Lovelace",
                          "username": "ada_l", "email": "ada@example.com" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpCareApi::new(format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap();
    let new_user = NewUser::new(" Ada ", "Lovelace", "ada_l", "ada@example.com", "Secret1").unwrap();
    let (token, user) = api.register(&new_user).await.unwrap();

    assert_eq!(token, "fresh");
    assert_eq!(user.username, "ada_l");
    assert_eq!(user.full_name(), "Ada Lovelace");
    assert_eq!(api.token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn profile_update_sends_only_changed_fields() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/auth/profile"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(serde_json::json!({ "lastName": "Byron" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "user": { "_id": "u1", "firstName": "Ada", "lastName": "Byron", "email": "a@b.c" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    let update = ProfileUpdate::new(None, Some(" Byron "), Some("  "), None).unwrap();
    let user = api.update_profile(&update).await.unwrap();
    assert_eq!(user.last_name, "Byron");
}

#[tokio::test]
async fn dashboard_and_pending_ratings_decode() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "stats": { "totalChats": 7, "activeChats": 2, "recentResolved": 1,
                           "averageRating": 4.5, "avgResponseTime": "< 2 min" },
                "recentChats": [ { "_id": "c1", "title": "Sleep", "status": "active" } ],
                "insights": [ { "title": "Stay hydrated", "content": "Water helps", "icon": "heart" } ]
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/user/pending-ratings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "pendingChats": [ { "_id": "c4", "title": "Falls", "status": "resolved" } ] }
        })))
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    let dashboard = api.dashboard().await.unwrap();
    assert_eq!(dashboard.stats.total_chats, 7);
    assert_eq!(dashboard.stats.average_rating, Some(4.5));
    assert_eq!(
        dashboard.stats.avg_response_time.map(|t| t.to_string()).as_deref(),
        Some("< 2 min")
    );
    assert_eq!(dashboard.recent_chats[0].id, "c1");
    assert_eq!(dashboard.insights[0].title, "Stay hydrated");

    let pending = api.pending_ratings().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, ChatStatus::Resolved);
}

#[tokio::test]
async fn admin_listings_page_through_users_and_chats() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/admin/users"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "users": [ { "_id": "u2", "firstName": "Grace", "lastName": "H",
                             "email": "g@h.io", "role": "admin", "isBanned": true } ],
                "pagination": { "page": 2 }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/admin/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": { "chats": [
                { "_id": "c1", "title": "Pills", "status": "resolved",
                  "userId": { "_id": "u2", "email": "g@h.io" }, "review": { "rating": 4 } },
                { "_id": "c2", "userId": "u3" }
            ] }
        })))
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    let users = api.admin_users(2).await.unwrap();
    assert_eq!(users[0].user.email, "g@h.io");
    assert_eq!(users[0].user.role, UserRole::Admin);
    assert!(users[0].is_banned);
    assert!(users[0].is_active);

    let chats = api.admin_chats(1).await.unwrap();
    assert_eq!(chats[0].owner.as_ref().map(|o| o.label()).as_deref(), Some("g@h.io"));
    assert_eq!(chats[0].review.as_ref().map(|r| r.rating), Some(4));
    assert_eq!(chats[1].owner.as_ref().map(|o| o.label()).as_deref(), Some("u3"));
    assert_eq!(chats[1].title, "");
}

#[tokio::test]
async fn admin_listing_is_forbidden_for_regular_users() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/admin/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "success": false,
            "message": "Admin access required"
        })))
        .mount(&server)
        .await;

    let api = signed_in(&server).await;
    match api.admin_users(1).await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Admin access required");
        }
        other => panic!("expected a 403, got {other:?}"),
    }
}
