use serde_json::json;
use std::sync::Arc;
use taskboard::auth::{Identity, SessionState};
use taskboard::config::ClientOptions;
use taskboard::error::ErrorKind;
use taskboard::navigation::{Route, RouteState};
use taskboard::notice::{ChannelNoticeSink, Notice};
use taskboard::Taskboard;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    client: Taskboard,
    routes: RouteState,
    notices: UnboundedReceiver<Notice>,
}

fn harness(options: ClientOptions) -> Harness {
    let routes = RouteState::default();
    let (sink, notices) = ChannelNoticeSink::new();
    let client = Taskboard::new(options, Arc::new(sink), Arc::new(routes.clone())).unwrap();
    Harness {
        client,
        routes,
        notices,
    }
}

fn drain(rx: &mut UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

fn auth_body() -> serde_json::Value {
    json!({
        "message": "Login successful",
        "user": {
            "_id": "123",
            "username": "testuser",
            "email": "test@example.com"
        },
        "accessToken": "a",
        "refreshToken": "r"
    })
}

fn test_user() -> Identity {
    Identity {
        id: "123".to_string(),
        username: "testuser".to_string(),
        email: "test@example.com".to_string(),
        bio: None,
        profile_picture: None,
    }
}

#[tokio::test]
async fn test_fresh_process_bootstraps_unauthenticated() {
    let mock_server = MockServer::start().await;
    let h = harness(ClientOptions::default().with_base_url(&mock_server.uri()));

    assert!(h.client.session().is_loading());
    assert_eq!(h.client.session().bootstrap(), SessionState::Unauthenticated);

    assert!(h.client.session().identity().is_none());
    assert!(!h.client.session().is_authenticated());
    assert!(!h.client.session().is_loading());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sign_in_persists_tokens_and_identity() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({
            "email": "test@example.com",
            "password": "password123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut h = harness(
        ClientOptions::default()
            .with_base_url(&mock_server.uri())
            .with_session_path(&session_path),
    );
    h.client.session().bootstrap();

    let identity = h
        .client
        .session()
        .sign_in("test@example.com", "password123")
        .await
        .unwrap();

    assert_eq!(identity, test_user());
    assert_eq!(
        h.client.session().state(),
        SessionState::Authenticated(test_user())
    );
    let store = h.client.session().handle().store();
    assert_eq!(store.access_token().as_deref(), Some("a"));
    assert_eq!(store.refresh_token().as_deref(), Some("r"));
    assert_eq!(store.identity(), Some(test_user()));
    assert_eq!(h.routes.current(), Route::Dashboard);
    assert!(drain(&mut h.notices).is_empty());

    // A new process over the same file restores the session without a request
    let restarted = harness(
        ClientOptions::default()
            .with_base_url(&mock_server.uri())
            .with_session_path(&session_path),
    );
    assert_eq!(
        restarted.client.session().bootstrap(),
        SessionState::Authenticated(test_user())
    );
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sign_up_uses_registration_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .and(body_json(json!({
            "username": "testuser",
            "email": "test@example.com",
            "password": "password123"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = harness(ClientOptions::default().with_base_url(&mock_server.uri()));
    h.client.session().bootstrap();

    h.client
        .session()
        .sign_up("testuser", "test@example.com", "password123")
        .await
        .unwrap();

    assert!(h.client.session().is_authenticated());
    assert_eq!(
        h.client.session().handle().store().identity(),
        Some(test_user())
    );
    assert_eq!(h.routes.current(), Route::Dashboard);
}

#[tokio::test]
async fn test_rejected_sign_in_shows_server_message_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&mock_server)
        .await;

    let mut h = harness(ClientOptions::default().with_base_url(&mock_server.uri()));
    h.client.session().bootstrap();

    let err = h
        .client
        .session()
        .sign_in("wrong@example.com", "wrong")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::ValidationRejected));
    assert_eq!(err.status(), Some(400));
    assert_eq!(h.client.session().state(), SessionState::Unauthenticated);
    assert!(h.client.session().handle().store().is_empty());
    assert_eq!(h.routes.current(), Route::Login);
    assert_eq!(drain(&mut h.notices), vec![Notice::error("Invalid credentials")]);
}

#[tokio::test]
async fn test_sign_in_with_unexpected_body_is_unclassified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .mount(&mock_server)
        .await;

    let mut h = harness(ClientOptions::default().with_base_url(&mock_server.uri()));
    h.client.session().bootstrap();

    let err = h
        .client
        .session()
        .sign_in("test@example.com", "password123")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::UnclassifiedFailure));
    assert!(!h.client.session().is_authenticated());
    assert!(h.client.session().handle().store().is_empty());
    assert_eq!(
        drain(&mut h.notices),
        vec![Notice::error(ErrorKind::UnclassifiedFailure.default_message())]
    );
}

#[tokio::test]
async fn test_sign_out_is_local() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = harness(ClientOptions::default().with_base_url(&mock_server.uri()));
    h.client.session().bootstrap();
    h.client
        .session()
        .sign_in("test@example.com", "password123")
        .await
        .unwrap();

    h.client.session().sign_out();

    assert_eq!(h.client.session().state(), SessionState::Unauthenticated);
    assert!(h.client.session().handle().store().is_empty());
    assert_eq!(h.routes.current(), Route::Login);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}
