mod common;

use common::mock_server::{MoodMock, NoAuthorization, TEST_TOKEN};
use moodlift::{Error, ErrorKind, SessionState, TokenStore};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_register_valid() {
    let mock = MoodMock::start().await;
    mock.mount_fixture("auth/register_valid.json").await;

    let session = mock.session();
    let user = session
        .register("alice", "alice@example.com", "pw")
        .await
        .unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.id, Some(7));
    assert!(user.created_at.is_some());
    assert!(!session.is_authenticated());
    assert_eq!(session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_register_duplicate_is_validation_error() {
    let mock = MoodMock::start().await;
    mock.mount_fixture("auth/register_duplicate.json").await;

    let err = mock
        .session()
        .register("alice", "alice@example.com", "pw")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.message(), "Username already registered");
}

#[tokio::test]
async fn test_register_invalid_email_has_field_detail() {
    let mock = MoodMock::start().await;
    mock.mount_fixture("auth/register_invalid_email.json").await;

    let err = mock
        .session()
        .register("alice", "not-an-email", "pw")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { status: 422, .. }));
    assert_eq!(err.fields()[0].field, "email");
}

#[tokio::test]
async fn test_login_sends_form_and_stores_token() {
    let mock = MoodMock::start().await;
    let token = json!({"access_token": "fresh", "token_type": "bearer"});
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=pw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token))
        .expect(1)
        .mount(&mock.server)
        .await;

    let session = mock.session();
    assert!(!session.is_authenticated());

    session.login("alice", "pw").await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(mock.tokens.get().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_login_overwrites_previous_token() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("auth/login_valid.json").await;
    mock.tokens.set("stale").unwrap();

    mock.session().login("alice", "pw").await.unwrap();

    assert_eq!(mock.tokens.get().as_deref(), Some(TEST_TOKEN));
}

#[tokio::test]
async fn test_login_wrong_password_surfaces_message() {
    let mock = MoodMock::start().await;
    mock.mount_fixture("auth/login_wrong_password.json").await;

    let session = mock.session();
    let err = session.login("alice", "wrong").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.message(), "Incorrect username or password");
    assert_eq!(
        session.state(),
        SessionState::AuthError("Incorrect username or password".to_string())
    );
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_logout_is_immediate() {
    let mock = MoodMock::start().await;
    mock.mount_fixture("auth/login_valid.json").await;

    let session = mock.session();
    session.login("alice", "pw").await.unwrap();
    assert!(session.is_authenticated());
    let requests_after_login = mock.request_count().await;

    session.logout();

    assert!(!session.is_authenticated());
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(mock.request_count().await, requests_after_login);
}

#[tokio::test]
async fn test_current_user_valid() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("auth/me_valid.json").await;

    let user = mock.session().current_user().await.unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");
}

#[tokio::test]
async fn test_current_user_without_token_makes_no_request() {
    let mock = MoodMock::start().await;
    mock.mount_fixture("auth/me_valid.json").await;

    let err = mock.session().current_user().await.unwrap_err();

    assert!(matches!(err, Error::NotAuthenticated));
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn test_current_user_401_clears_token() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("auth/me_expired.json").await;

    let session = mock.session();
    assert!(session.is_authenticated());

    let err = session.current_user().await.unwrap_err();

    assert!(matches!(err, Error::SessionExpired));
    assert!(!session.is_authenticated());
    assert!(!mock.tokens.has());
}

#[tokio::test]
async fn test_current_user_server_error_keeps_token() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("auth/me_server_error.json").await;

    let session = mock.session();
    let err = session.current_user().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(err.is_retryable());
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_current_user_network_error_keeps_token() {
    let mock = MoodMock::start_logged_in().await;
    let session = moodlift::Session::new(mock.api().with_base_url("http://127.0.0.1:9/api/v1/"));

    let err = session.current_user().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_external_logout_reads_as_anonymous() {
    let mock = MoodMock::start_logged_in().await;
    let session = mock.session();
    assert_eq!(session.state(), SessionState::Authenticated);

    // another holder of the store drops the token
    mock.tokens.clear();

    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_login_ignores_stale_stored_token() {
    let mock = MoodMock::start().await;
    mock.tokens.set("stale").unwrap();
    let token = json!({"access_token": "fresh", "token_type": "bearer"});
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(NoAuthorization)
        .respond_with(ResponseTemplate::new(200).set_body_json(token))
        .expect(1)
        .mount(&mock.server)
        .await;

    let session = mock.session();
    session.login("alice", "pw").await.unwrap();

    assert_eq!(mock.tokens.get().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_register_ignores_stale_stored_token() {
    let mock = MoodMock::start().await;
    mock.tokens.set("stale").unwrap();
    let alice = json!({"id": 7, "username": "alice", "email": "alice@example.com"});
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/register"))
        .and(NoAuthorization)
        .respond_with(ResponseTemplate::new(201).set_body_json(alice))
        .expect(1)
        .mount(&mock.server)
        .await;

    let user = mock
        .session()
        .register("alice", "alice@example.com", "pw")
        .await
        .unwrap();

    assert_eq!(user.id, Some(7));
    assert_eq!(mock.tokens.get().as_deref(), Some("stale"));
}
