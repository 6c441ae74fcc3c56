mod common;

use common::mock_server::MoodMock;
use moodlift::types::Transition;
use moodlift::{
    Error, ErrorKind, MemoryNavigator, Navigator, PlaylistOutcome, PlaylistState, Resume,
};
use std::cell::Cell;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

const PLAYLIST_URL: &str = "https://open.spotify.com/playlist/37i9dQZF1DX";

fn transition() -> Transition {
    serde_json::from_value(serde_json::json!({
        "id": 42,
        "timestamp": "2025-03-01T09:30:15.123456",
        "initial_mood": {"id": 1, "name": "Happy", "color": "#FFD700"},
        "target_mood": {"id": 3, "name": "Sad", "color": "#4169E1"}
    }))
    .unwrap()
}

fn navigator(location: &str) -> MemoryNavigator {
    MemoryNavigator::new(Url::parse(location).unwrap())
}

#[tokio::test]
async fn test_probe_linked() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("spotify/me_linked.json").await;

    let flow = mock.playlists();
    assert!(flow.probe().await);
    assert_eq!(flow.state(), PlaylistState::Linked);
}

#[tokio::test]
async fn test_probe_unlinked_swallows_error() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("spotify/me_unlinked.json").await;

    let flow = mock.playlists();
    assert!(!flow.probe().await);
    assert_eq!(flow.state(), PlaylistState::Unlinked);
}

#[tokio::test]
async fn test_probe_unreachable_is_unlinked() {
    let mock = MoodMock::start().await;
    let flow = moodlift::PlaylistFlow::new(mock.api().with_base_url("http://127.0.0.1:9/api/v1/"));

    assert!(!flow.probe().await);
    assert_eq!(flow.state(), PlaylistState::Unlinked);
}

#[tokio::test]
async fn test_profile_fields() {
    let mock = MoodMock::start().await;
    mock.mount_fixture("spotify/me_linked.json").await;

    let profile = mock.playlists().profile().await.unwrap();
    assert_eq!(profile.id, "alice_spotify");
    assert_eq!(profile.display_name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn test_connect_navigates_to_login() {
    let mock = MoodMock::start().await;
    let mut nav = navigator("http://localhost:5173/");

    mock.playlists().connect(&mut nav).unwrap();

    let expected = format!("{}spotify/login", mock.base_url());
    assert_eq!(nav.visited().len(), 1);
    assert_eq!(nav.visited()[0].as_str(), expected);
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn test_create_playlist_navigates_after_callback() {
    let mock = MoodMock::start_logged_in().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/spotify/create-playlist"))
        .and(body_json(serde_json::json!({
            "initial_mood_id": 1,
            "target_mood_id": 3,
            "transition_id": 42
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "playlist_url": PLAYLIST_URL,
            "track_count": 23
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    let flow = mock.playlists();
    let mut nav = navigator("http://localhost:5173/");
    let notified = Cell::new(0);

    let outcome = flow
        .create_playlist(&transition(), &mut nav, |playlist| {
            assert_eq!(playlist.track_count, Some(23));
            notified.set(notified.get() + 1);
        })
        .await
        .unwrap();

    assert_eq!(notified.get(), 1);
    assert!(matches!(outcome, PlaylistOutcome::Created(_)));
    assert_eq!(nav.visited().len(), 1);
    assert_eq!(nav.visited()[0].as_str(), PLAYLIST_URL);
    assert!(matches!(flow.state(), PlaylistState::PlaylistReady(_)));
}

#[tokio::test]
async fn test_create_playlist_server_error_does_not_navigate() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("spotify/create_playlist_server_error.json")
        .await;

    let flow = mock.playlists();
    let mut nav = navigator("http://localhost:5173/");
    let notified = Cell::new(false);

    let err = flow
        .create_playlist(&transition(), &mut nav, |_| notified.set(true))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PlaylistCreation { status: 500, .. }));
    assert_eq!(err.message(), "Error creating playlist: upstream timeout");
    assert!(err.is_retryable());
    assert!(!notified.get());
    assert!(nav.visited().is_empty());

    let PlaylistState::Error(report) = flow.state() else {
        panic!("expected error state, got {:?}", flow.state());
    };
    assert_eq!(report.kind, ErrorKind::PlaylistCreation);
    assert!(flow.state().can_create());
}

#[tokio::test]
async fn test_create_playlist_relative_url_is_an_error() {
    let mock = MoodMock::start_logged_in().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/spotify/create-playlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "playlist_url": "/playlist/abc"
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    let flow = mock.playlists();
    let mut nav = navigator("http://localhost:5173/");
    let notified = Cell::new(false);

    let err = flow
        .create_playlist(&transition(), &mut nav, |_| notified.set(true))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidUrl { .. }));
    assert!(!notified.get());
    assert!(nav.visited().is_empty());

    let PlaylistState::Error(report) = flow.state() else {
        panic!("expected error state, got {:?}", flow.state());
    };
    assert_eq!(report.kind, ErrorKind::Internal);
}

#[tokio::test]
async fn test_create_playlist_retry_after_failure() {
    let mock = MoodMock::start_logged_in().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/spotify/create-playlist"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock.server)
        .await;
    mock.mount_fixture("spotify/create_playlist_valid.json")
        .await;

    let flow = mock.playlists();
    let mut nav = navigator("http://localhost:5173/");

    let first = flow.create_playlist(&transition(), &mut nav, |_| {}).await;
    assert!(first.is_err());
    let outcome = flow
        .create_playlist(&transition(), &mut nav, |_| {})
        .await
        .unwrap();

    let PlaylistOutcome::Created(playlist) = outcome else {
        panic!("expected a created playlist");
    };
    assert_eq!(playlist.transition_id, Some(42));
    assert_eq!(nav.visited().len(), 1);
}

#[tokio::test]
async fn test_create_playlist_follows_redirect_answer() {
    let mock = MoodMock::start_logged_in().await;
    let consent = "https://accounts.spotify.com/authorize?client_id=abc";
    Mock::given(method("POST"))
        .and(path("/api/v1/spotify/create-playlist"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", consent))
        .expect(1)
        .mount(&mock.server)
        .await;

    let flow = mock.playlists();
    let mut nav = navigator("http://localhost:5173/");
    let notified = Cell::new(false);

    let outcome = flow
        .create_playlist(&transition(), &mut nav, |_| notified.set(true))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PlaylistOutcome::Redirected(Url::parse(consent).unwrap())
    );
    assert!(!notified.get());
    assert_eq!(nav.visited()[0].as_str(), consent);
    assert_eq!(flow.state(), PlaylistState::Unlinked);
}

#[tokio::test]
async fn test_duplicate_request_for_same_transition_is_rejected() {
    let mock = MoodMock::start_logged_in().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/spotify/create-playlist"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"playlist_url": PLAYLIST_URL}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock.server)
        .await;

    let flow = mock.playlists();
    let transition = transition();
    let mut first_nav = navigator("http://localhost:5173/");
    let mut second_nav = navigator("http://localhost:5173/");

    let (first, second) = tokio::join!(
        flow.create_playlist(&transition, &mut first_nav, |_| {}),
        flow.create_playlist(&transition, &mut second_nav, |_| {}),
    );

    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert!(matches!(err, Error::PlaylistInFlight { transition_id: 42 }));
    assert_eq!(err.kind(), ErrorKind::Busy);
    assert!(second_nav.visited().is_empty());
    assert_eq!(mock.request_count().await, 1);

    // guard released once the first request resolved
    let mut third_nav = navigator("http://localhost:5173/");
    assert!(flow
        .create_playlist(&transition, &mut third_nav, |_| {})
        .await
        .is_ok());
}

#[tokio::test]
async fn test_resume_without_marker() {
    let mock = MoodMock::start_logged_in().await;
    let mut nav = navigator("http://localhost:5173/?tab=history");

    let resume = mock
        .playlists()
        .resume(&mut nav, Some(&transition()), |_| {})
        .await
        .unwrap();

    assert_eq!(resume, Resume::NotReturning);
    assert_eq!(
        nav.location().as_str(),
        "http://localhost:5173/?tab=history"
    );
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn test_resume_success_creates_playlist_and_strips_marker() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("spotify/create_playlist_valid.json")
        .await;

    let flow = mock.playlists();
    let mut nav = navigator("http://localhost:5173/?auth_status=success");

    let resume = flow
        .resume(&mut nav, Some(&transition()), |_| {})
        .await
        .unwrap();

    assert!(matches!(
        resume,
        Resume::Playlist(PlaylistOutcome::Created(_))
    ));
    assert_eq!(nav.visited().len(), 1);
    assert_eq!(nav.visited()[0].as_str(), PLAYLIST_URL);
}

#[tokio::test]
async fn test_resume_marker_is_consumed_once() {
    let mock = MoodMock::start_logged_in().await;
    mock.mount_fixture("spotify/create_playlist_valid.json")
        .await;

    let flow = mock.playlists();
    let mut nav = navigator("http://localhost:5173/dashboard?auth_status=success&tab=1");

    let first = flow.resume(&mut nav, None, |_| {}).await.unwrap();
    assert_eq!(first, Resume::Linked);
    assert_eq!(
        nav.location().as_str(),
        "http://localhost:5173/dashboard?tab=1"
    );
    assert_eq!(flow.state(), PlaylistState::Linked);

    let second = flow
        .resume(&mut nav, Some(&transition()), |_| {})
        .await
        .unwrap();
    assert_eq!(second, Resume::NotReturning);
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn test_resume_denied() {
    let mock = MoodMock::start_logged_in().await;
    let flow = mock.playlists();
    let mut nav = navigator("http://localhost:5173/?auth_status=access_denied");

    let resume = flow
        .resume(&mut nav, Some(&transition()), |_| {})
        .await
        .unwrap();

    assert_eq!(resume, Resume::Denied("access_denied".to_string()));
    assert_eq!(nav.location().query(), None);
    assert!(nav.visited().is_empty());
}

#[tokio::test]
async fn test_list_playlists() {
    let mock = MoodMock::start().await;
    mock.mount_fixture("spotify/list_playlists_valid.json")
        .await;

    let playlists = mock.playlists().list_playlists().await.unwrap();

    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0].track_count, None);
    assert_eq!(playlists[0].spotify_id.as_deref(), Some("37i9dQZF1DX"));
}
