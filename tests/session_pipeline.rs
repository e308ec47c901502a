//! End-to-end session behaviour over HTTP.

mod common;

use common::*;
use sessionkeeper::application_port::*;
use sessionkeeper::domain_model::*;
use std::time::Duration;

fn expired_session_api() -> ApiState {
    ApiState {
        access_token: None,
        refresh_token: Some("rt1".to_string()),
        generation: 1,
        subject: "u1".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn refresh_rotates_credentials_and_replays_request() {
    let api = spawn_api(expired_session_api());
    let dir = tempfile::tempdir().unwrap();
    seed_store(dir.path(), "at1", "rt1", "u1").await;

    let session = session_for(&api.base_url(), &api.base_url(), dir.path(), Duration::from_secs(5));
    assert_eq!(session.load().await, SessionPhase::Ready);

    let response = session.send(ApiRequest::get("/api/clients")).await.unwrap();
    assert_eq!(response.status, 200);

    assert_eq!(
        api.authorization(),
        vec![Some("Bearer at1".to_string()), Some("Bearer at2".to_string())]
    );
    assert_eq!(
        api.state.lock().unwrap().refresh_bodies,
        vec![serde_json::json!({ "refresh_token": "rt1" })]
    );
    assert_eq!(session.snapshot(), Some(CredentialPair::new("at2", "rt2", "u1")));
    assert_eq!(stored(dir.path(), "access_token").await.as_deref(), Some("at2"));
    assert_eq!(stored(dir.path(), "refresh_token").await.as_deref(), Some("rt2"));
    assert_eq!(stored(dir.path(), "_id").await.as_deref(), Some("u1"));
}

#[tokio::test]
async fn concurrent_expiry_makes_one_refresh_call() {
    let mut state = expired_session_api();
    state.refresh_delay = Duration::from_millis(100);
    let api = spawn_api(state);
    let dir = tempfile::tempdir().unwrap();
    seed_store(dir.path(), "at1", "rt1", "u1").await;

    let session = session_for(&api.base_url(), &api.base_url(), dir.path(), Duration::from_secs(5));
    session.load().await;

    let mut calls = Vec::new();
    for resource in ["clients", "tasks", "projects", "notes", "calendar", "boards", "users", "stats"] {
        let session = session.clone();
        calls.push(tokio::spawn(async move {
            session.send(ApiRequest::get(format!("/api/{}", resource))).await
        }));
    }
    for call in calls {
        assert_eq!(call.await.unwrap().unwrap().status, 200);
    }
    assert_eq!(api.refresh_calls(), 1);
    assert_eq!(session.phase(), SessionPhase::Ready);
}

#[tokio::test]
async fn refresh_network_failure_expires_all_callers() {
    let api = spawn_api(expired_session_api());
    let dir = tempfile::tempdir().unwrap();
    seed_store(dir.path(), "at1", "rt1", "u1").await;

    // nothing listens on port 1, so the refresh call fails to connect
    let session = session_for(&api.base_url(), "http://127.0.0.1:1", dir.path(), Duration::from_secs(5));
    session.load().await;

    let mut calls = Vec::new();
    for _ in 0..5 {
        let session = session.clone();
        calls.push(tokio::spawn(async move {
            session.send(ApiRequest::get("/api/tasks")).await
        }));
    }
    for call in calls {
        assert!(matches!(call.await.unwrap(), Err(SessionError::SessionExpired)));
    }
    assert_eq!(session.phase(), SessionPhase::Cleared);
    for key in ["access_token", "refresh_token", "_id"] {
        assert_eq!(stored(dir.path(), key).await, None);
    }
}

#[tokio::test]
async fn slow_refresh_times_out_and_clears() {
    let mut state = expired_session_api();
    state.refresh_delay = Duration::from_secs(3);
    let api = spawn_api(state);
    let dir = tempfile::tempdir().unwrap();
    seed_store(dir.path(), "at1", "rt1", "u1").await;

    let session = session_for(&api.base_url(), &api.base_url(), dir.path(), Duration::from_millis(200));
    session.load().await;

    let err = session.send(ApiRequest::get("/api/tasks")).await.unwrap_err();
    assert!(matches!(err, SessionError::SessionExpired));
    assert_eq!(session.phase(), SessionPhase::Cleared);
    assert_eq!(stored(dir.path(), "refresh_token").await, None);
}

#[tokio::test]
async fn persistent_401_is_returned_after_one_replay() {
    let mut state = expired_session_api();
    state.reject_everything = true;
    let api = spawn_api(state);
    let dir = tempfile::tempdir().unwrap();
    seed_store(dir.path(), "at1", "rt1", "u1").await;

    let session = session_for(&api.base_url(), &api.base_url(), dir.path(), Duration::from_secs(5));
    session.load().await;

    let response = session.send(ApiRequest::get("/api/clients")).await.unwrap();
    assert!(response.is_unauthorized());
    assert_eq!(api.api_calls(), 2);
    assert_eq!(api.refresh_calls(), 1);
}

#[tokio::test]
async fn empty_store_loads_cleared_without_traffic() {
    let api = spawn_api(expired_session_api());
    let dir = tempfile::tempdir().unwrap();

    let session = session_for(&api.base_url(), &api.base_url(), dir.path(), Duration::from_secs(5));
    assert_eq!(session.load().await, SessionPhase::Cleared);
    assert_eq!(api.api_calls(), 0);
    assert_eq!(api.refresh_calls(), 0);
}

#[tokio::test]
async fn logout_erases_durable_entries() {
    let api = spawn_api(expired_session_api());
    let dir = tempfile::tempdir().unwrap();

    let session = session_for(&api.base_url(), &api.base_url(), dir.path(), Duration::from_secs(5));
    session.load().await;
    session.update(CredentialPair::new("at9", "rt9", "u1")).await;
    assert_eq!(stored(dir.path(), "access_token").await.as_deref(), Some("at9"));

    session.clear().await;
    assert_eq!(session.phase(), SessionPhase::Cleared);
    assert_eq!(stored(dir.path(), "access_token").await, None);
}

#[tokio::test]
async fn subscribers_observe_expiry() {
    let api = spawn_api(expired_session_api());
    let dir = tempfile::tempdir().unwrap();
    seed_store(dir.path(), "at1", "rt-revoked", "u1").await;

    let session = session_for(&api.base_url(), &api.base_url(), dir.path(), Duration::from_secs(5));
    session.load().await;
    let mut views = session.subscribe();

    let err = session.send(ApiRequest::get("/api/tasks")).await.unwrap_err();
    assert!(matches!(err, SessionError::SessionExpired));

    views.changed().await.unwrap();
    assert_eq!(views.borrow_and_update().phase, SessionPhase::Cleared);
}
