// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the OAuth callback and player endpoints.
//!
//! The app runs under `axum_test::TestServer`; only the Spotify stub binds a port.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_test::TestServer;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use nostrplaying::session::Session;
use nostrplaying::spotify::oauth::{AuthFlow, OAuthSettings, SCOPES};
use nostrplaying::spotify::PlayerSnapshot;
use nostrplaying::state::{AppState, Handoff, LoginResult};
use nostrplaying::test_support::{ensure_crypto, spawn_router, track, FakePlayback};
use nostrplaying::transport::{build_router, MENU_HTML};

const STATE: &str = "fixed-state";

fn auth(base: &str) -> Arc<AuthFlow> {
    ensure_crypto();
    let settings = OAuthSettings {
        auth_url: format!("{base}/authorize"),
        token_url: format!("{base}/api/token"),
        client_id: "client-123".into(),
        client_secret: Some("shh".into()),
        redirect_uri: "http://localhost:8080/callback".into(),
        scope: SCOPES.into(),
    };
    Arc::new(AuthFlow::new(settings, Some(STATE.into())))
}

fn test_state(base: &str) -> (Arc<AppState>, oneshot::Receiver<LoginResult>) {
    let (handoff, rx) = Handoff::channel();
    let state = AppState::new(auth(base), format!("{base}/v1"), handoff, CancellationToken::new());
    (Arc::new(state), rx)
}

fn test_server(state: Arc<AppState>) -> anyhow::Result<TestServer> {
    Ok(TestServer::new(build_router(state))?)
}

async fn logged_in(state: &AppState, fake: Arc<FakePlayback>) {
    let session = Session::new(fake, "listener".into(), PlayerSnapshot::default());
    state.set_session(Arc::new(session)).await;
}

async fn spotify_stub(status: StatusCode) -> anyhow::Result<String> {
    spotify_stub_with_delay(status, Duration::ZERO).await
}

/// Token endpoint plus `/v1/me`, answering token requests with `status`
/// after `delay`.
async fn spotify_stub_with_delay(status: StatusCode, delay: Duration) -> anyhow::Result<String> {
    let router = Router::new()
        .route(
            "/api/token",
            post(move || async move {
                tokio::time::sleep(delay).await;
                (
                    status,
                    Json(serde_json::json!({
                        "access_token": "at-1",
                        "token_type": "Bearer",
                        "expires_in": 3600,
                        "refresh_token": "rt-1",
                    })),
                )
            }),
        )
        .route("/v1/me", get(|| async { Json(serde_json::json!({ "id": "u1" })) }));
    spawn_router(router).await
}

// -- Player -------------------------------------------------------------------

#[tokio::test]
async fn player_before_login_returns_menu() -> anyhow::Result<()> {
    let (state, _rx) = test_state("http://unused");
    let server = test_server(state)?;

    let resp = server.get("/player/play").await;
    resp.assert_status_ok();
    assert_eq!(resp.text(), MENU_HTML);
    assert_eq!(resp.header("content-type"), "text/html; charset=utf-8");
    Ok(())
}

#[tokio::test]
async fn player_actions_forward_to_session() -> anyhow::Result<()> {
    let (state, _rx) = test_state("http://unused");
    let fake = Arc::new(FakePlayback::new());
    logged_in(&state, fake.clone()).await;
    let server = test_server(state)?;

    for action in ["play", "pause", "next", "previous"] {
        let resp = server.get(&format!("/player/{action}")).await;
        resp.assert_status_ok();
        assert_eq!(resp.text(), MENU_HTML);
    }
    assert_eq!(fake.calls(), vec!["play", "pause", "next", "previous"]);
    Ok(())
}

#[tokio::test]
async fn shuffle_flips_snapshot_each_time() -> anyhow::Result<()> {
    let (state, _rx) = test_state("http://unused");
    let fake = Arc::new(FakePlayback::new());
    logged_in(&state, fake.clone()).await;
    let server = test_server(Arc::clone(&state))?;

    server.get("/player/shuffle").await.assert_status_ok();
    server.get("/player/shuffle").await.assert_status_ok();
    server.get("/player/shuffle").await.assert_status_ok();
    assert_eq!(fake.calls(), vec!["shuffle:true", "shuffle:false", "shuffle:true"]);

    let session = state.session().await.ok_or_else(|| anyhow::anyhow!("no session"))?;
    assert!(session.player().await.shuffle);
    Ok(())
}

#[tokio::test]
async fn control_errors_still_return_menu() -> anyhow::Result<()> {
    let (state, _rx) = test_state("http://unused");
    let fake = Arc::new(FakePlayback::new());
    fake.fail_controls(true);
    logged_in(&state, fake.clone()).await;
    let server = test_server(state)?;

    let resp = server.get("/player/play").await;
    resp.assert_status_ok();
    assert_eq!(resp.text(), MENU_HTML);
    assert_eq!(fake.calls(), vec!["play"]);
    Ok(())
}

#[tokio::test]
async fn nowplaying_records_track() -> anyhow::Result<()> {
    let (state, _rx) = test_state("http://unused");
    let fake = Arc::new(FakePlayback::playing(track("Song B", &["Artist2"])));
    logged_in(&state, fake).await;
    let server = test_server(Arc::clone(&state))?;

    server.get("/player/nowplaying").await.assert_status_ok();
    let session = state.session().await.ok_or_else(|| anyhow::anyhow!("no session"))?;
    assert_eq!(session.now_playing().await.as_deref(), Some("Song B - [Artist2]"));
    Ok(())
}

#[tokio::test]
async fn unknown_action_returns_menu() -> anyhow::Result<()> {
    let (state, _rx) = test_state("http://unused");
    let fake = Arc::new(FakePlayback::new());
    logged_in(&state, fake.clone()).await;
    let server = test_server(state)?;

    let resp = server.get("/player/volume").await;
    resp.assert_status_ok();
    assert_eq!(resp.text(), MENU_HTML);
    assert!(fake.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn other_paths_return_empty_ok() -> anyhow::Result<()> {
    let (state, _rx) = test_state("http://unused");
    let server = test_server(state)?;

    for path in ["/", "/favicon.ico", "/player"] {
        let resp = server.get(path).await;
        resp.assert_status_ok();
        assert_eq!(resp.text(), "");
    }
    Ok(())
}

// -- Callback -----------------------------------------------------------------

#[tokio::test]
async fn callback_state_mismatch_is_forbidden() -> anyhow::Result<()> {
    let (state, rx) = test_state("http://unused");
    let server = test_server(state)?;

    let resp = server
        .get("/callback")
        .add_query_param("code", "c")
        .add_query_param("state", "evil")
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);

    let err = rx.await?.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.contains("state mismatch"), "{err}");
    Ok(())
}

#[tokio::test]
async fn callback_token_failure_is_forbidden() -> anyhow::Result<()> {
    let base = spotify_stub(StatusCode::BAD_REQUEST).await?;
    let (state, rx) = test_state(&base);
    let server = test_server(state)?;

    let resp = server
        .get("/callback")
        .add_query_param("code", "c")
        .add_query_param("state", STATE)
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(resp.text(), "Couldn't get token");
    assert!(rx.await?.is_err());
    Ok(())
}

#[tokio::test]
async fn callback_denied_by_user_is_forbidden() -> anyhow::Result<()> {
    let (state, rx) = test_state("http://unused");
    let server = test_server(state)?;

    let resp = server
        .get("/callback")
        .add_query_param("error", "access_denied")
        .add_query_param("state", STATE)
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);
    let err = rx.await?.err().map(|e| format!("{e:#}")).unwrap_or_default();
    assert!(err.contains("access_denied"), "{err}");
    Ok(())
}

#[tokio::test]
async fn callback_success_hands_off_client() -> anyhow::Result<()> {
    let base = spotify_stub(StatusCode::OK).await?;
    let (state, rx) = test_state(&base);
    let server = test_server(state)?;

    let resp = server
        .get("/callback")
        .add_query_param("code", "c")
        .add_query_param("state", STATE)
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.text(), format!("Login Completed!{MENU_HTML}"));

    let client = rx.await??;
    assert_eq!(client.current_user().await?, "u1");

    // A second callback is answered with the menu and ignored.
    let again = server
        .get("/callback")
        .add_query_param("code", "c")
        .add_query_param("state", "evil")
        .await;
    again.assert_status_ok();
    assert_eq!(again.text(), MENU_HTML);
    Ok(())
}

#[tokio::test]
async fn concurrent_callbacks_complete_login_once() -> anyhow::Result<()> {
    let base = spotify_stub_with_delay(StatusCode::OK, Duration::from_millis(200)).await?;
    let (state, rx) = test_state(&base);
    let server = test_server(state)?;

    let (first, second) = tokio::join!(
        server
            .get("/callback")
            .add_query_param("code", "c1")
            .add_query_param("state", STATE)
            .into_future(),
        server
            .get("/callback")
            .add_query_param("code", "c2")
            .add_query_param("state", STATE)
            .into_future(),
    );
    first.assert_status_ok();
    second.assert_status_ok();

    let completed = [first.text(), second.text()]
        .iter()
        .filter(|body| body.starts_with("Login Completed!"))
        .count();
    assert_eq!(completed, 1);
    assert!(first.text() == MENU_HTML || second.text() == MENU_HTML);

    let client = rx.await??;
    assert_eq!(client.current_user().await?, "u1");
    Ok(())
}
