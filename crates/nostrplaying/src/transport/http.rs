// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use crate::error::{ErrorKind, Failure, KindExt};
use crate::nostr::event::epoch_secs;
use crate::played_log::PlayedEntry;
use crate::session::Session;
use crate::spotify::client::SpotifyClient;
use crate::state::AppState;
use crate::transport::MENU_HTML;

// -- Request types ------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Set by the authorization server when the user denies access.
    #[serde(default)]
    pub error: Option<String>,
}

/// Actions under `/player/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Play,
    Pause,
    Next,
    Previous,
    Shuffle,
    NowPlaying,
}

impl PlayerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Shuffle => "shuffle",
            Self::NowPlaying => "nowplaying",
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlayerAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "next" => Ok(Self::Next),
            "previous" => Ok(Self::Previous),
            "shuffle" => Ok(Self::Shuffle),
            "nowplaying" => Ok(Self::NowPlaying),
            other => anyhow::bail!("unknown player action: {other}"),
        }
    }
}

// -- Handlers -----------------------------------------------------------------

/// `GET /callback`: OAuth redirect target.
///
/// Both failure paths answer 403 and hand the error to the supervisor.
pub async fn callback(State(s): State<Arc<AppState>>, Query(q): Query<CallbackQuery>) -> Response {
    if s.handoff.is_resolved() {
        tracing::debug!("login already completed, ignoring callback");
        return Html(MENU_HTML).into_response();
    }

    let state = q.state.unwrap_or_default();
    if !s.auth.check_state(&state) {
        tracing::warn!(state = %state, "oauth state mismatch");
        let delivered = s.handoff.resolve(Err(anyhow::anyhow!("state mismatch: {state}")));
        return answer(delivered, (StatusCode::FORBIDDEN, "State mismatch").into_response());
    }

    let token = match (q.error, q.code) {
        (Some(error), _) => Err(anyhow::anyhow!("authorization denied: {error}")),
        (None, None) => Err(anyhow::anyhow!("callback is missing the authorization code")),
        (None, Some(code)) => s.auth.exchange(&code).await,
    };
    match token {
        Ok(token) => {
            let client = SpotifyClient::new(s.api_base.clone(), Arc::clone(&s.auth), token);
            let delivered = s.handoff.resolve(Ok(Arc::new(client)));
            answer(delivered, Html(format!("Login Completed!{MENU_HTML}")).into_response())
        }
        Err(e) => {
            tracing::warn!(err = %format!("{e:#}"), "token exchange failed");
            let delivered = s.handoff.resolve(Err(e.context("couldn't get token")));
            answer(delivered, (StatusCode::FORBIDDEN, "Couldn't get token").into_response())
        }
    }
}

/// A callback that lost the race to another one answers with the plain menu.
fn answer(delivered: bool, response: Response) -> Response {
    if delivered {
        response
    } else {
        tracing::debug!("login resolved by a concurrent callback");
        Html(MENU_HTML).into_response()
    }
}

/// `GET /player/{action}`: always 200 with the menu.
pub async fn player(
    State(s): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> Html<&'static str> {
    tracing::info!(action = %action, "player request");

    let action = match action.parse::<PlayerAction>() {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!(err = %e, "ignoring player request");
            return Html(MENU_HTML);
        }
    };
    let Some(session) = s.session().await else {
        tracing::warn!(action = %action, "not logged in");
        return Html(MENU_HTML);
    };

    if let Err(failure) = dispatch(&session, action).await {
        tracing::warn!(
            action = %action,
            kind = %failure.kind,
            err = %format!("{:#}", failure.source),
            "player action failed"
        );
    }
    Html(MENU_HTML)
}

async fn dispatch(session: &Session, action: PlayerAction) -> Result<(), Failure> {
    let client = session.client();
    match action {
        PlayerAction::Play => client.play().await.kind(ErrorKind::Control),
        PlayerAction::Pause => client.pause().await.kind(ErrorKind::Control),
        PlayerAction::Next => client.next().await.kind(ErrorKind::Control),
        PlayerAction::Previous => client.previous().await.kind(ErrorKind::Control),
        PlayerAction::Shuffle => {
            let state = session.toggle_shuffle().await.kind(ErrorKind::Control)?;
            tracing::info!(shuffle = state, "shuffle toggled");
            Ok(())
        }
        PlayerAction::NowPlaying => {
            let track = client.currently_playing().await.kind(ErrorKind::Fetch)?;
            let text = track.map(|t| PlayedEntry::from_track(&t, epoch_secs()).display());
            match &text {
                Some(text) => tracing::info!(track = %text, "now playing"),
                None => tracing::info!("nothing playing"),
            }
            session.set_now_playing(text).await;
            Ok(())
        }
    }
}

/// Any other path: log and answer an empty 200.
pub async fn fallback(uri: Uri) -> StatusCode {
    tracing::info!(uri = %uri, "unhandled request");
    StatusCode::OK
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
