// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the Spotify Web API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Method, StatusCode};
use tokio::sync::Mutex;

use crate::spotify::api::{CurrentlyPlaying, PlayerObject, UserObject};
use crate::spotify::oauth::{AuthFlow, TokenResponse};
use crate::spotify::{PlaybackService, PlayerSnapshot, ServiceFuture, Track};

/// Refresh this long before the access token actually expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct Token {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Instant,
}

impl Token {
    fn from_response(resp: TokenResponse, previous_refresh: Option<String>) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.or(previous_refresh),
            expires_at: Instant::now() + Duration::from_secs(resp.expires_in),
        }
    }

    fn needs_refresh(&self) -> bool {
        self.refresh_token.is_some() && Instant::now() + REFRESH_MARGIN >= self.expires_at
    }
}

/// Authenticated Spotify client. Refreshes its access token on demand.
pub struct SpotifyClient {
    base_url: String,
    auth: Arc<AuthFlow>,
    token: Mutex<Token>,
    client: Client,
}

impl SpotifyClient {
    pub fn new(base_url: impl Into<String>, auth: Arc<AuthFlow>, token: TokenResponse) -> Self {
        let client = Client::builder().timeout(Duration::from_secs(10)).build().unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            auth,
            token: Mutex::new(Token::from_response(token, None)),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Current access token, refreshed first if it is about to expire.
    async fn bearer(&self) -> anyhow::Result<String> {
        let mut token = self.token.lock().await;
        if token.needs_refresh() {
            let refresh_token = token.refresh_token.clone().unwrap_or_default();
            let resp = self.auth.refresh(&refresh_token).await?;
            *token = Token::from_response(resp, Some(refresh_token));
            tracing::debug!("access token refreshed");
        }
        Ok(token.access_token.clone())
    }

    /// GET a JSON body. `204 No Content` yields `None`.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> anyhow::Result<Option<T>> {
        let bearer = self.bearer().await?;
        let resp = self.client.get(self.url(path)).bearer_auth(bearer).send().await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = resp.error_for_status()?.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Send a bodiless player command.
    async fn command(&self, method: Method, path: &str) -> anyhow::Result<()> {
        let bearer = self.bearer().await?;
        self.client
            .request(method, self.url(path))
            .bearer_auth(bearer)
            .header(CONTENT_LENGTH, "0")
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl PlaybackService for SpotifyClient {
    fn current_user(&self) -> ServiceFuture<'_, String> {
        Box::pin(async move {
            let user: Option<UserObject> = self.get_json("/me").await?;
            user.map(|u| u.id).ok_or_else(|| anyhow::anyhow!("empty response from /me"))
        })
    }

    fn player_state(&self) -> ServiceFuture<'_, Option<PlayerSnapshot>> {
        Box::pin(async move {
            let player: Option<PlayerObject> = self.get_json("/me/player").await?;
            Ok(player.map(PlayerSnapshot::from))
        })
    }

    fn currently_playing(&self) -> ServiceFuture<'_, Option<Track>> {
        Box::pin(async move {
            let playing: Option<CurrentlyPlaying> =
                self.get_json("/me/player/currently-playing").await?;
            Ok(playing.and_then(|p| p.item).map(Track::from))
        })
    }

    fn play(&self) -> ServiceFuture<'_, ()> {
        Box::pin(self.command(Method::PUT, "/me/player/play"))
    }

    fn pause(&self) -> ServiceFuture<'_, ()> {
        Box::pin(self.command(Method::PUT, "/me/player/pause"))
    }

    fn next(&self) -> ServiceFuture<'_, ()> {
        Box::pin(self.command(Method::POST, "/me/player/next"))
    }

    fn previous(&self) -> ServiceFuture<'_, ()> {
        Box::pin(self.command(Method::POST, "/me/player/previous"))
    }

    fn shuffle(&self, state: bool) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.command(Method::PUT, &format!("/me/player/shuffle?state={state}")).await
        })
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
