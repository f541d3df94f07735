// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logged-in session: the playback client plus state shared between the
//! HTTP handlers and the poller.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::spotify::{PlaybackService, PlayerSnapshot};

pub struct Session {
    client: Arc<dyn PlaybackService>,
    user_id: String,
    player: RwLock<PlayerSnapshot>,
    /// Display text of the track last fetched by `nowplaying` or the poller.
    now_playing: RwLock<Option<String>>,
    /// Name of the track most recently announced.
    last_announced: RwLock<Option<String>>,
}

impl Session {
    pub fn new(client: Arc<dyn PlaybackService>, user_id: String, player: PlayerSnapshot) -> Self {
        Self {
            client,
            user_id,
            player: RwLock::new(player),
            now_playing: RwLock::new(None),
            last_announced: RwLock::new(None),
        }
    }

    /// Fetch the user and player state for a freshly authorized client.
    ///
    /// No active device is not an error; the snapshot starts at its default.
    pub async fn bootstrap(client: Arc<dyn PlaybackService>) -> anyhow::Result<Self> {
        let user_id = client.current_user().await?;
        let player = client.player_state().await?.unwrap_or_default();
        tracing::info!(
            user = %user_id,
            shuffle = player.shuffle,
            device = ?player.device.as_ref().map(|d| &d.name),
            device_kind = ?player.device.as_ref().map(|d| &d.kind),
            "logged in"
        );
        Ok(Self::new(client, user_id, player))
    }

    pub fn client(&self) -> &Arc<dyn PlaybackService> {
        &self.client
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn player(&self) -> PlayerSnapshot {
        self.player.read().await.clone()
    }

    /// Flip the shuffle flag and send the new value.
    ///
    /// The flag is flipped before the call and stays flipped if it fails.
    pub async fn toggle_shuffle(&self) -> anyhow::Result<bool> {
        let state = {
            let mut player = self.player.write().await;
            player.shuffle = !player.shuffle;
            player.shuffle
        };
        self.client.shuffle(state).await?;
        Ok(state)
    }

    pub async fn now_playing(&self) -> Option<String> {
        self.now_playing.read().await.clone()
    }

    pub async fn set_now_playing(&self, text: Option<String>) {
        *self.now_playing.write().await = text;
    }

    pub async fn last_announced(&self) -> Option<String> {
        self.last_announced.read().await.clone()
    }

    pub async fn set_last_announced(&self, name: String) {
        *self.last_announced.write().await = Some(name);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
