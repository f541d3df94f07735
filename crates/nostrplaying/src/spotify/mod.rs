// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spotify session client: OAuth, Web API wire types, and the playback trait.

pub mod api;
pub mod client;
pub mod oauth;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future returned by [`PlaybackService`] calls.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// A playable track as reported by the streaming service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub artists: Vec<String>,
    /// External playback URL (`external_urls.spotify`).
    pub url: Option<String>,
}

/// Device the player is currently attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub kind: String,
}

/// Player state captured once after login.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub shuffle: bool,
    pub device: Option<Device>,
}

/// Authenticated handle used to query and control playback.
///
/// Object-safe for use as `Arc<dyn PlaybackService>`.
pub trait PlaybackService: Send + Sync {
    /// ID of the logged-in user.
    fn current_user(&self) -> ServiceFuture<'_, String>;

    /// Player state, or `None` when no device is active.
    fn player_state(&self) -> ServiceFuture<'_, Option<PlayerSnapshot>>;

    /// Currently playing track, or `None` when nothing is playing.
    fn currently_playing(&self) -> ServiceFuture<'_, Option<Track>>;

    fn play(&self) -> ServiceFuture<'_, ()>;

    fn pause(&self) -> ServiceFuture<'_, ()>;

    fn next(&self) -> ServiceFuture<'_, ()>;

    fn previous(&self) -> ServiceFuture<'_, ()>;

    fn shuffle(&self, state: bool) -> ServiceFuture<'_, ()>;
}
