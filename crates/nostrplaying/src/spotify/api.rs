// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spotify Web API response bodies, trimmed to the fields we read.

use std::collections::HashMap;

use serde::Deserialize;

use crate::spotify::{Device, PlayerSnapshot, Track};

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct UserObject {
    pub id: String,
}

/// `GET /me/player/currently-playing`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub item: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub name: String,
    /// Absent for podcast episodes.
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub name: String,
}

/// `GET /me/player`
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerObject {
    #[serde(default)]
    pub shuffle_state: bool,
    #[serde(default)]
    pub device: Option<DeviceObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceObject {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<TrackObject> for Track {
    fn from(item: TrackObject) -> Self {
        let url = item.external_urls.get("spotify").cloned();
        Self { name: item.name, artists: item.artists.into_iter().map(|a| a.name).collect(), url }
    }
}

impl From<PlayerObject> for PlayerSnapshot {
    fn from(player: PlayerObject) -> Self {
        Self {
            shuffle: player.shuffle_state,
            device: player.device.map(|d| Device { name: d.name, kind: d.kind }),
        }
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
