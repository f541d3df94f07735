// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{FailurePolicy, Policies};
use crate::nostr::Keys;
use crate::played_log::RecordFormat;
use crate::spotify::oauth::{OAuthSettings, SCOPES};

/// Relays announcements go to when no `--relay` is given.
pub const DEFAULT_RELAYS: [&str; 8] = [
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://nostr.wine",
    "wss://eden.nostr.land",
    "wss://relay.snort.social",
    "wss://blastr.f7z.xyz",
    "wss://relay.primal.net",
    "wss://relayable.org",
];

/// Republishes the currently playing Spotify track to Nostr relays.
#[derive(Debug, Clone, Parser)]
#[command(name = "nostrplaying", version, about)]
pub struct Config {
    /// Host address to bind to.
    #[arg(long, env = "NOSTRPLAYING_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// HTTP port to listen on (OAuth callback and player controls).
    #[arg(long, env = "NOSTRPLAYING_PORT", default_value_t = 8080)]
    pub port: u16,

    /// OAuth redirect URI registered with the Spotify application.
    #[arg(long, env = "NOSTRPLAYING_REDIRECT_URI", default_value = "http://localhost:8080/callback")]
    pub redirect_uri: String,

    /// Spotify application client ID.
    #[arg(long, env = "SPOTIFY_ID")]
    pub client_id: String,

    /// Spotify application client secret. PKCE is used when unset.
    #[arg(long, env = "SPOTIFY_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Hex-encoded Nostr secret key used to sign announcements.
    #[arg(long, env = "NOSTR_KEY", hide_env_values = true)]
    pub nostr_key: String,

    /// Path of the played-track log used for deduplication.
    #[arg(long, env = "NOSTRPLAYING_PLAYED_LOG", default_value = "previouslyPlayed.txt")]
    pub played_log: PathBuf,

    /// Create the played-track log at startup if it does not exist.
    #[arg(long, env = "NOSTRPLAYING_CREATE_LOG")]
    pub create_log: bool,

    /// Record format for appended log lines (legacy, jsonl).
    #[arg(long, env = "NOSTRPLAYING_RECORD_FORMAT", default_value = "legacy")]
    pub record_format: String,

    /// Seconds between currently-playing polls.
    #[arg(long, env = "NOSTRPLAYING_POLL_SECS", default_value_t = 120)]
    pub poll_interval_secs: u64,

    /// Relay URL to publish to (repeatable). Defaults to a fixed set of eight.
    #[arg(long = "relay", env = "NOSTRPLAYING_RELAYS", value_delimiter = ',')]
    pub relays: Vec<String>,

    /// Per-relay publish timeout in milliseconds.
    #[arg(long, env = "NOSTRPLAYING_RELAY_TIMEOUT_MS", default_value_t = 10_000)]
    pub relay_timeout_ms: u64,

    /// What to do when fetching the current track fails (exit, skip).
    #[arg(long, env = "NOSTRPLAYING_ON_FETCH_ERROR", default_value = "skip")]
    pub on_fetch_error: String,

    /// What to do when the played-track log cannot be read or written (exit, skip).
    #[arg(long, env = "NOSTRPLAYING_ON_LOG_ERROR", default_value = "exit")]
    pub on_log_error: String,

    /// Fixed OAuth state token. A random one is generated when unset.
    #[arg(long, env = "NOSTRPLAYING_STATE")]
    pub state: Option<String>,

    /// Log level filter.
    #[arg(long, env = "NOSTRPLAYING_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json).
    #[arg(long, env = "NOSTRPLAYING_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Spotify authorization endpoint.
    #[arg(long, hide = true, default_value = "https://accounts.spotify.com/authorize")]
    pub auth_url: String,

    /// Spotify token endpoint.
    #[arg(long, hide = true, default_value = "https://accounts.spotify.com/api/token")]
    pub token_url: String,

    /// Spotify Web API base URL.
    #[arg(long, hide = true, default_value = "https://api.spotify.com/v1")]
    pub api_base: String,
}

impl Config {
    /// Validate option combinations and string-typed enums.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.record_format()?;
        self.policies()?;
        Keys::parse(&self.nostr_key)?;

        if self.client_id.trim().is_empty() {
            anyhow::bail!("--client-id must not be empty");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("--poll-interval-secs must be greater than zero");
        }
        for relay in self.relays() {
            if !(relay.starts_with("wss://") || relay.starts_with("ws://")) {
                anyhow::bail!("relay must be a ws:// or wss:// URL: {relay}");
            }
        }
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn record_format(&self) -> anyhow::Result<RecordFormat> {
        self.record_format.parse()
    }

    pub fn policies(&self) -> anyhow::Result<Policies> {
        Ok(Policies {
            fetch: self.on_fetch_error.parse::<FailurePolicy>()?,
            log: self.on_log_error.parse::<FailurePolicy>()?,
        })
    }

    /// Configured relays, or [`DEFAULT_RELAYS`] when none were given.
    pub fn relays(&self) -> Vec<String> {
        if self.relays.is_empty() {
            DEFAULT_RELAYS.iter().map(|r| (*r).to_owned()).collect()
        } else {
            self.relays.clone()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }

    pub fn oauth_settings(&self) -> OAuthSettings {
        OAuthSettings {
            auth_url: self.auth_url.clone(),
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scope: SCOPES.to_owned(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
