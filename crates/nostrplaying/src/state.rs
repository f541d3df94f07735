// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, RwLock};
use tokio_util::sync::CancellationToken;

use crate::session::Session;
use crate::spotify::oauth::AuthFlow;
use crate::spotify::PlaybackService;

/// What the OAuth callback hands to the supervisor.
pub type LoginResult = anyhow::Result<Arc<dyn PlaybackService>>;

/// Single-slot handoff from the OAuth callback to the supervisor.
///
/// Only the first [`Handoff::resolve`] is delivered.
pub struct Handoff {
    tx: Mutex<Option<oneshot::Sender<LoginResult>>>,
}

impl Handoff {
    pub fn channel() -> (Self, oneshot::Receiver<LoginResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Mutex::new(Some(tx)) }, rx)
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.lock().map(|tx| tx.is_none()).unwrap_or(true)
    }

    /// Deliver `result`. Returns false if the handoff was already resolved
    /// or the receiver is gone.
    pub fn resolve(&self, result: LoginResult) -> bool {
        let Some(tx) = self.tx.lock().ok().and_then(|mut tx| tx.take()) else {
            return false;
        };
        tx.send(result).is_ok()
    }
}

/// Shared state for the HTTP surface and the supervisor.
pub struct AppState {
    pub auth: Arc<AuthFlow>,
    /// Spotify Web API base URL handed to clients built by the callback.
    pub api_base: String,
    pub session: RwLock<Option<Arc<Session>>>,
    pub handoff: Handoff,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        auth: Arc<AuthFlow>,
        api_base: String,
        handoff: Handoff,
        shutdown: CancellationToken,
    ) -> Self {
        Self { auth, api_base, session: RwLock::new(None), handoff, shutdown }
    }

    pub async fn session(&self) -> Option<Arc<Session>> {
        self.session.read().await.clone()
    }

    pub async fn set_session(&self, session: Arc<Session>) {
        *self.session.write().await = Some(session);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
