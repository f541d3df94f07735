// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nostrplaying: announces the currently playing Spotify track as a Nostr
//! user status.

pub mod config;
pub mod error;
pub mod nostr;
pub mod played_log;
pub mod poller;
pub mod session;
pub mod spotify;
pub mod state;
pub mod test_support;
pub mod transport;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{ErrorKind, KindExt, Policies};
use crate::nostr::{Announcer, Keys, RelayPool};
use crate::played_log::PlayedLog;
use crate::poller::Poller;
use crate::session::Session;
use crate::spotify::oauth::AuthFlow;
use crate::state::{AppState, Handoff, LoginResult};
use crate::transport::build_router;

/// Run until shutdown: serve the HTTP surface, wait for login, then poll.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let keys = Keys::parse(&config.nostr_key)?;
    let policies = config.policies()?;
    let log = PlayedLog::new(&config.played_log, config.record_format()?);
    if config.create_log && log.create_if_missing()? {
        tracing::info!(path = %log.path().display(), "created played log");
    }
    // Fail before login rather than on the first poll.
    let index = log.scan().kind(ErrorKind::LogIo)?;
    tracing::debug!(path = %log.path().display(), tracks = index.names().len(), "played log loaded");

    let auth = Arc::new(AuthFlow::new(config.oauth_settings(), config.state.clone()));
    let (handoff, login_rx) = Handoff::channel();
    let state = Arc::new(AppState::new(
        Arc::clone(&auth),
        config.api_base.clone(),
        handoff,
        shutdown.clone(),
    ));

    let listener = TcpListener::bind(&addr).await.with_context(|| format!("bind {addr}"))?;
    tracing::info!("nostrplaying listening on {addr}");
    let server = {
        let router = build_router(Arc::clone(&state));
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await
        })
    };

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    let supervisor = Supervisor { config: &config, auth, state, keys, log, policies };
    let result = supervisor.run(login_rx, shutdown.clone()).await;
    shutdown.cancel();
    server.await??;
    result
}

struct Supervisor<'a> {
    config: &'a Config,
    auth: Arc<AuthFlow>,
    state: Arc<AppState>,
    keys: Keys,
    log: PlayedLog,
    policies: Policies,
}

impl Supervisor<'_> {
    async fn run(
        self,
        login_rx: oneshot::Receiver<LoginResult>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        tracing::info!(
            url = %self.auth.authorize_url(),
            "please log in to Spotify by visiting this page in your browser"
        );

        let client = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            login = login_rx => login.context("login handoff dropped")?.kind(ErrorKind::Auth)?,
        };
        let session = Arc::new(Session::bootstrap(client).await.kind(ErrorKind::Auth)?);
        self.state.set_session(Arc::clone(&session)).await;

        let relays = self.config.relays();
        let pool = RelayPool::new(relays, self.config.relay_timeout());
        let announcer = Announcer::new(self.keys, Arc::new(pool));
        tracing::info!(
            pubkey = %announcer.public_key_hex(),
            relays = self.config.relays().len(),
            "announcing now playing"
        );

        Poller::new(session, self.log, announcer, self.policies, self.config.poll_interval())
            .run(shutdown)
            .await
    }
}
