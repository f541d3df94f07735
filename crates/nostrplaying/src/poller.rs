// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll-dedup-publish loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ErrorKind, Failure, FailurePolicy, KindExt, Policies};
use crate::nostr::event::epoch_secs;
use crate::nostr::{Announcer, PublishReport};
use crate::played_log::{PlayedEntry, PlayedLog};
use crate::session::Session;

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing is playing.
    Idle,
    /// The track name is already in the log.
    AlreadyLogged(String),
    /// The track was the last one announced by this process.
    Repeat(String),
    /// Appended `line` to the log and published the announcement.
    Announced { line: String, report: PublishReport },
}

pub struct Poller {
    session: Arc<Session>,
    log: PlayedLog,
    announcer: Announcer,
    policies: Policies,
    interval: Duration,
}

impl Poller {
    pub fn new(
        session: Arc<Session>,
        log: PlayedLog,
        announcer: Announcer,
        policies: Policies,
        interval: Duration,
    ) -> Self {
        Self { session, log, announcer, policies, interval }
    }

    /// Run one cycle: fetch, check the log, append, publish.
    pub async fn poll_once(&self) -> Result<Outcome, Failure> {
        let Some(track) = self.session.client().currently_playing().await.kind(ErrorKind::Fetch)?
        else {
            tracing::debug!("nothing playing");
            return Ok(Outcome::Idle);
        };

        let entry = PlayedEntry::from_track(&track, epoch_secs());
        let text = entry.display();
        if self.session.now_playing().await.as_deref() != Some(text.as_str()) {
            tracing::info!(track = %text, "now playing");
            self.session.set_now_playing(Some(text.clone())).await;
        }

        // Rescanned every cycle so external edits to the log are honored.
        let index = self.log.scan().kind(ErrorKind::LogIo)?;
        if index.contains(&track.name) {
            tracing::debug!(track = %track.name, "already logged");
            return Ok(Outcome::AlreadyLogged(track.name));
        }
        if self.session.last_announced().await.as_deref() == Some(track.name.as_str()) {
            tracing::debug!(track = %track.name, "already announced by this session");
            return Ok(Outcome::Repeat(track.name));
        }

        let line = self.log.append(&entry).kind(ErrorKind::LogIo)?;
        self.session.set_last_announced(track.name.clone()).await;
        tracing::info!(track = %text, "new track");

        let report = self
            .announcer
            .announce(&text, track.url.as_deref())
            .await
            .kind(ErrorKind::Publish)?;
        tracing::info!(
            track = %track.name,
            accepted = report.accepted(),
            attempted = report.attempted(),
            "announced"
        );
        Ok(Outcome::Announced { line, report })
    }

    /// Poll on every tick until `shutdown` is cancelled.
    ///
    /// Cancellation is observed between cycles; an in-flight cycle finishes
    /// first, bounded by the per-relay timeouts.
    ///
    /// Returns an error only when a failure's policy is [`FailurePolicy::Exit`].
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            // A started cycle runs to completion: once the entry is appended,
            // dropping the publish would leave it logged but never announced.
            let Err(failure) = self.poll_once().await else {
                continue;
            };
            match self.policies.for_kind(failure.kind) {
                FailurePolicy::Exit => return Err(failure.into()),
                FailurePolicy::Skip => {
                    tracing::warn!(
                        kind = %failure.kind,
                        err = %format!("{:#}", failure.source),
                        "poll failed"
                    );
                }
            }
        }

        tracing::debug!("poller stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
