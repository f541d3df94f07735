// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay delivery: one short-lived WebSocket per relay, sequential fan-out.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::nostr::event::Event;

/// Delivers a signed event somewhere.
///
/// Object-safe for use as `Arc<dyn Publisher>`.
pub trait Publisher: Send + Sync {
    /// Attempt delivery. Never fails as a whole; per-target results are in
    /// the report.
    fn publish<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = PublishReport> + Send + 'a>>;
}

/// Result of delivering to a single relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Relay answered `OK` with `true`.
    Accepted,
    /// Relay answered `OK` with `false` and this reason.
    Rejected(String),
    /// Connect, send, or timeout failure.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResult {
    pub relay: String,
    pub outcome: RelayOutcome,
}

/// Per-relay outcomes for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub results: Vec<RelayResult>,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    pub fn accepted(&self) -> usize {
        self.results.iter().filter(|r| r.outcome == RelayOutcome::Accepted).count()
    }
}

/// Fixed list of relays, published to one after another.
pub struct RelayPool {
    relays: Vec<String>,
    timeout: Duration,
}

impl RelayPool {
    pub fn new(relays: Vec<String>, timeout: Duration) -> Self {
        Self { relays, timeout }
    }

    async fn publish_to(&self, relay: &str, event: &Event) -> RelayOutcome {
        match tokio::time::timeout(self.timeout, send_event(relay, event)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => RelayOutcome::Failed(format!("{e:#}")),
            Err(_) => RelayOutcome::Failed(format!("timed out after {:?}", self.timeout)),
        }
    }
}

impl Publisher for RelayPool {
    fn publish<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = PublishReport> + Send + 'a>> {
        Box::pin(async move {
            let mut report = PublishReport::default();
            for relay in &self.relays {
                let outcome = self.publish_to(relay, event).await;
                match outcome {
                    RelayOutcome::Accepted => {
                        tracing::info!(relay = %relay, event_id = %event.id, "published");
                    }
                    RelayOutcome::Rejected(ref reason) => {
                        tracing::warn!(relay = %relay, reason = %reason, "relay rejected event");
                    }
                    RelayOutcome::Failed(ref err) => {
                        tracing::warn!(relay = %relay, err = %err, "relay publish failed");
                    }
                }
                report.results.push(RelayResult { relay: relay.clone(), outcome });
            }
            report
        })
    }
}

/// Connect, send `["EVENT", event]`, and wait for the matching `OK`.
async fn send_event(relay: &str, event: &Event) -> anyhow::Result<RelayOutcome> {
    let (mut ws, _) = tokio_tungstenite::connect_async(relay).await?;
    let frame = serde_json::to_string(&("EVENT", event))?;
    ws.send(Message::Text(frame.into())).await?;

    let outcome = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => match parse_ok(text.as_str(), &event.id) {
                Some((true, _)) => break RelayOutcome::Accepted,
                Some((false, reason)) => break RelayOutcome::Rejected(reason),
                None => {
                    tracing::debug!(relay = %relay, msg = %text.as_str(), "ignoring relay message");
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                anyhow::bail!("connection closed before OK");
            }
            Some(Err(e)) => return Err(e.into()),
            _ => {} // ping/pong/binary ignored
        }
    };

    let _ = ws.close(None).await;
    Ok(outcome)
}

/// Parse `["OK", <id>, <accepted>, <message>]` for the given event id.
pub fn parse_ok(text: &str, event_id: &str) -> Option<(bool, String)> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let arr = value.as_array()?;
    if arr.first()?.as_str()? != "OK" || arr.get(1)?.as_str()? != event_id {
        return None;
    }
    let accepted = arr.get(2)?.as_bool()?;
    let message = arr.get(3).and_then(|m| m.as_str()).unwrap_or_default().to_owned();
    Some((accepted, message))
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
