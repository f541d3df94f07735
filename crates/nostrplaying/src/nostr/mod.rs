// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nostr announcements: event signing and relay fan-out.

pub mod event;
pub mod relay;

use std::sync::Arc;

pub use self::event::{Event, EventBuilder, Keys, KIND_USER_STATUS};
pub use self::relay::{PublishReport, Publisher, RelayOutcome, RelayPool, RelayResult};

/// Status slot the announcement occupies (`d` tag).
pub const STATUS_TAG: &str = "music";

/// Builds "now playing" status events and hands them to a publisher.
pub struct Announcer {
    keys: Keys,
    publisher: Arc<dyn Publisher>,
}

impl Announcer {
    pub fn new(keys: Keys, publisher: Arc<dyn Publisher>) -> Self {
        Self { keys, publisher }
    }

    pub fn public_key_hex(&self) -> String {
        self.keys.public_key_hex()
    }

    /// Signed status event for `content`, linking `url` when known.
    pub fn build(&self, content: &str, url: Option<&str>) -> anyhow::Result<Event> {
        let mut builder = EventBuilder::new(KIND_USER_STATUS, content).tag("d", STATUS_TAG);
        if let Some(url) = url {
            builder = builder.tag("r", url);
        }
        builder.sign(&self.keys)
    }

    /// Build, sign, and publish. Relay failures are in the report, not the error.
    pub async fn announce(&self, content: &str, url: Option<&str>) -> anyhow::Result<PublishReport> {
        let event = self.build(content, url)?;
        tracing::debug!(event_id = %event.id, url = ?url, "announcing");
        Ok(self.publisher.publish(&event).await)
    }
}
