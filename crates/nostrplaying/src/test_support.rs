// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: fakes for the playback service and publisher,
//! a local mock relay, and server helpers.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use crate::nostr::{Event, PublishReport, Publisher, RelayOutcome, RelayResult};
use crate::spotify::{PlaybackService, PlayerSnapshot, ServiceFuture, Track};

/// BIP-340 test vector 0 secret key.
pub const TEST_SECRET_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000003";

/// X-only public key for [`TEST_SECRET_KEY`].
pub const TEST_PUBLIC_KEY: &str =
    "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";

/// Install the ring crypto provider for reqwest/rustls.
pub fn ensure_crypto() {
    static CRYPTO_INIT: Once = Once::new();
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Build a track with a deterministic playback URL.
pub fn track(name: &str, artists: &[&str]) -> Track {
    Track {
        name: name.to_owned(),
        artists: artists.iter().map(|a| (*a).to_owned()).collect(),
        url: Some(format!("https://open.spotify.com/track/{}", name.replace(' ', "-"))),
    }
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_router(router: axum::Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{addr}"))
}

/// A `ws://` URL nothing is listening on.
pub async fn refused_relay_url() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("ws://{addr}"))
}

/// Scripted in-memory playback service.
#[derive(Default)]
pub struct FakePlayback {
    track: Mutex<Option<Track>>,
    player: Mutex<Option<PlayerSnapshot>>,
    fail_fetch: AtomicBool,
    fail_controls: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakePlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(track: Track) -> Self {
        let fake = Self::new();
        fake.set_track(Some(track));
        fake
    }

    pub fn set_track(&self, track: Option<Track>) {
        if let Ok(mut t) = self.track.lock() {
            *t = track;
        }
    }

    pub fn set_player(&self, player: Option<PlayerSnapshot>) {
        if let Ok(mut p) = self.player.lock() {
            *p = player;
        }
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::Relaxed);
    }

    pub fn fail_controls(&self, fail: bool) {
        self.fail_controls.store(fail, Ordering::Relaxed);
    }

    /// Control calls received so far, e.g. `"play"` or `"shuffle:true"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn control(&self, call: String) -> ServiceFuture<'_, ()> {
        if let Ok(mut c) = self.calls.lock() {
            c.push(call);
        }
        let fail = self.fail_controls.load(Ordering::Relaxed);
        Box::pin(async move {
            if fail {
                anyhow::bail!("no active device");
            }
            Ok(())
        })
    }
}

impl PlaybackService for FakePlayback {
    fn current_user(&self) -> ServiceFuture<'_, String> {
        Box::pin(async { Ok("listener".to_owned()) })
    }

    fn player_state(&self) -> ServiceFuture<'_, Option<PlayerSnapshot>> {
        let player = self.player.lock().map(|p| p.clone()).unwrap_or_default();
        Box::pin(async move { Ok(player) })
    }

    fn currently_playing(&self) -> ServiceFuture<'_, Option<Track>> {
        let fail = self.fail_fetch.load(Ordering::Relaxed);
        let track = self.track.lock().map(|t| t.clone()).unwrap_or_default();
        Box::pin(async move {
            if fail {
                anyhow::bail!("couldn't get currently playing track");
            }
            Ok(track)
        })
    }

    fn play(&self) -> ServiceFuture<'_, ()> {
        self.control("play".into())
    }

    fn pause(&self) -> ServiceFuture<'_, ()> {
        self.control("pause".into())
    }

    fn next(&self) -> ServiceFuture<'_, ()> {
        self.control("next".into())
    }

    fn previous(&self) -> ServiceFuture<'_, ()> {
        self.control("previous".into())
    }

    fn shuffle(&self, state: bool) -> ServiceFuture<'_, ()> {
        self.control(format!("shuffle:{state}"))
    }
}

/// Publisher that records events and reports every relay as accepted.
pub struct RecordingPublisher {
    relays: Vec<String>,
    events: Mutex<Vec<Event>>,
}

impl RecordingPublisher {
    pub fn new(relays: &[&str]) -> Self {
        Self { relays: relays.iter().map(|r| (*r).to_owned()).collect(), events: Mutex::default() }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Publisher for RecordingPublisher {
    fn publish<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = PublishReport> + Send + 'a>> {
        if let Ok(mut e) = self.events.lock() {
            e.push(event.clone());
        }
        let results = self
            .relays
            .iter()
            .map(|relay| RelayResult { relay: relay.clone(), outcome: RelayOutcome::Accepted })
            .collect();
        Box::pin(async move { PublishReport { results } })
    }
}

/// How a [`MockRelay`] answers `EVENT` messages.
#[derive(Debug, Clone, Copy)]
pub enum RelayBehavior {
    /// `["OK", id, true, ""]`
    Accept,
    /// `["OK", id, false, reason]`
    Reject(&'static str),
    /// Never answer (exercises the client timeout).
    Silent,
    /// Close the connection without answering.
    Close,
}

/// Minimal local relay speaking the `EVENT`/`OK` part of NIP-01.
pub struct MockRelay {
    pub url: String,
    received: Arc<Mutex<Vec<Event>>>,
}

impl MockRelay {
    pub async fn spawn(behavior: RelayBehavior) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let received: Arc<Mutex<Vec<Event>>> = Arc::default();

        let sink = Arc::clone(&received);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    while let Some(Ok(msg)) = ws.next().await {
                        let Message::Text(text) = msg else {
                            continue;
                        };
                        let Ok((verb, event)) =
                            serde_json::from_str::<(String, Event)>(text.as_str())
                        else {
                            continue;
                        };
                        if verb != "EVENT" {
                            continue;
                        }
                        let id = event.id.clone();
                        if let Ok(mut r) = sink.lock() {
                            r.push(event);
                        }
                        let reply = match behavior {
                            RelayBehavior::Accept => serde_json::json!(["OK", id, true, ""]),
                            RelayBehavior::Reject(reason) => {
                                serde_json::json!(["OK", id, false, reason])
                            }
                            RelayBehavior::Silent => {
                                tokio::time::sleep(Duration::from_secs(30)).await;
                                return;
                            }
                            RelayBehavior::Close => {
                                let _ = ws.close(None).await;
                                return;
                            }
                        };
                        // A NOTICE first, which clients must skip over.
                        let _ = ws.send(Message::Text(r#"["NOTICE","hello"]"#.into())).await;
                        let _ = ws.send(Message::Text(reply.to_string().into())).await;
                    }
                });
            }
        });

        Ok(Self { url: format!("ws://{addr}"), received })
    }

    /// Events this relay has received.
    pub fn received(&self) -> Vec<Event> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }
}
