// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NIP-01 events: canonical id serialization and BIP-340 signatures.

use std::str::FromStr;

use rand::Rng;
use secp256k1::schnorr::Signature;
use secp256k1::{All, Keypair, Message, Secp256k1, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// NIP-38 user status; the `d` tag selects the status slot.
pub const KIND_USER_STATUS: u16 = 30315;

/// A signing identity.
pub struct Keys {
    secp: Secp256k1<All>,
    keypair: Keypair,
    public: XOnlyPublicKey,
}

impl Keys {
    /// Parse a 64-character hex secret key.
    pub fn parse(secret_hex: &str) -> anyhow::Result<Self> {
        let secret_hex = secret_hex.trim();
        if secret_hex.len() != 64 || !secret_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("nostr secret key must be 64 hex characters");
        }
        let secp = Secp256k1::new();
        let keypair = Keypair::from_seckey_str(&secp, secret_hex)
            .map_err(|e| anyhow::anyhow!("invalid nostr secret key: {e}"))?;
        let (public, _parity) = keypair.x_only_public_key();
        Ok(Self { secp, keypair, public })
    }

    /// Lowercase hex x-only public key.
    pub fn public_key_hex(&self) -> String {
        self.public.to_string()
    }

    fn sign(&self, id: [u8; 32]) -> String {
        let mut aux = [0u8; 32];
        rand::rng().fill(&mut aux);
        let msg = Message::from_digest(id);
        self.secp.sign_schnorr_with_aux_rand(&msg, &self.keypair, &aux).to_string()
    }
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keys").field("public", &self.public_key_hex()).finish_non_exhaustive()
    }
}

/// A signed event, serialized as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl Event {
    /// Recompute the id and check the signature against `pubkey`.
    pub fn verify(&self) -> anyhow::Result<()> {
        let id = event_id(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content)?;
        if hex_lower(&id) != self.id {
            anyhow::bail!("event id does not match its contents");
        }
        let public = XOnlyPublicKey::from_str(&self.pubkey)
            .map_err(|e| anyhow::anyhow!("invalid pubkey: {e}"))?;
        let sig =
            Signature::from_str(&self.sig).map_err(|e| anyhow::anyhow!("invalid signature: {e}"))?;
        Secp256k1::verification_only()
            .verify_schnorr(&sig, &Message::from_digest(id), &public)
            .map_err(|e| anyhow::anyhow!("signature check failed: {e}"))
    }

    /// Value of the first tag named `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }
}

/// Unsigned event under construction.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    kind: u16,
    tags: Vec<Vec<String>>,
    content: String,
    created_at: Option<u64>,
}

impl EventBuilder {
    pub fn new(kind: u16, content: impl Into<String>) -> Self {
        Self { kind, tags: Vec::new(), content: content.into(), created_at: None }
    }

    pub fn tag(mut self, name: &str, value: &str) -> Self {
        self.tags.push(vec![name.to_owned(), value.to_owned()]);
        self
    }

    /// Override the creation timestamp (epoch seconds). Defaults to now.
    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Compute the id and sign it.
    pub fn sign(self, keys: &Keys) -> anyhow::Result<Event> {
        let pubkey = keys.public_key_hex();
        let created_at = self.created_at.unwrap_or_else(epoch_secs);
        let id = event_id(&pubkey, created_at, self.kind, &self.tags, &self.content)?;
        let sig = keys.sign(id);
        Ok(Event {
            id: hex_lower(&id),
            pubkey,
            created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        })
    }
}

/// SHA-256 of `[0, pubkey, created_at, kind, tags, content]` in compact JSON.
pub fn event_id(
    pubkey: &str,
    created_at: u64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> anyhow::Result<[u8; 32]> {
    let canonical = serde_json::to_string(&(0u8, pubkey, created_at, kind, tags, content))?;
    Ok(Sha256::digest(canonical.as_bytes()).into())
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Current epoch seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
