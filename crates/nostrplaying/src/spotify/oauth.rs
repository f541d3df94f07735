// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth authorization code flow against Spotify, with optional PKCE (RFC 7636).

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Scopes needed to read and control playback.
pub const SCOPES: &str = "user-read-currently-playing user-read-recently-played \
                          user-read-playback-state user-modify-playback-state";

const REFRESH_RETRIES: u32 = 3;

/// Static OAuth client settings.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub auth_url: String,
    pub token_url: String,
    pub client_id: String,
    /// When unset the flow runs as a PKCE public client.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
}

/// Standard OAuth2 token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// One authorization attempt: settings plus the per-process state token
/// and PKCE verifier.
pub struct AuthFlow {
    settings: OAuthSettings,
    state: String,
    code_verifier: Option<String>,
    http: reqwest::Client,
}

impl AuthFlow {
    /// Create a flow. A random state is generated when `state` is `None`.
    pub fn new(settings: OAuthSettings, state: Option<String>) -> Self {
        let code_verifier = match settings.client_secret {
            Some(_) => None,
            None => Some(generate_code_verifier()),
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { settings, state: state.unwrap_or_else(generate_state), code_verifier, http }
    }

    /// URL the user visits to grant access.
    pub fn authorize_url(&self) -> String {
        let challenge = self.code_verifier.as_deref().map(compute_code_challenge);
        build_auth_url(
            &self.settings.auth_url,
            &self.settings.client_id,
            &self.settings.redirect_uri,
            &self.settings.scope,
            &self.state,
            challenge.as_deref(),
        )
    }

    /// Compare a callback's state parameter against ours in constant time.
    pub fn check_state(&self, candidate: &str) -> bool {
        constant_time_eq(candidate, &self.state)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange(&self, code: &str) -> anyhow::Result<TokenResponse> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];
        if let Some(ref verifier) = self.code_verifier {
            form.push(("client_id", self.settings.client_id.as_str()));
            form.push(("code_verifier", verifier.as_str()));
        }
        self.token_request(&form).await.map_err(|e| e.context("token exchange failed"))
    }

    /// Refresh an access token with exponential backoff retries.
    pub async fn refresh(&self, refresh_token: &str) -> anyhow::Result<TokenResponse> {
        let mut backoff = Duration::from_secs(1);
        let max_backoff = Duration::from_secs(60);

        for attempt in 0..=REFRESH_RETRIES {
            match self.refresh_once(refresh_token).await {
                Ok(token) => return Ok(token),
                Err(e) => {
                    if attempt == REFRESH_RETRIES {
                        return Err(e);
                    }
                    tracing::debug!(attempt, err = %e, "refresh attempt failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(max_backoff);
                }
            }
        }

        anyhow::bail!("refresh exhausted all retries")
    }

    async fn refresh_once(&self, refresh_token: &str) -> anyhow::Result<TokenResponse> {
        let mut form = vec![("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        if self.code_verifier.is_some() {
            form.push(("client_id", self.settings.client_id.as_str()));
        }
        self.token_request(&form).await.map_err(|e| e.context("refresh failed"))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> anyhow::Result<TokenResponse> {
        let mut req = self.http.post(&self.settings.token_url).form(form);
        if let Some(ref secret) = self.settings.client_secret {
            req = req.basic_auth(&self.settings.client_id, Some(secret));
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("token endpoint returned {status}: {text}");
        }

        let token: TokenResponse = resp.json().await?;
        Ok(token)
    }
}

/// Random PKCE verifier: 32 bytes, base64url, 43 characters.
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge for `verifier`: unpadded base64url of its SHA-256.
pub fn compute_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Random CSRF state for the authorize redirect.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the authorization URL. PKCE parameters are appended when a
/// `code_challenge` is given.
pub fn build_auth_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
    code_challenge: Option<&str>,
) -> String {
    let mut url = format!(
        "{auth_url}?client_id={client_id}\
         &response_type=code\
         &redirect_uri={redirect_uri}\
         &scope={scope}\
         &state={state}",
        client_id = urlencoding(client_id),
        redirect_uri = urlencoding(redirect_uri),
        scope = urlencoding(scope),
        state = urlencoding(state),
    );
    if let Some(challenge) = code_challenge {
        url.push_str(&format!(
            "&code_challenge={}&code_challenge_method=S256",
            urlencoding(challenge)
        ));
    }
    url
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Form-style encoding for URL query parameters (spaces as `+`).
fn urlencoding(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0xf) as usize]));
            }
        }
    }
    out
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
