// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy and the per-kind policy the supervisor applies.

use std::fmt;

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// OAuth state mismatch, token exchange, or post-login bootstrap.
    Auth,
    /// Fetching the currently playing track.
    Fetch,
    /// A player control call made from the HTTP surface.
    Control,
    /// Reading or appending the played-track log.
    LogIo,
    /// Building, signing, or delivering an announcement.
    Publish,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::Fetch => "FETCH",
            Self::Control => "CONTROL",
            Self::LogIo => "LOG_IO",
            Self::Publish => "PUBLISH",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the supervisor reacts to a failure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the process with a non-zero status.
    Exit,
    /// Log the failure and carry on with the next cycle.
    #[default]
    Skip,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit => f.write_str("exit"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exit" => Ok(Self::Exit),
            "skip" => Ok(Self::Skip),
            other => anyhow::bail!("invalid failure policy: {other}"),
        }
    }
}

/// Configurable policies for the recoverable error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policies {
    pub fetch: FailurePolicy,
    pub log: FailurePolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self { fetch: FailurePolicy::Skip, log: FailurePolicy::Exit }
    }
}

impl Policies {
    /// Resolve the policy for `kind`. Auth failures always exit; control
    /// and publish failures are always logged and skipped.
    pub fn for_kind(&self, kind: ErrorKind) -> FailurePolicy {
        match kind {
            ErrorKind::Auth => FailurePolicy::Exit,
            ErrorKind::Fetch => self.fetch,
            ErrorKind::LogIo => self.log,
            ErrorKind::Control | ErrorKind::Publish => FailurePolicy::Skip,
        }
    }
}

/// An error tagged with its [`ErrorKind`].
#[derive(Debug)]
pub struct Failure {
    pub kind: ErrorKind,
    pub source: anyhow::Error,
}

impl Failure {
    pub fn new(kind: ErrorKind, source: anyhow::Error) -> Self {
        Self { kind, source }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.kind, self.source)
    }
}

impl std::error::Error for Failure {}

/// Tag an `anyhow` result with an [`ErrorKind`].
pub trait KindExt<T> {
    fn kind(self, kind: ErrorKind) -> Result<T, Failure>;
}

impl<T> KindExt<T> for anyhow::Result<T> {
    fn kind(self, kind: ErrorKind) -> Result<T, Failure> {
        self.map_err(|e| Failure::new(kind, e))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
