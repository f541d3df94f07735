// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only log of announced tracks, used as a dedup set keyed by name.
//!
//! Two line formats are understood when reading: the legacy
//! `"<name> - [<artist> <artist>]"` text line and a JSONL [`PlayedEntry`].
//! New lines are written in the configured [`RecordFormat`]. The log is
//! never compacted.

use std::collections::HashSet;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::spotify::Track;

/// Separates the track name from the artist list in legacy lines.
pub const SEPARATOR: &str = " - ";

/// On-disk format for appended lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    #[default]
    Legacy,
    Jsonl,
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Jsonl => f.write_str("jsonl"),
        }
    }
}

impl std::str::FromStr for RecordFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "jsonl" => Ok(Self::Jsonl),
            other => anyhow::bail!("invalid record format: {other}"),
        }
    }
}

/// One announced track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedEntry {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announced_at: Option<u64>,
}

impl PlayedEntry {
    pub fn from_track(track: &Track, announced_at: u64) -> Self {
        Self {
            name: track.name.clone(),
            artists: track.artists.clone(),
            url: track.url.clone(),
            announced_at: Some(announced_at),
        }
    }

    /// Human-readable `"<name> - [<artist> <artist>]"`; also the legacy line.
    pub fn display(&self) -> String {
        format!("{}{SEPARATOR}[{}]", self.name, self.artists.join(" "))
    }

    /// Render as a single log line (no trailing newline).
    pub fn render(&self, format: RecordFormat) -> anyhow::Result<String> {
        match format {
            RecordFormat::Legacy => Ok(self.display()),
            RecordFormat::Jsonl => Ok(serde_json::to_string(self)?),
        }
    }
}

/// Parsed form of one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Blank,
    /// Structured record.
    Entry(PlayedEntry),
    /// Legacy text line; `name` is everything before the first separator.
    Legacy { name: String, raw: String },
    /// Neither JSON nor containing the separator.
    Malformed,
}

/// Classify one line of the log.
pub fn parse_line(line: &str) -> LogLine {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return LogLine::Blank;
    }
    if line.starts_with('{') {
        if let Ok(entry) = serde_json::from_str::<PlayedEntry>(line) {
            return LogLine::Entry(entry);
        }
    }
    match line.find(SEPARATOR) {
        Some(idx) => LogLine::Legacy { name: line[..idx].to_owned(), raw: line.to_owned() },
        None => LogLine::Malformed,
    }
}

/// Membership view over a scanned log.
#[derive(Debug, Clone, Default)]
pub struct LogIndex {
    names: HashSet<String>,
    legacy_lines: Vec<String>,
    malformed: usize,
}

impl LogIndex {
    /// Whether `name` has been logged.
    ///
    /// Legacy lines cannot say where a name containing the separator ends,
    /// so a raw `"<name> - "` prefix match counts as well.
    pub fn contains(&self, name: &str) -> bool {
        if self.names.contains(name) {
            return true;
        }
        let prefix = format!("{name}{SEPARATOR}");
        self.legacy_lines.iter().any(|l| l.starts_with(&prefix))
    }

    pub fn names(&self) -> &HashSet<String> {
        &self.names
    }

    /// Number of lines skipped as malformed.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// File-backed played-track log.
#[derive(Debug, Clone)]
pub struct PlayedLog {
    path: PathBuf,
    format: RecordFormat,
}

impl PlayedLog {
    pub fn new(path: impl Into<PathBuf>, format: RecordFormat) -> Self {
        Self { path: path.into(), format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty log if none exists. Returns whether it was created.
    pub fn create_if_missing(&self) -> anyhow::Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("couldn't create {}", parent.display()))?;
        }
        File::create(&self.path)
            .with_context(|| format!("couldn't create played log {}", self.path.display()))?;
        Ok(true)
    }

    /// Read every line into a [`LogIndex`]. The file must exist.
    pub fn scan(&self) -> anyhow::Result<LogIndex> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("couldn't open played log {}", self.path.display()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .with_context(|| format!("couldn't read played log {}", self.path.display()))?;

        let mut index = LogIndex::default();
        for (lineno, line) in String::from_utf8_lossy(&bytes).lines().enumerate() {
            match parse_line(line) {
                LogLine::Blank => {}
                LogLine::Entry(entry) => {
                    index.names.insert(entry.name);
                }
                LogLine::Legacy { name, raw } => {
                    index.names.insert(name);
                    index.legacy_lines.push(raw);
                }
                LogLine::Malformed => {
                    index.malformed += 1;
                    tracing::warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        "skipping malformed played-log line"
                    );
                }
            }
        }
        Ok(index)
    }

    /// Append one entry as a line. The file must exist.
    ///
    /// Returns the rendered line.
    pub fn append(&self, entry: &PlayedEntry) -> anyhow::Result<String> {
        let line = entry.render(self.format)?;
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("couldn't open played log {}", self.path.display()))?;

        let mut buf = String::with_capacity(line.len() + 2);
        if !ends_with_newline(&mut file)? {
            buf.push('\n');
        }
        buf.push_str(&line);
        buf.push('\n');

        file.write_all(buf.as_bytes())
            .and_then(|()| file.flush())
            .with_context(|| format!("couldn't write to played log {}", self.path.display()))?;
        Ok(line)
    }
}

/// True for an empty file or one whose last byte is `\n`.
fn ends_with_newline(file: &mut File) -> anyhow::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
#[path = "played_log_tests.rs"]
mod tests;
