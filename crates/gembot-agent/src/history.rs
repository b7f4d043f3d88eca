//! Per-channel rolling history.
//!
//! Each channel keeps at most `max_length` labelled entries; the oldest are
//! dropped first. Nothing is persisted and channels are never removed.

use std::collections::VecDeque;
use std::fmt;

use dashmap::DashMap;

use gembot_core::config::MAX_HISTORY_LENGTH;

/// Stable platform channel identifier (Discord channel snowflake).
pub type ChannelKey = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

impl Speaker {
    pub fn label(self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Bot => "Bot",
        }
    }
}

/// One line of conversation. Renders as `User: …` / `Bot: …`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    speaker: Speaker,
    content: String,
}

impl HistoryEntry {
    pub fn new(speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            speaker,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Speaker::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Speaker::Bot, content)
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker.label(), self.content)
    }
}

/// Concurrency-safe map from channel to its bounded history.
///
/// Appends take the per-entry shard lock, so push and truncate happen together.
/// Two handlers in the same channel may still interleave their appends and
/// reads; only memory safety is guaranteed, not ordering.
pub struct HistoryStore {
    channels: DashMap<ChannelKey, VecDeque<HistoryEntry>>,
    max_length: usize,
}

impl HistoryStore {
    /// `max_length` is clamped to at least 1.
    pub fn new(max_length: usize) -> Self {
        Self {
            channels: DashMap::new(),
            max_length: max_length.max(1),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Push `entry` to the end of the channel's history, dropping the oldest
    /// entries beyond `max_length`.
    pub fn append(&self, channel: ChannelKey, entry: HistoryEntry) {
        let mut history = self.channels.entry(channel).or_default();
        history.push_back(entry);
        while history.len() > self.max_length {
            history.pop_front();
        }
    }

    /// Everything except the most recent entry, oldest first.
    pub fn snapshot_excluding_last(&self, channel: ChannelKey) -> Vec<HistoryEntry> {
        self.channels
            .get(&channel)
            .map(|history| {
                let keep = history.len().saturating_sub(1);
                history.iter().take(keep).cloned().collect()
            })
            .unwrap_or_default()
    }

    pub fn snapshot(&self, channel: ChannelKey) -> Vec<HistoryEntry> {
        self.channels
            .get(&channel)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, channel: ChannelKey) -> usize {
        self.channels.get(&channel).map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, channel: ChannelKey) -> bool {
        self.len(channel) == 0
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(MAX_HISTORY_LENGTH)
    }
}
