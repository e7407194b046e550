//! Bounded per-user conversation memory.
//!
//! Each user owns a fixed-capacity FIFO ring of recent exchanges that is
//! replayed as prior turns when building a generation request. The backing
//! map is sharded per user key, so appends for unrelated users never
//! contend and a duplicate webhook delivery for one user serializes on
//! that user's shard entry alone.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::config;
use crate::genai::ChatMessage;

/// Who produced a remembered entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Role tag expected by the chat-completions wire format
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "assistant",
        }
    }
}

/// One remembered exchange turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-user bounded conversation memory
///
/// Appends always succeed; overflowing the capacity silently evicts the
/// oldest entry. Content is truncated before storage so the context sent
/// to the generation backends stays bounded.
pub struct MemoryStore {
    buffers: DashMap<String, VecDeque<ConversationEntry>>,
    capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(config::memory::CAPACITY)
    }
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: DashMap::new(),
            capacity,
        }
    }

    /// Append one entry to a user's ring, evicting the oldest past capacity.
    pub fn append(&self, user_id: &str, role: Role, content: &str) {
        let content = truncate_chars(content, config::memory::MAX_ENTRY_CHARS);
        let mut buffer = self
            .buffers
            .entry(user_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        buffer.push_back(ConversationEntry {
            role,
            content,
            timestamp: Utc::now(),
        });
        while buffer.len() > self.capacity {
            buffer.pop_front();
        }
    }

    /// Remembered turns mapped to generation-request messages.
    /// Unknown users get an empty context.
    pub fn context_for(&self, user_id: &str) -> Vec<ChatMessage> {
        self.buffers
            .get(user_id)
            .map(|buffer| {
                buffer
                    .iter()
                    .map(|entry| ChatMessage {
                        role: entry.role.as_wire().to_string(),
                        content: entry.content.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Raw entries for display (`/memory`, `/admin memory`).
    pub fn entries_for(&self, user_id: &str) -> Vec<ConversationEntry> {
        self.buffers
            .get(user_id)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of users with at least one remembered entry
    pub fn user_count(&self) -> usize {
        self.buffers.len()
    }

    /// Total remembered entries across all users
    pub fn total_entries(&self) -> usize {
        self.buffers.iter().map(|buffer| buffer.len()).sum()
    }

    /// Ring capacity per user
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admin wipe of every conversation. Returns the number of users cleared.
    pub fn reset(&self) -> usize {
        let count = self.buffers.len();
        self.buffers.clear();
        count
    }

    /// Admin wipe of one user's conversation. True if anything was cleared.
    pub fn reset_user(&self, user_id: &str) -> bool {
        self.buffers.remove(user_id).is_some()
    }

    /// Snapshot of all buffers for best-effort persistence
    pub fn snapshot(&self) -> Vec<(String, Vec<ConversationEntry>)> {
        self.buffers
            .iter()
            .map(|item| (item.key().clone(), item.value().iter().cloned().collect()))
            .collect()
    }

    /// Restore buffers from a persisted snapshot, re-applying the bound
    /// in case the capacity shrank between runs.
    pub fn restore(&self, snapshot: Vec<(String, Vec<ConversationEntry>)>) {
        for (user_id, entries) in snapshot {
            let mut buffer: VecDeque<ConversationEntry> = entries.into();
            while buffer.len() > self.capacity {
                buffer.pop_front();
            }
            self.buffers.insert(user_id, buffer);
        }
    }
}

/// Truncate to a character bound without splitting a code point
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
