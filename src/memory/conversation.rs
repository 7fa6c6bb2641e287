//! Bounded conversation memory
//!
//! Append-only log of question/answer exchanges capped at a fixed number of
//! entries. When an insertion pushes the log past capacity the oldest entries
//! are dropped from the front, so the survivors are always the most recent
//! `capacity` entries in insertion order.
//!
//! The memory is a plain single-owner value. Callers that share it across
//! tasks wrap it in their own lock.

use super::entry::{Entry, Role};
use super::snapshot::Snapshot;
use crate::error::Result;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 20;

/// Returned by [`ConversationMemory::recent_window`] when nothing is stored.
pub const NO_HISTORY: &str = "Aucun historique disponible.";

const WINDOW_HEADER: &str = "📋 **HISTORIQUE RÉCENT:**\n";
const CONTEXT_HEADER: &str = "CONTEXTE PRÉCÉDENT:\n";

/// Counters describing the current memory contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total: usize,
    pub human_count: usize,
    pub assistant_count: usize,
    pub paired_count: usize,
    pub fill_ratio: f64,
}

/// Size-bounded, persistable log of conversation entries.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    /// front = oldest, back = newest
    entries: VecDeque<Entry>,
    capacity: usize,
}

impl ConversationMemory {
    /// Create an empty memory. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        tracing::debug!(capacity, "Conversation memory initialized");
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Create an empty memory with [`DEFAULT_CAPACITY`].
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &Entry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Record one question/answer exchange.
    pub fn append_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        let question = question.into();
        let answer = answer.into();
        tracing::debug!(
            question = %preview(&question, 30),
            "Conversation turn recorded"
        );

        let now = super::entry::now_seconds();
        self.entries.push_back(Entry::at(Role::Human, question, now));
        self.entries.push_back(Entry::at(Role::Assistant, answer, now));
        self.trim();
    }

    /// Record a single entry. Unknown role names are stored as human.
    pub fn append_entry(&mut self, role: &str, content: impl Into<String>) {
        self.push(Role::parse_lenient(role), content);
    }

    /// Record a single entry with a typed role.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push_back(Entry::new(role, content));
        self.trim();
    }

    /// Render up to the last `n` question/answer pairs, oldest first.
    ///
    /// Only the tail `2n` entries are considered, and only adjacent
    /// (human, assistant) pairs are rendered. Anything that cannot be paired
    /// is skipped.
    pub fn recent_window(&self, n: usize) -> String {
        if self.entries.is_empty() {
            return NO_HISTORY.to_string();
        }

        let start = self.entries.len().saturating_sub(n.saturating_mul(2));
        let recent: Vec<&Entry> = self.entries.range(start..).collect();

        let mut out = String::from(WINDOW_HEADER);
        out.push_str(&"-".repeat(40));
        out.push('\n');

        let mut i = 0;
        while i < recent.len() {
            match (recent.get(i), recent.get(i + 1)) {
                (Some(q), Some(a)) if q.is_human() && a.is_assistant() => {
                    out.push_str(&format!("👤 **Vous:** {}\n", q.content));
                    out.push_str(&format!("🤖 **DataBot:** {}\n", a.content));
                    out.push_str(&format!("⏰ {}\n", q.timestamp_label()));
                    out.push_str(&"-".repeat(30));
                    out.push('\n');
                    i += 2;
                }
                _ => i += 1,
            }
        }

        out
    }

    /// Build a prompt-priming context no longer than `max_chars` characters.
    ///
    /// Pairs are taken from the newest backwards and prepended, so the result
    /// reads oldest-first. The first pair that does not fit ends the walk.
    /// Returns an empty string when no pair fits.
    pub fn context_for_prompt(&self, max_chars: usize) -> String {
        let header_len = CONTEXT_HEADER.chars().count();
        let mut used = header_len;
        let mut blocks: VecDeque<String> = VecDeque::new();

        let mut end = self.entries.len();
        while end >= 2 {
            let (q, a) = (&self.entries[end - 2], &self.entries[end - 1]);
            end -= 2;

            if !(q.is_human() && a.is_assistant()) {
                continue;
            }

            let block = format!("User: {}\nAssistant: {}\n---\n", q.content, a.content);
            let block_len = block.chars().count();
            if used + block_len > max_chars {
                break;
            }
            used += block_len;
            blocks.push_front(block);
        }

        if blocks.is_empty() {
            return String::new();
        }

        let mut context = String::with_capacity(used);
        context.push_str(CONTEXT_HEADER);
        for block in blocks {
            context.push_str(&block);
        }
        context
    }

    /// Case-insensitive substring search over entry content, in insertion
    /// order. An empty keyword matches nothing.
    pub fn search(&self, keyword: &str) -> Vec<&Entry> {
        if keyword.is_empty() {
            return Vec::new();
        }
        let needle = keyword.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn stats(&self) -> MemoryStats {
        let human_count = self.entries.iter().filter(|e| e.is_human()).count();
        let assistant_count = self.entries.len() - human_count;
        MemoryStats {
            total: self.entries.len(),
            human_count,
            assistant_count,
            paired_count: human_count.min(assistant_count),
            fill_ratio: self.entries.len() as f64 / self.capacity as f64,
        }
    }

    /// Drop every entry. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.entries.clear();
        tracing::debug!("Conversation memory cleared");
    }

    /// Current entries and capacity as a snapshot document.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.entries, self.capacity)
    }

    /// Write a snapshot to `path`, reporting the typed cause on failure.
    pub fn try_save(&self, path: &Path) -> Result<()> {
        self.snapshot().write(path)
    }

    /// Write a snapshot to `path`. Failures are logged and reported as `false`.
    pub fn save(&self, path: &Path) -> bool {
        match self.try_save(path) {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    entries = self.entries.len(),
                    "Conversation memory saved"
                );
                true
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to save conversation memory");
                false
            }
        }
    }

    /// Replace entries and capacity with the snapshot at `path`.
    ///
    /// The current state is only touched once the whole snapshot parsed.
    pub fn try_load(&mut self, path: &Path) -> Result<()> {
        let snapshot = Snapshot::read(path)?;
        let mut entries: VecDeque<Entry> = snapshot.history.into();
        if entries.len() > snapshot.max_messages {
            tracing::debug!(
                stored = entries.len(),
                capacity = snapshot.max_messages,
                "Snapshot exceeds its capacity, dropping oldest entries"
            );
            let excess = entries.len() - snapshot.max_messages;
            entries.drain(..excess);
        }
        self.entries = entries;
        self.capacity = snapshot.max_messages;
        Ok(())
    }

    /// Load the snapshot at `path`. Failures are logged and reported as
    /// `false`, leaving the current state untouched.
    pub fn load(&mut self, path: &Path) -> bool {
        match self.try_load(path) {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    entries = self.entries.len(),
                    "Conversation memory loaded"
                );
                true
            }
            Err(e @ crate::Error::SnapshotNotFound(_)) => {
                tracing::warn!(error = %e, "Conversation memory not loaded");
                false
            }
            Err(e @ crate::Error::SnapshotFormat { .. }) => {
                tracing::error!(error = %e, "Conversation memory snapshot is corrupt");
                false
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load conversation memory");
                false
            }
        }
    }

    /// Drop entries from the front until the log fits its capacity.
    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl fmt::Display for ConversationMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        write!(
            f,
            "ConversationMemory: {} messages ({} humain, {} IA)",
            stats.total, stats.human_count, stats.assistant_count
        )
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}
