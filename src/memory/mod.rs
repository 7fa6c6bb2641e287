//! Conversation memory
//!
//! A bounded log of question/answer exchanges with recency-windowed
//! rendering, prompt context building, keyword search and JSON snapshots.

pub mod conversation;
pub mod entry;
pub mod snapshot;

pub use conversation::{ConversationMemory, MemoryStats, DEFAULT_CAPACITY, NO_HISTORY};
pub use entry::{Entry, Role};
pub use snapshot::Snapshot;
