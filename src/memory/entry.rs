//! Conversation entries and their serialized form

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp layout used in snapshots and rendered history.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Who produced an entry.
///
/// Serialized as `"human"` / `"ai"`. Deserialization never fails: any
/// unrecognized value is read back as [`Role::Human`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Role {
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "ai")]
    Assistant,
}

impl Role {
    /// Lenient parse: `"ai"` and `"assistant"` are the assistant, everything
    /// else is the human side.
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "ai" | "assistant" => Role::Assistant,
            _ => Role::Human,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "ai",
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse_lenient(&value)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::parse_lenient(value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub role: Role,
    pub content: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl Entry {
    /// Create an entry stamped with the current local time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::at(role, content, now_seconds())
    }

    /// Create an entry with an explicit timestamp, truncated to seconds.
    pub fn at(role: Role, content: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: timestamp.trunc_subsecs(0),
        }
    }

    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Rendered timestamp, as written to snapshots.
    pub fn timestamp_label(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Current local time with sub-second precision dropped.
pub fn now_seconds() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
