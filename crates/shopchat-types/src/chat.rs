//! Conversation and message types for Shopchat.
//!
//! A conversation is an append-only log of user/assistant messages owned
//! by one user. The `{role, content}` projection of that log, in creation
//! order, is the history presented to the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Title given to a conversation before its first message arrives.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Author of a persisted message.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (role IN ('user', 'assistant'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A chat conversation owned by a single user.
///
/// `updated_at` is the last-activity timestamp: it moves forward on every
/// message append and on rename, and drives list ordering and the
/// retention sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// A fresh conversation for `owner_id` with both timestamps set to now.
    pub fn new(owner_id: i64, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id,
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn belongs_to(&self, owner_id: i64) -> bool {
        self.owner_id == owner_id
    }
}

/// A single persisted message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(conversation_id: Uuid, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// One `{role, content}` pair of a conversation's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_roundtrip() {
        for role in [MessageRole::User, MessageRole::Assistant] {
            let s = role.to_string();
            let parsed: MessageRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_message_role_rejects_system() {
        let result: Result<MessageRole, _> = "system".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_message_role_serde() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_new_conversation_timestamps_match() {
        let conv = Conversation::new(7, DEFAULT_TITLE);
        assert_eq!(conv.created_at, conv.updated_at);
        assert_eq!(conv.title, "New Chat");
        assert!(conv.belongs_to(7));
        assert!(!conv.belongs_to(8));
    }

    #[test]
    fn test_history_entry_from_message() {
        let msg = ChatMessage::new(Uuid::now_v7(), MessageRole::User, "hello");
        let entry = HistoryEntry::from(&msg);
        assert_eq!(entry.role, MessageRole::User);
        assert_eq!(entry.content, "hello");
    }
}
