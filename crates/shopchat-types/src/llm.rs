//! LLM request/response types for Shopchat.
//!
//! These types model the data shapes for model interactions: content
//! blocks (text, tool use, tool result), responses, streaming events, usage
//! tracking, and error handling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chat::{HistoryEntry, MessageRole};

/// One block of structured message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// A message sent to the model: a role plus one or more content blocks.
///
/// Persisted history only ever produces single text blocks; tool-use and
/// tool-result blocks exist only in the in-memory history of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

impl ModelMessage {
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

impl From<&HistoryEntry> for ModelMessage {
    fn from(entry: &HistoryEntry) -> Self {
        ModelMessage::text(entry.role, entry.content.clone())
    }
}

/// A tool the model may call, with its JSON Schema argument contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A fully materialized model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

/// A tool-use request extracted from a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a serde_json::Value,
}

impl CompletionResponse {
    /// Tool-use blocks in the order the model emitted them.
    pub fn tool_uses(&self) -> impl Iterator<Item = ToolUse<'_>> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolUse { id, name, input }),
            _ => None,
        })
    }

    pub fn has_tool_use(&self) -> bool {
        self.tool_uses().next().is_some()
    }
}

/// Reason why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    PauseTurn,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndTurn => write!(f, "end_turn"),
            StopReason::ToolUse => write!(f, "tool_use"),
            StopReason::MaxTokens => write!(f, "max_tokens"),
            StopReason::StopSequence => write!(f, "stop_sequence"),
            StopReason::PauseTurn => write!(f, "pause_turn"),
        }
    }
}

impl FromStr for StopReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "end_turn" => Ok(StopReason::EndTurn),
            "tool_use" => Ok(StopReason::ToolUse),
            "max_tokens" => Ok(StopReason::MaxTokens),
            "stop_sequence" => Ok(StopReason::StopSequence),
            "pause_turn" => Ok(StopReason::PauseTurn),
            other => Err(format!("invalid stop reason: '{other}'")),
        }
    }
}

/// Token usage for a request/response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Events emitted while decoding a streaming model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of answer text.
    TextDelta { text: String },

    /// The message is finishing with a stop reason.
    MessageDelta { stop_reason: StopReason },

    /// Token usage information. Output tokens are cumulative.
    Usage(Usage),

    /// The stream has completed.
    Done,
}

/// Errors from model API operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(content: Vec<ContentBlock>) -> CompletionResponse {
        CompletionResponse {
            id: "msg_1".to_string(),
            content,
            model: "claude-sonnet-4-5-20250929".to_string(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        }
    }

    #[test]
    fn test_stop_reason_roundtrip() {
        for reason in [
            StopReason::EndTurn,
            StopReason::ToolUse,
            StopReason::MaxTokens,
            StopReason::StopSequence,
            StopReason::PauseTurn,
        ] {
            let parsed: StopReason = reason.to_string().parse().unwrap();
            assert_eq!(reason, parsed);
        }
    }

    #[test]
    fn test_tool_result_block_serialization() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_string(),
            content: "3 products found".to_string(),
            is_error: false,
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "tool_result");
        assert_eq!(value["tool_use_id"], "toolu_1");
        assert!(value.get("is_error").is_none());
    }

    #[test]
    fn test_tool_uses_preserve_order() {
        let resp = response(vec![
            ContentBlock::Text {
                text: "Let me look.".to_string(),
            },
            ContentBlock::ToolUse {
                id: "a".to_string(),
                name: "llm_search_products".to_string(),
                input: json!({"terms": "oak"}),
            },
            ContentBlock::ToolUse {
                id: "b".to_string(),
                name: "get_product_by_sku".to_string(),
                input: json!({"sku": "X1"}),
            },
        ]);
        let ids: Vec<&str> = resp.tool_uses().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(resp.has_tool_use());
    }

    #[test]
    fn test_plain_response_has_no_tool_use() {
        let resp = response(vec![ContentBlock::Text {
            text: "Hi".to_string(),
        }]);
        assert!(!resp.has_tool_use());
    }

    #[test]
    fn test_model_message_from_history() {
        let entry = HistoryEntry {
            role: MessageRole::User,
            content: "hello".to_string(),
        };
        let msg = ModelMessage::from(&entry);
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(
            msg.content,
            vec![ContentBlock::Text {
                text: "hello".to_string()
            }]
        );
    }
}
