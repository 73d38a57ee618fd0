//! Anthropic Messages API types.
//!
//! These are Anthropic-specific request/response structures used for HTTP
//! communication with the Messages API. The provider-agnostic shapes live
//! in `shopchat_types::llm`; [`ContentBlock`] and [`ToolDefinition`]
//! already serialize in the wire format and are reused as-is.

use serde::{Deserialize, Serialize};

use shopchat_types::llm::{ContentBlock, StopReason, ToolDefinition};

/// Request body for the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

/// How the model may use the declared tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Tools stay declared but must not be called.
    None,
}

/// A single message in an Anthropic conversation.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

// ---------------------------------------------------------------------------
// SSE event payload structs
//
// The `event:` field names the event type and `data:` carries JSON. Each
// payload is decoded into a struct chosen by the event type string, not
// through a serde tag on an outer enum.
// ---------------------------------------------------------------------------

/// Payload for `event: message_start`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartPayload {
    pub message: AnthropicMessageObj,
}

/// The message object inside a `message_start` event.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicMessageObj {
    pub id: String,
    pub model: String,
    pub usage: Option<AnthropicUsage>,
}

/// A content block in an Anthropic response.
///
/// Block kinds this client never requests (thinking, server tools) decode
/// as `Unknown` and are dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl AnthropicContentBlock {
    /// Convert into the shared block type, dropping unknown kinds.
    pub fn into_content_block(self) -> Option<ContentBlock> {
        match self {
            AnthropicContentBlock::Text { text } => Some(ContentBlock::Text { text }),
            AnthropicContentBlock::ToolUse { id, name, input } => {
                Some(ContentBlock::ToolUse { id, name, input })
            }
            AnthropicContentBlock::Unknown => None,
        }
    }
}

/// Payload for `event: content_block_delta`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlockDeltaPayload {
    pub delta: AnthropicDelta,
}

/// Delta types within a content block.
///
/// Streams never offer callable tools, so only text deltas carry anything
/// worth keeping.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// Payload for `event: message_delta`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaPayload {
    pub delta: MessageDeltaObj,
    #[serde(default)]
    pub usage: AnthropicUsage,
}

/// The delta object inside a `message_delta` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaObj {
    pub stop_reason: Option<String>,
}

/// Token usage from Anthropic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Payload for `event: error`, and the body of non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub error: AnthropicError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Non-streaming response from the Anthropic Messages API.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicNonStreamResponse {
    pub id: String,
    pub content: Vec<AnthropicContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: AnthropicUsage,
}

/// Map a wire stop reason; absent or unrecognized values count as `EndTurn`.
pub fn parse_stop_reason(raw: Option<&str>) -> StopReason {
    raw.and_then(|s| s.parse().ok()).unwrap_or(StopReason::EndTurn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_anthropic_request_serialization() {
        let req = AnthropicRequest {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 4096,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: vec![ContentBlock::Text {
                    text: "Hello".to_string(),
                }],
            }],
            system: Some("You are a product assistant.".to_string()),
            stream: true,
            tools: vec![],
            tool_choice: None,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "claude-sonnet-4-5-20250929");
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][0]["text"], "Hello");
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn test_request_with_tools_and_tool_blocks() {
        let req = AnthropicRequest {
            model: "m".to_string(),
            max_tokens: 16,
            messages: vec![
                AnthropicMessage {
                    role: "assistant".to_string(),
                    content: vec![ContentBlock::ToolUse {
                        id: "toolu_1".to_string(),
                        name: "get_product_by_sku".to_string(),
                        input: json!({"sku": "TL-1"}),
                    }],
                },
                AnthropicMessage {
                    role: "user".to_string(),
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: "toolu_1".to_string(),
                        content: "Oak tile".to_string(),
                        is_error: false,
                    }],
                },
            ],
            system: None,
            stream: false,
            tools: vec![ToolDefinition {
                name: "get_product_by_sku".to_string(),
                description: "Look up one product".to_string(),
                input_schema: json!({"type": "object"}),
            }],
            tool_choice: Some(ToolChoice::None),
        };

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["tools"][0]["name"], "get_product_by_sku");
        assert_eq!(json["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(json["tool_choice"], json!({"type": "none"}));
        assert_eq!(json["messages"][0]["content"][0]["type"], "tool_use");
        assert_eq!(json["messages"][1]["content"][0]["type"], "tool_result");
        assert_eq!(json["messages"][1]["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn test_non_stream_response_deserialization() {
        let body = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-5-20250929",
            "content": [
                {"type": "text", "text": "Let me search."},
                {"type": "tool_use", "id": "toolu_9", "name": "llm_search_products", "input": {"terms": "oak"}},
                {"type": "thinking", "thinking": "...", "signature": "x"}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 120, "output_tokens": 40}
        });

        let resp: AnthropicNonStreamResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.content.len(), 3);
        assert!(matches!(resp.content[1], AnthropicContentBlock::ToolUse { .. }));
        assert!(matches!(resp.content[2], AnthropicContentBlock::Unknown));

        let blocks: Vec<ContentBlock> = resp
            .content
            .into_iter()
            .filter_map(AnthropicContentBlock::into_content_block)
            .collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(parse_stop_reason(resp.stop_reason.as_deref()), StopReason::ToolUse);
    }

    #[test]
    fn test_delta_deserialization() {
        let text: AnthropicDelta =
            serde_json::from_value(json!({"type": "text_delta", "text": "Hi"})).unwrap();
        assert!(matches!(text, AnthropicDelta::TextDelta { text } if text == "Hi"));

        let json_delta: AnthropicDelta =
            serde_json::from_value(json!({"type": "input_json_delta", "partial_json": "{\"sku\""}))
                .unwrap();
        assert!(matches!(json_delta, AnthropicDelta::Other));

        let other: AnthropicDelta =
            serde_json::from_value(json!({"type": "signature_delta", "signature": "abc"})).unwrap();
        assert!(matches!(other, AnthropicDelta::Other));
    }

    #[test]
    fn test_error_payload_deserialization() {
        let payload: ErrorPayload = serde_json::from_value(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        }))
        .unwrap();
        assert_eq!(payload.error.error_type, "overloaded_error");
        assert_eq!(payload.error.message, "Overloaded");
    }

    #[test]
    fn test_parse_stop_reason_defaults() {
        assert_eq!(parse_stop_reason(None), StopReason::EndTurn);
        assert_eq!(parse_stop_reason(Some("refusal")), StopReason::EndTurn);
        assert_eq!(parse_stop_reason(Some("max_tokens")), StopReason::MaxTokens);
    }
}
