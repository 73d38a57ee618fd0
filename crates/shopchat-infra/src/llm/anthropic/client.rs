//! AnthropicClient -- concrete [`ModelClient`] implementation for Anthropic Claude.
//!
//! Sends requests to the Anthropic Messages API (`/v1/messages`). Tool
//! detection rounds use a non-streaming request so tool-use blocks can be
//! inspected whole; the final answer is streamed over SSE.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::Instrument;

use shopchat_core::llm::client::{ModelClient, TextStream};
use shopchat_types::llm::{CompletionResponse, LlmError, ModelMessage, ToolDefinition, Usage};

use super::streaming::{create_event_stream, text_fragments, InstrumentedStream};
use super::types::{
    parse_stop_reason, AnthropicContentBlock, AnthropicMessage, AnthropicNonStreamResponse,
    AnthropicRequest, ErrorPayload, ToolChoice,
};

/// The Anthropic API version header value.
pub(crate) const API_VERSION: &str = "2023-06-01";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Claude model client.
///
/// Holds the credentials, model, output ceiling and system prompt used for
/// every request. Constructed once at startup and shared by the turn
/// orchestrator.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl AnthropicClient {
    /// Create a new client.
    ///
    /// Fails only if the HTTP client cannot be built (e.g. no TLS backend).
    pub fn new(
        api_key: SecretString,
        model: String,
        max_tokens: u32,
        system_prompt: String,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300)) // long answers over a slow link
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            max_tokens,
            system_prompt,
        })
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_request(
        &self,
        history: &[ModelMessage],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> AnthropicRequest {
        let messages = history
            .iter()
            .map(|m| AnthropicMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
            system: (!self.system_prompt.is_empty()).then(|| self.system_prompt.clone()),
            stream,
            tools: tools.to_vec(),
            // A streamed answer may follow tool rounds but must not start one.
            tool_choice: (stream && !tools.is_empty()).then_some(ToolChoice::None),
        }
    }

    async fn send_turn(&self, body: AnthropicRequest) -> Result<CompletionResponse, LlmError> {
        let response = self
            .client
            .post(self.url("/v1/messages"))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Anthropic API error response");
            return Err(error_for_status(status, error_body));
        }

        let anthropic_resp: AnthropicNonStreamResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let stop_reason = parse_stop_reason(anthropic_resp.stop_reason.as_deref());
        tracing::debug!(
            gen_ai.response.id = %anthropic_resp.id,
            gen_ai.response.finish_reasons = %stop_reason,
            gen_ai.usage.input_tokens = anthropic_resp.usage.input_tokens,
            gen_ai.usage.output_tokens = anthropic_resp.usage.output_tokens,
            "Model turn complete"
        );

        Ok(CompletionResponse {
            id: anthropic_resp.id,
            content: anthropic_resp
                .content
                .into_iter()
                .filter_map(AnthropicContentBlock::into_content_block)
                .collect(),
            model: anthropic_resp.model,
            stop_reason,
            usage: Usage {
                input_tokens: anthropic_resp.usage.input_tokens,
                output_tokens: anthropic_resp.usage.output_tokens,
            },
        })
    }
}

// AnthropicClient does not derive Debug; the key stays out of log output
// even if a caller formats the client.

impl ModelClient for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn request_turn(
        &self,
        history: &[ModelMessage],
        tools: &[ToolDefinition],
    ) -> Result<CompletionResponse, LlmError> {
        let span = tracing::info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = "anthropic",
            gen_ai.request.model = %self.model,
            gen_ai.request.max_tokens = self.max_tokens,
            gen_ai.request.stream = false,
            gen_ai.request.tool_count = tools.len(),
        );
        let body = self.build_request(history, tools, false);
        self.send_turn(body).instrument(span).await
    }

    fn request_stream(&self, history: &[ModelMessage], tools: &[ToolDefinition]) -> TextStream {
        let span = tracing::info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = "anthropic",
            gen_ai.request.model = %self.model,
            gen_ai.request.max_tokens = self.max_tokens,
            gen_ai.request.stream = true,
            gen_ai.request.tool_count = tools.len(),
            gen_ai.response.finish_reasons = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
        );
        let body = self.build_request(history, tools, true);
        let events = create_event_stream(&self.client, &self.url("/v1/messages"), body, &self.api_key);

        Box::pin(InstrumentedStream::new(text_fragments(events), span))
    }
}

/// Map a non-2xx response to an [`LlmError`].
///
/// The body is decoded as an Anthropic error envelope when possible so the
/// provider's message reaches the user rather than raw JSON.
pub(crate) fn error_for_status(status: StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        401 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        529 => LlmError::Overloaded(body),
        _ => {
            let message = serde_json::from_str::<ErrorPayload>(&body)
                .map(|p| p.error.message)
                .unwrap_or(body);
            LlmError::Provider {
                message: format!("HTTP {status}: {message}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopchat_types::chat::MessageRole;
    use futures_util::StreamExt;
    use shopchat_types::llm::ContentBlock;

    fn make_client() -> AnthropicClient {
        AnthropicClient::new(
            SecretString::from("test-key-not-real"),
            "claude-sonnet-4-5-20250929".to_string(),
            4096,
            "You are a product assistant.".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_client_name_and_model() {
        let client = make_client();
        assert_eq!(client.name(), "anthropic");
        assert_eq!(client.model(), "claude-sonnet-4-5-20250929");
        assert_eq!(client.system_prompt(), "You are a product assistant.");
    }

    #[test]
    fn test_build_request_with_tools() {
        let client = make_client();
        let history = vec![
            ModelMessage::text(MessageRole::User, "oak flooring?"),
            ModelMessage::text(MessageRole::Assistant, "Sure."),
        ];
        let tools = vec![ToolDefinition {
            name: "llm_search_products".to_string(),
            description: "Search".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        }];

        let req = client.build_request(&history, &tools, false);
        assert_eq!(req.model, "claude-sonnet-4-5-20250929");
        assert_eq!(req.max_tokens, 4096);
        assert!(!req.stream);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "user");
        assert_eq!(req.messages[1].role, "assistant");
        assert_eq!(
            req.messages[0].content,
            vec![ContentBlock::Text {
                text: "oak flooring?".to_string()
            }]
        );
        assert_eq!(req.system.as_deref(), Some("You are a product assistant."));
        assert_eq!(req.tools.len(), 1);
    }

    #[test]
    fn test_stream_request_declares_tools_with_choice_none() {
        let client = make_client();
        let history = vec![
            ModelMessage::text(MessageRole::User, "oak?"),
            ModelMessage {
                role: MessageRole::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "toolu_1".to_string(),
                    name: "llm_search_products".to_string(),
                    input: serde_json::json!({"terms": "oak"}),
                }],
            },
            ModelMessage {
                role: MessageRole::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "toolu_1".to_string(),
                    content: "Oak tile".to_string(),
                    is_error: false,
                }],
            },
        ];
        let tools = vec![ToolDefinition {
            name: "llm_search_products".to_string(),
            description: "Search".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        }];

        let req = client.build_request(&history, &tools, true);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["tools"][0]["name"], "llm_search_products");
        assert_eq!(json["tool_choice"], serde_json::json!({"type": "none"}));

        let turn = client.build_request(&history, &tools, false);
        assert!(turn.tool_choice.is_none());

        let plain = client.build_request(&history[..1], &[], true);
        assert!(plain.tools.is_empty());
        assert!(plain.tool_choice.is_none());
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let client = AnthropicClient::new(
            SecretString::from("k"),
            "m".to_string(),
            16,
            String::new(),
        )
        .unwrap();
        assert!(client.build_request(&[], &[], false).system.is_none());
    }

    #[test]
    fn test_base_url_override() {
        let client = make_client().with_base_url("http://localhost:8080/".to_string());
        assert_eq!(client.url("/v1/messages"), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_error_for_status() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimited { retry_after_ms: None }
        ));
        assert!(matches!(
            error_for_status(StatusCode::from_u16(529).unwrap(), "busy".to_string()),
            LlmError::Overloaded(b) if b == "busy"
        ));

        let err = error_for_status(
            StatusCode::BAD_REQUEST,
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#
                .to_string(),
        );
        assert_eq!(
            err.to_string(),
            "provider error: HTTP 400 Bad Request: max_tokens too large"
        );

        let err = error_for_status(StatusCode::BAD_GATEWAY, "upstream".to_string());
        assert_eq!(err.to_string(), "provider error: HTTP 502 Bad Gateway: upstream");
    }

    #[tokio::test]
    async fn test_request_turn_unreachable_host_is_provider_error() {
        let client = make_client().with_base_url("http://127.0.0.1:9".to_string());
        let err = client
            .request_turn(&[ModelMessage::text(MessageRole::User, "hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_request_stream_unreachable_host_yields_error() {
        let client = make_client().with_base_url("http://127.0.0.1:9".to_string());
        let mut stream = client.request_stream(&[ModelMessage::text(MessageRole::User, "hi")], &[]);
        let first = stream.next().await.unwrap();
        assert!(first.is_err());
        assert!(stream.next().await.is_none());
    }
}
