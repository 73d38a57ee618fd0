//! ModelClient trait definition.
//!
//! The two request shapes used by a turn: a fully materialized response
//! for tool-detection rounds, and a lazy text stream for the final answer.

use std::pin::Pin;

use futures_util::Stream;

use shopchat_types::llm::{CompletionResponse, LlmError, ModelMessage, ToolDefinition};

/// A lazy sequence of answer text fragments.
///
/// Consumed once; replaying an answer means issuing a new request.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// Trait for model API clients (Anthropic, test doubles).
///
/// A client is constructed explicitly with its credentials, model and
/// system prompt, then handed to the orchestrator. There is no
/// process-wide client instance.
///
/// Implementations live in shopchat-infra (e.g., `AnthropicClient`).
pub trait ModelClient: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Request one model turn over `history`, offering `tools`.
    ///
    /// Resolves only once the whole message is available, so tool-use
    /// blocks can be inspected.
    fn request_turn(
        &self,
        history: &[ModelMessage],
        tools: &[ToolDefinition],
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Open a streaming request over `history`.
    ///
    /// `tools` are declared so tool blocks already in the history stay
    /// valid, but the model is told not to call any of them.
    ///
    /// Returns a boxed stream (not RPITIT) so it stays object-safe for the
    /// `BoxModelClient` wrapper.
    fn request_stream(&self, history: &[ModelMessage], tools: &[ToolDefinition]) -> TextStream;
}
