//! BoxModelClient -- object-safe dynamic dispatch wrapper for ModelClient.
//!
//! 1. Define an object-safe `ModelClientDyn` trait with boxed futures
//! 2. Blanket-impl `ModelClientDyn` for all `T: ModelClient`
//! 3. `BoxModelClient` wraps `Box<dyn ModelClientDyn>` and itself implements `ModelClient`

use std::future::Future;
use std::pin::Pin;

use shopchat_types::llm::{CompletionResponse, LlmError, ModelMessage, ToolDefinition};

use super::client::{ModelClient, TextStream};

/// Object-safe version of [`ModelClient`] with boxed futures.
pub trait ModelClientDyn: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn request_turn_boxed<'a>(
        &'a self,
        history: &'a [ModelMessage],
        tools: &'a [ToolDefinition],
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

    fn request_stream_boxed(&self, history: &[ModelMessage], tools: &[ToolDefinition])
        -> TextStream;
}

/// Blanket implementation: any `ModelClient` automatically implements `ModelClientDyn`.
impl<T: ModelClient> ModelClientDyn for T {
    fn name(&self) -> &str {
        ModelClient::name(self)
    }

    fn model(&self) -> &str {
        ModelClient::model(self)
    }

    fn request_turn_boxed<'a>(
        &'a self,
        history: &'a [ModelMessage],
        tools: &'a [ToolDefinition],
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.request_turn(history, tools))
    }

    fn request_stream_boxed(
        &self,
        history: &[ModelMessage],
        tools: &[ToolDefinition],
    ) -> TextStream {
        self.request_stream(history, tools)
    }
}

/// Type-erased model client, so the application state can hold whichever
/// client the configuration selected without carrying its type around.
pub struct BoxModelClient {
    inner: Box<dyn ModelClientDyn + Send + Sync>,
}

impl BoxModelClient {
    pub fn new<T: ModelClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }
}

impl ModelClient for BoxModelClient {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn request_turn(
        &self,
        history: &[ModelMessage],
        tools: &[ToolDefinition],
    ) -> Result<CompletionResponse, LlmError> {
        self.inner.request_turn_boxed(history, tools).await
    }

    fn request_stream(&self, history: &[ModelMessage], tools: &[ToolDefinition]) -> TextStream {
        self.inner.request_stream_boxed(history, tools)
    }
}
