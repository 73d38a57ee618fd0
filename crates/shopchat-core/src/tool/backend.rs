//! ToolBackend trait and its boxed wrapper.

use std::future::Future;
use std::pin::Pin;

use shopchat_types::tool::{ToolCall, ToolError};

/// A backend able to execute the declared product-search tools.
///
/// The result is free text fed straight back to the model. Calls may take
/// hundreds of milliseconds; implementations must not block the runtime.
pub trait ToolBackend: Send + Sync {
    fn call(&self, call: &ToolCall) -> impl Future<Output = Result<String, ToolError>> + Send;
}

/// Object-safe version of [`ToolBackend`].
pub trait ToolBackendDyn: Send + Sync {
    fn call_boxed<'a>(
        &'a self,
        call: &'a ToolCall,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;
}

impl<T: ToolBackend> ToolBackendDyn for T {
    fn call_boxed<'a>(
        &'a self,
        call: &'a ToolCall,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>> {
        Box::pin(self.call(call))
    }
}

/// Type-erased tool backend.
pub struct BoxToolBackend {
    inner: Box<dyn ToolBackendDyn + Send + Sync>,
}

impl BoxToolBackend {
    pub fn new<T: ToolBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }
}

impl ToolBackend for BoxToolBackend {
    async fn call(&self, call: &ToolCall) -> Result<String, ToolError> {
        self.inner.call_boxed(call).await
    }
}
