//! ToolAdapter -- validates model-supplied arguments and turns every
//! outcome, including failures, into result text.

use serde_json::Value;
use shopchat_types::tool::{ToolCall, ToolError};
use tracing::{debug, warn};

use super::backend::ToolBackend;

/// Result text of one tool call, flagged when it describes a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

/// Wraps a [`ToolBackend`] with argument validation.
///
/// A failed tool call still has to produce a `tool_result` for the model,
/// so [`ToolAdapter::invoke`] never returns an error.
pub struct ToolAdapter<T: ToolBackend> {
    backend: T,
}

impl<T: ToolBackend> ToolAdapter<T> {
    pub fn new(backend: T) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &T {
        &self.backend
    }

    /// Invoke `name` with the raw arguments the model produced.
    #[tracing::instrument(name = "tool.invoke", skip_all, fields(gen_ai.tool.name = %name))]
    pub async fn invoke(&self, name: &str, arguments: &Value) -> ToolOutput {
        match self.try_invoke(name, arguments).await {
            Ok(text) => {
                debug!(tool = name, bytes = text.len(), "Tool call succeeded");
                ToolOutput {
                    text,
                    is_error: false,
                }
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                ToolOutput {
                    text: format!("Error executing tool: {e}"),
                    is_error: true,
                }
            }
        }
    }

    async fn try_invoke(&self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        let call = ToolCall::parse(name, arguments)?;
        self.backend.call(&call).await
    }
}
