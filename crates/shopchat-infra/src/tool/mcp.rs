//! MCP (Model Context Protocol) implementation of [`ToolBackend`].
//!
//! `McpToolBackend` translates each validated [`ToolCall`] into a JSON-RPC
//! 2.0 `tools/call` request against the product-search MCP server's HTTP
//! endpoint (`{base_url}/mcp`). The server may answer with a plain JSON body
//! or with a single-message SSE body; both are accepted.
//!
//! | Tool call variant | MCP tool name           |
//! |-------------------|-------------------------|
//! | `SearchProducts`  | `llm_search_products`   |
//! | `SmartSearch`     | `smart_search_products` |
//! | `ProductBySku`    | `get_product_by_sku`    |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use shopchat_core::tool::ToolBackend;
use shopchat_types::tool::{ToolCall, ToolError};

/// Timeout for a single tool call. Product searches can be slow.
const CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for the startup reachability check.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-RPC 2.0 request envelope for MCP `tools/call`.
#[derive(Debug, Serialize)]
struct McpRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: McpCallParams<'a>,
}

#[derive(Debug, Serialize)]
struct McpCallParams<'a> {
    name: &'a str,
    arguments: serde_json::Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
struct McpResponse {
    result: Option<McpToolResult>,
    error: Option<McpError>,
}

#[derive(Debug, Deserialize)]
struct McpToolResult {
    #[serde(default)]
    content: Vec<McpContent>,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct McpContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct McpError {
    code: i64,
    message: String,
}

/// Product-search tool backend speaking MCP over HTTP.
#[derive(Debug)]
pub struct McpToolBackend {
    http: Client,
    base_url: String,
    mcp_url: String,
    next_id: AtomicU64,
}

impl McpToolBackend {
    /// Build a backend for the MCP server at `base_url`
    /// (e.g. `http://localhost:8000`).
    pub fn new(base_url: &str) -> Result<Self, ToolError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            mcp_url: format!("{base_url}/mcp"),
            base_url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn mcp_url(&self) -> &str {
        &self.mcp_url
    }

    /// Probe `{base_url}/` so a missing server shows up in the startup log.
    ///
    /// Any HTTP response counts as reachable; only connection failures and
    /// timeouts are errors.
    pub async fn health_check(&self) -> Result<(), ToolError> {
        self.http
            .get(format!("{}/", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ToolError::Transport(format!("MCP server not reachable at {}: {e}", self.base_url)))
    }

    /// Call an MCP tool and return its joined text content.
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<String, ToolError> {
        let request = McpRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "tools/call",
            params: McpCallParams { name, arguments },
        };

        let resp = self
            .http
            .post(&self.mcp_url)
            .header("accept", "application/json, text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Transport(format!("MCP {name} timed out: {e}"))
                } else {
                    ToolError::Transport(format!("MCP {name}: {e}"))
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ToolError::Transport(format!("MCP {name}: {e}")))?;
        if !status.is_success() {
            return Err(ToolError::Backend(format!("MCP {name} HTTP {}: {body}", status.as_u16())));
        }

        parse_response(name, &body)
    }
}

impl ToolBackend for McpToolBackend {
    async fn call(&self, call: &ToolCall) -> Result<String, ToolError> {
        let name = call.name();
        tracing::debug!(tool = name, url = %self.mcp_url, "Calling MCP tool");
        let text = self.call_tool(name, call.arguments()).await?;
        tracing::debug!(tool = name, result_len = text.len(), "MCP tool returned");
        Ok(text)
    }
}

/// Decode a `tools/call` response body into the tool's text result.
///
/// Accepts plain JSON or an SSE body, in which case the last event with
/// data carries the JSON-RPC message.
fn parse_response(name: &str, body: &str) -> Result<String, ToolError> {
    let payload = sse_payload(body);
    let json = payload.as_deref().unwrap_or(body);
    let response: McpResponse = serde_json::from_str(json)
        .map_err(|e| ToolError::Backend(format!("MCP {name} response parse error: {e}")))?;

    if let Some(err) = response.error {
        return Err(ToolError::Backend(format!(
            "MCP {name} error {}: {}",
            err.code, err.message
        )));
    }

    let result = response
        .result
        .ok_or_else(|| ToolError::Backend(format!("MCP {name}: response has no result")))?;
    let text = result
        .content
        .into_iter()
        .filter_map(|c| c.text)
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error {
        return Err(ToolError::Backend(text));
    }
    Ok(text)
}

/// Data of the last SSE event in `body`, its `data:` lines joined by `\n`.
fn sse_payload(body: &str) -> Option<String> {
    let mut last: Option<Vec<&str>> = None;
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.is_empty() {
            if !current.is_empty() {
                last = Some(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(data) = line.strip_prefix("data:") {
            current.push(data.strip_prefix(' ').unwrap_or(data));
        }
    }
    if !current.is_empty() {
        last = Some(current);
    }

    last.map(|lines| lines.join("\n"))
}
