//! Argument shapes for the declared product-search tool catalog.
//!
//! The model names a tool and supplies a loosely typed JSON argument map.
//! [`ToolCall::parse`] turns that pair into one of a closed set of typed
//! variants before anything reaches the backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Raw term-list search.
pub const SEARCH_PRODUCTS: &str = "llm_search_products";
/// Natural-language filtered search.
pub const SMART_SEARCH: &str = "smart_search_products";
/// Single-key exact lookup.
pub const PRODUCT_BY_SKU: &str = "get_product_by_sku";

/// A validated call to one of the declared tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    SearchProducts { terms: String, limit: Option<u32> },
    SmartSearch { query: String, limit: Option<u32> },
    ProductBySku { sku: String },
}

impl ToolCall {
    /// Validate `input` against the argument schema of tool `name`.
    pub fn parse(name: &str, input: &Value) -> Result<Self, ToolError> {
        let args = input
            .as_object()
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: name.to_string(),
                reason: "arguments must be a JSON object".to_string(),
            })?;

        match name {
            SEARCH_PRODUCTS => Ok(ToolCall::SearchProducts {
                terms: required_str(name, args, "terms")?,
                limit: optional_limit(name, args)?,
            }),
            SMART_SEARCH => Ok(ToolCall::SmartSearch {
                query: required_str(name, args, "query")?,
                limit: optional_limit(name, args)?,
            }),
            PRODUCT_BY_SKU => Ok(ToolCall::ProductBySku {
                sku: required_str(name, args, "sku")?,
            }),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// The catalog name of this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::SearchProducts { .. } => SEARCH_PRODUCTS,
            ToolCall::SmartSearch { .. } => SMART_SEARCH,
            ToolCall::ProductBySku { .. } => PRODUCT_BY_SKU,
        }
    }

    /// Wire arguments for the backend, omitting an absent limit.
    pub fn arguments(&self) -> Value {
        let mut args = Map::new();
        match self {
            ToolCall::SearchProducts { terms, limit } => {
                args.insert("terms".to_string(), Value::from(terms.as_str()));
                if let Some(limit) = limit {
                    args.insert("limit".to_string(), Value::from(*limit));
                }
            }
            ToolCall::SmartSearch { query, limit } => {
                args.insert("query".to_string(), Value::from(query.as_str()));
                if let Some(limit) = limit {
                    args.insert("limit".to_string(), Value::from(*limit));
                }
            }
            ToolCall::ProductBySku { sku } => {
                args.insert("sku".to_string(), Value::from(sku.as_str()));
            }
        }
        Value::Object(args)
    }

    /// Short label for progress feedback while this call is in flight.
    pub fn purpose(&self) -> &'static str {
        purpose_of(self.name())
    }
}

/// Progress label for a tool name, including names outside the catalog.
pub fn purpose_of(name: &str) -> &'static str {
    match name {
        SEARCH_PRODUCTS | SMART_SEARCH => "searching",
        PRODUCT_BY_SKU => "fetching details",
        _ => "processing",
    }
}

fn required_str(tool: &str, args: &Map<String, Value>, field: &str) -> Result<String, ToolError> {
    match args.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("'{field}' must not be empty"),
        }),
        Some(_) => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("'{field}' must be a string"),
        }),
        None => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("missing required field '{field}'"),
        }),
    }
}

fn optional_limit(tool: &str, args: &Map<String, Value>) -> Result<Option<u32>, ToolError> {
    match args.get("limit") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: tool.to_string(),
                reason: "'limit' must be a positive integer".to_string(),
            }),
    }
}

/// Errors from tool validation or execution.
///
/// These never abort a turn: the adapter renders them into the text of
/// the tool result so the model can react to the failure.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend error: {0}")]
    Backend(String),
}
