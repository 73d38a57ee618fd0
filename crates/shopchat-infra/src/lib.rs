//! Infrastructure layer for Shopchat.
//!
//! Contains implementations of the ports defined in `shopchat-core`: the
//! SQLite conversation store, the Anthropic model client and the MCP
//! product-search tool backend, plus configuration and system prompt loading.

pub mod config;
pub mod llm;
pub mod prompt;
pub mod sqlite;
pub mod tool;
