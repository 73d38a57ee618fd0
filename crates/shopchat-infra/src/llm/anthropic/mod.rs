//! Anthropic Claude model client.
//!
//! [`AnthropicClient`] implements
//! [`ModelClient`](shopchat_core::llm::client::ModelClient) for the
//! Anthropic Messages API, including SSE streaming of the final answer.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::AnthropicClient;
