//! Tool backend implementations.

pub mod mcp;

pub use mcp::McpToolBackend;
