//! Model API client implementations.

pub mod anthropic;
