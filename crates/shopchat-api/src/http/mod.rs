//! HTTP layer for Shopchat.
//!
//! REST endpoints for conversation management under `/api/`, the chat
//! WebSocket under `/ws/chat/`, and an envelope response format.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
