//! HTTP request handlers.

pub mod chat_ws;
pub mod conversations;
pub mod health;
