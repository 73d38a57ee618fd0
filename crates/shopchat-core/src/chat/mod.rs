//! Conversation persistence abstractions and the service built on them.
//!
//! `ConversationRepository` is implemented by the infrastructure layer;
//! `ChatService` adds ownership checks and validation on top of it.

pub mod repository;
pub mod service;
pub mod title;
