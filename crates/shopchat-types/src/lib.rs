//! Shared domain types for Shopchat.
//!
//! This crate contains the domain types used across the workspace:
//! conversations and messages, model content blocks, the declared tool
//! catalog's argument shapes, outbound UI events, configuration, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod tool;
pub mod ui;
