//! Turn orchestration and port definitions for Shopchat.
//!
//! This crate defines the "ports" (repository, model client, tool backend,
//! UI sink) that the infrastructure layer implements, plus the logic that
//! drives one chat turn across them. It depends only on `shopchat-types`
//! -- never on `shopchat-infra` or any database/IO crate.

pub mod chat;
pub mod llm;
pub mod render;
pub mod tool;
pub mod turn;

#[cfg(test)]
mod testing;
