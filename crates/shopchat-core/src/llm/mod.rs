//! Model client abstractions for Shopchat.
//!
//! - `ModelClient`: RPITIT trait for concrete model API clients
//! - `BoxModelClient`: object-safe wrapper for dynamic dispatch

pub mod box_client;
pub mod client;
