//! Product-search tool port.
//!
//! - `ToolBackend`: RPITIT trait for the remote tool server
//! - `BoxToolBackend`: object-safe wrapper for dynamic dispatch
//! - `ToolAdapter`: the never-failing invoke surface used by a turn
//! - `catalog`: the declared tool set offered to the model

pub mod adapter;
pub mod backend;
pub mod catalog;

pub use adapter::{ToolAdapter, ToolOutput};
pub use backend::{BoxToolBackend, ToolBackend};
