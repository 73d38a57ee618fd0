//! SQLite storage layer.
//!
//! The conversation repository backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod conversation;
pub mod pool;

pub use conversation::SqliteConversationRepository;
pub use pool::DatabasePool;
