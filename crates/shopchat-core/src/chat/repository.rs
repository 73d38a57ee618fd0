//! ConversationRepository trait definition.
//!
//! Provides CRUD operations for conversations and their append-only
//! message logs. Uses native async fn in traits (RPITIT, Rust 2024 edition).

use chrono::{DateTime, Utc};
use shopchat_types::chat::{ChatMessage, Conversation, HistoryEntry};
use shopchat_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for conversation and message persistence.
///
/// Implementations live in shopchat-infra (e.g., `SqliteConversationRepository`).
/// This is the only path to durable storage; no other component issues
/// storage queries.
pub trait ConversationRepository: Send + Sync {
    /// Insert a new conversation.
    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    /// Get a conversation by its unique ID.
    fn get_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// List an owner's conversations, most recently active first.
    fn list_conversations(
        &self,
        owner_id: i64,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    /// Set the title and touch `updated_at`.
    fn update_title(
        &self,
        id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a conversation and all of its messages.
    fn delete_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a message and touch the parent conversation in one logical step.
    fn create_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// Ordered `{role, content}` pairs for a conversation.
    fn get_history(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryEntry>, RepositoryError>> + Send;

    /// Full messages for a conversation, in creation order.
    fn get_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Number of messages in a conversation.
    fn count_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;

    /// Delete every message of a conversation, keeping the conversation.
    fn delete_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Delete conversations whose last activity is before `cutoff`.
    ///
    /// Returns the number of conversations removed.
    fn delete_inactive_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Delete messages whose conversation no longer exists.
    fn delete_orphan_messages(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
