//! Chat service coordinating conversation lifecycle and message persistence.
//!
//! ChatService wraps a `ConversationRepository` with ownership checks,
//! input validation, and the maintenance sweeps. The turn orchestrator,
//! the REST handlers, and the CLI all go through it.

use chrono::{Duration, Utc};
use shopchat_types::chat::{ChatMessage, Conversation, HistoryEntry, MessageRole, DEFAULT_TITLE};
use shopchat_types::error::{ChatError, RepositoryError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::repository::ConversationRepository;

/// Longest title accepted by an explicit rename.
const MAX_RENAME_CHARS: usize = 200;

/// Orchestrates conversation lifecycle and message persistence.
///
/// Generic over `ConversationRepository` to maintain clean architecture
/// (shopchat-core never depends on shopchat-infra).
pub struct ChatService<R: ConversationRepository> {
    repo: R,
}

impl<R: ConversationRepository> ChatService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // --- Conversation lifecycle ---

    /// Create an empty "New Chat" conversation for `owner_id`.
    pub async fn start_conversation(&self, owner_id: i64) -> Result<Conversation, RepositoryError> {
        let conversation = Conversation::new(owner_id, DEFAULT_TITLE);
        let created = self.repo.create_conversation(&conversation).await?;
        info!(conversation_id = %created.id, owner_id, "Conversation created");
        Ok(created)
    }

    /// Resolve a conversation and check that `owner_id` may use it.
    pub async fn conversation_for(
        &self,
        owner_id: i64,
        conversation_id: &Uuid,
    ) -> Result<Conversation, ChatError> {
        let conversation = self
            .repo
            .get_conversation(conversation_id)
            .await?
            .ok_or(ChatError::NotFound)?;
        if !conversation.belongs_to(owner_id) {
            warn!(conversation_id = %conversation_id, owner_id, "Conversation access denied");
            return Err(ChatError::AccessDenied);
        }
        Ok(conversation)
    }

    /// List an owner's conversations, most recent first.
    pub async fn list_for(
        &self,
        owner_id: i64,
        limit: u32,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        self.repo.list_conversations(owner_id, limit).await
    }

    /// Rename a conversation owned by `owner_id`.
    pub async fn rename(
        &self,
        owner_id: i64,
        conversation_id: &Uuid,
        title: &str,
    ) -> Result<Conversation, ChatError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::Validation("Title must not be empty.".to_string()));
        }
        if title.chars().count() > MAX_RENAME_CHARS {
            return Err(ChatError::Validation(format!(
                "Title too long (max {MAX_RENAME_CHARS} characters)."
            )));
        }

        let mut conversation = self.conversation_for(owner_id, conversation_id).await?;
        self.repo.update_title(conversation_id, title).await?;
        conversation.title = title.to_string();
        info!(conversation_id = %conversation_id, "Conversation renamed");
        Ok(conversation)
    }

    /// Set an auto-derived title. Used once per conversation, on its first message.
    pub async fn set_title(&self, conversation_id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        self.repo.update_title(conversation_id, title).await
    }

    /// Delete a conversation owned by `owner_id` together with its messages.
    pub async fn delete_for(&self, owner_id: i64, conversation_id: &Uuid) -> Result<(), ChatError> {
        self.conversation_for(owner_id, conversation_id).await?;
        self.repo.delete_conversation(conversation_id).await?;
        info!(conversation_id = %conversation_id, "Conversation deleted");
        Ok(())
    }

    // --- Message persistence ---

    pub async fn append_user_message(
        &self,
        conversation_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let message = ChatMessage::new(conversation_id, MessageRole::User, content);
        self.repo.create_message(&message).await
    }

    pub async fn append_assistant_message(
        &self,
        conversation_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let message = ChatMessage::new(conversation_id, MessageRole::Assistant, content);
        self.repo.create_message(&message).await
    }

    /// The canonical ordered history, read fresh from storage.
    pub async fn history(&self, conversation_id: &Uuid) -> Result<Vec<HistoryEntry>, RepositoryError> {
        self.repo.get_history(conversation_id).await
    }

    pub async fn messages(&self, conversation_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.repo.get_messages(conversation_id).await
    }

    pub async fn message_count(&self, conversation_id: &Uuid) -> Result<u32, RepositoryError> {
        self.repo.count_messages(conversation_id).await
    }

    // --- Maintenance ---

    /// Remove conversations with no activity in the last `retention_days` days.
    pub async fn sweep(&self, retention_days: u32) -> Result<u64, RepositoryError> {
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let removed = self.repo.delete_inactive_before(cutoff).await?;
        if removed > 0 {
            info!(removed, retention_days, "Retention sweep removed inactive conversations");
        }
        Ok(removed)
    }

    /// Remove messages left behind by a conversation that no longer exists.
    pub async fn cleanup_orphans(&self) -> Result<u64, RepositoryError> {
        let removed = self.repo.delete_orphan_messages().await?;
        if removed > 0 {
            warn!(removed, "Removed orphaned messages");
        }
        Ok(removed)
    }
}
