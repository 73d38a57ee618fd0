//! In-memory fakes shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use shopchat_types::chat::{ChatMessage, Conversation, HistoryEntry};
use shopchat_types::error::RepositoryError;
use shopchat_types::llm::{
    CompletionResponse, ContentBlock, LlmError, ModelMessage, StopReason, ToolDefinition, Usage,
};
use shopchat_types::tool::{ToolCall, ToolError};
use uuid::Uuid;

use crate::chat::repository::ConversationRepository;
use crate::llm::client::{ModelClient, TextStream};
use crate::tool::backend::ToolBackend;

#[derive(Default)]
struct State {
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<ChatMessage>,
    fail_message_writes: bool,
    fail_next_message_write: bool,
    fail_conversation_creates: bool,
}

/// A `ConversationRepository` backed by a mutex-guarded map, with switches
/// for injecting write failures.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_message_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_message_writes = fail;
    }

    /// Fail only the next message write.
    pub fn fail_message_writes_once(&self) {
        self.state.lock().unwrap().fail_next_message_write = true;
    }

    pub fn fail_conversation_creates(&self, fail: bool) {
        self.state.lock().unwrap().fail_conversation_creates = fail;
    }

    pub fn message_total(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    pub fn all_messages(&self) -> Vec<ChatMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn conversation_total(&self) -> usize {
        self.state.lock().unwrap().conversations.len()
    }

    pub fn conversation(&self, id: &Uuid) -> Option<Conversation> {
        self.state.lock().unwrap().conversations.get(id).cloned()
    }

    pub fn backdate(&self, id: &Uuid, by: Duration) {
        if let Some(conv) = self.state.lock().unwrap().conversations.get_mut(id) {
            conv.updated_at -= by;
        }
    }
}

impl ConversationRepository for MemoryRepository {
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_conversation_creates {
            return Err(RepositoryError::Query("injected create failure".to_string()));
        }
        state
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation.clone())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.state.lock().unwrap().conversations.get(id).cloned())
    }

    async fn list_conversations(
        &self,
        owner_id: i64,
        limit: u32,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut list: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        list.truncate(limit as usize);
        Ok(list)
    }

    async fn update_title(&self, id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let conv = state
            .conversations
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        conv.title = title.to_string();
        conv.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_conversation(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.messages.retain(|m| m.conversation_id != *id);
        state
            .conversations
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn create_message(&self, message: &ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_message_writes || std::mem::take(&mut state.fail_next_message_write) {
            return Err(RepositoryError::Query("injected write failure".to_string()));
        }
        let conv = state
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or_else(|| RepositoryError::Query("FOREIGN KEY constraint failed".to_string()))?;
        conv.updated_at = message.created_at.max(conv.updated_at);
        state.messages.push(message.clone());
        Ok(message.clone())
    }

    async fn get_history(&self, conversation_id: &Uuid) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .map(HistoryEntry::from)
            .collect())
    }

    async fn get_messages(&self, conversation_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .cloned()
            .collect())
    }

    async fn count_messages(&self, conversation_id: &Uuid) -> Result<u32, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .count() as u32)
    }

    async fn delete_messages(&self, conversation_id: &Uuid) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.messages.len();
        state.messages.retain(|m| m.conversation_id != *conversation_id);
        Ok((before - state.messages.len()) as u64)
    }

    async fn delete_inactive_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let stale: Vec<Uuid> = state
            .conversations
            .values()
            .filter(|c| c.updated_at < cutoff)
            .map(|c| c.id)
            .collect();
        for id in &stale {
            state.conversations.remove(id);
        }
        state.messages.retain(|m| !stale.contains(&m.conversation_id));
        Ok(stale.len() as u64)
    }

    async fn delete_orphan_messages(&self) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.messages.len();
        let State {
            conversations,
            messages,
            ..
        } = &mut *state;
        messages.retain(|m| conversations.contains_key(&m.conversation_id));
        Ok((before - messages.len()) as u64)
    }
}

fn response(content: Vec<ContentBlock>, stop_reason: StopReason) -> CompletionResponse {
    CompletionResponse {
        id: format!("msg_{}", Uuid::now_v7().simple()),
        content,
        model: "scripted-model".to_string(),
        stop_reason,
        usage: Usage::default(),
    }
}

/// A `ModelClient` that replays scripted turns and a fixed final stream,
/// recording every history it was shown.
#[derive(Default)]
pub struct ScriptedModel {
    turns: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    always_tool: Option<(String, Value)>,
    final_chunks: Vec<String>,
    stream_error: Option<String>,
    turn_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    turn_histories: Mutex<Vec<Vec<ModelMessage>>>,
    stream_histories: Mutex<Vec<Vec<ModelMessage>>>,
    stream_tools: Mutex<Vec<ToolDefinition>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_text(self, text: &str) -> Self {
        let resp = response(
            vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            StopReason::EndTurn,
        );
        self.turns.lock().unwrap().push_back(Ok(resp));
        self
    }

    /// Queue a turn requesting the given `(id, name, input)` tool uses.
    pub fn then_tools(self, uses: &[(&str, &str, Value)]) -> Self {
        let content = uses
            .iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: input.clone(),
            })
            .collect();
        self.turns
            .lock()
            .unwrap()
            .push_back(Ok(response(content, StopReason::ToolUse)));
        self
    }

    pub fn then_error(self, err: LlmError) -> Self {
        self.turns.lock().unwrap().push_back(Err(err));
        self
    }

    /// Once the queue is empty, request this tool forever.
    pub fn always_tool(mut self, name: &str, input: Value) -> Self {
        self.always_tool = Some((name.to_string(), input));
        self
    }

    pub fn final_chunks(mut self, chunks: &[&str]) -> Self {
        self.final_chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// End the final stream with an error after its chunks.
    pub fn stream_fails_with(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_string());
        self
    }

    pub fn turn_calls(&self) -> usize {
        self.turn_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn turn_histories(&self) -> Vec<Vec<ModelMessage>> {
        self.turn_histories.lock().unwrap().clone()
    }

    pub fn stream_histories(&self) -> Vec<Vec<ModelMessage>> {
        self.stream_histories.lock().unwrap().clone()
    }

    /// Tools declared on the most recent final stream.
    pub fn stream_tools(&self) -> Vec<ToolDefinition> {
        self.stream_tools.lock().unwrap().clone()
    }
}

impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn request_turn(
        &self,
        history: &[ModelMessage],
        _tools: &[ToolDefinition],
    ) -> Result<CompletionResponse, LlmError> {
        let call = self.turn_calls.fetch_add(1, Ordering::SeqCst);
        self.turn_histories.lock().unwrap().push(history.to_vec());

        if let Some(next) = self.turns.lock().unwrap().pop_front() {
            return next;
        }
        match &self.always_tool {
            Some((name, input)) => Ok(response(
                vec![ContentBlock::ToolUse {
                    id: format!("toolu_{call}"),
                    name: name.clone(),
                    input: input.clone(),
                }],
                StopReason::ToolUse,
            )),
            None => Ok(response(
                vec![ContentBlock::Text {
                    text: "done".to_string(),
                }],
                StopReason::EndTurn,
            )),
        }
    }

    fn request_stream(&self, history: &[ModelMessage], tools: &[ToolDefinition]) -> TextStream {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.stream_histories.lock().unwrap().push(history.to_vec());
        *self.stream_tools.lock().unwrap() = tools.to_vec();

        let chunks = self.final_chunks.clone();
        let failure = self.stream_error.clone();
        Box::pin(async_stream::stream! {
            for chunk in chunks {
                yield Ok(chunk);
            }
            if let Some(message) = failure {
                yield Err(LlmError::Stream(message));
            }
        })
    }
}

/// A `ToolBackend` answering every call with the same text or error.
pub struct StubTools {
    reply: Result<String, String>,
    calls: Mutex<Vec<ToolCall>>,
}

impl StubTools {
    pub fn answering(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolBackend for StubTools {
    async fn call(&self, call: &ToolCall) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(call.clone());
        self.reply.clone().map_err(ToolError::Backend)
    }
}
