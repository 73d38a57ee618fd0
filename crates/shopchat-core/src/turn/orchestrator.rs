//! Turn orchestrator.
//!
//! Drives one user utterance through validation, persistence, the bounded
//! tool-calling loop, the streamed final answer, rendering and the final
//! write. Every failure after the user message is durable ends in exactly
//! one terminal UI error event.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use shopchat_types::chat::{ChatMessage, MessageRole};
use shopchat_types::config::TurnSettings;
use shopchat_types::error::{ChatError, TurnError};
use shopchat_types::llm::{ContentBlock, ModelMessage, ToolDefinition};
use shopchat_types::tool::purpose_of;
use shopchat_types::ui::{Fragment, UiEvent, UiTarget};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chat::repository::ConversationRepository;
use crate::chat::service::ChatService;
use crate::chat::title::{derive_title, validate_utterance};
use crate::llm::client::ModelClient;
use crate::render::render_markdown;
use crate::tool::adapter::ToolAdapter;
use crate::tool::backend::ToolBackend;
use crate::tool::catalog::catalog;

use super::feedback::{round_indicator, tool_indicator, PREPARING_RESPONSE};
use super::progress::{ProgressEmitter, ProgressHandle};
use super::sink::UiSink;

/// Converts the accumulated answer markup into display HTML.
pub type MarkdownRenderer = fn(&str) -> String;

/// Safety ceiling on tool-calling rounds per turn.
pub const MAX_TOOL_ROUNDS: u32 = 10;

/// Shown when the user message cannot be stored, even after recovery.
const PERSIST_FAILED: &str = "Error saving message. Please refresh the page.";

/// The identity and active conversation of one connection.
///
/// `conversation_id` is rewritten when a turn has to move to a fresh
/// conversation, so later turns on the same connection follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    pub owner_id: i64,
    pub conversation_id: Uuid,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed {
        conversation_id: Uuid,
        user_ordinal: u32,
        assistant_ordinal: u32,
        rounds: u32,
        exhausted: bool,
    },
    /// Refused before anything was written.
    Rejected(String),
    /// Ended by an error; the user message may already be durable.
    Failed(String),
}

/// Ephemeral bookkeeping for one turn, dropped when the turn ends.
struct TurnState {
    conversation_id: Uuid,
    user_ordinal: u32,
    assistant_ordinal: u32,
    placeholder_open: bool,
    history: Vec<ModelMessage>,
    rounds: u32,
    exhausted: bool,
}

impl TurnState {
    fn content_target(&self) -> String {
        UiTarget::content(self.conversation_id, self.assistant_ordinal)
    }

    fn indicator_id(&self) -> String {
        UiTarget::feedback(self.conversation_id, self.assistant_ordinal)
    }
}

/// Runs chat turns against a conversation store, a model client and a
/// tool backend.
///
/// Holds no per-turn state, so a single instance can serve every
/// connection concurrently.
pub struct TurnOrchestrator<R, M, T>
where
    R: ConversationRepository,
    M: ModelClient,
    T: ToolBackend,
{
    chat: Arc<ChatService<R>>,
    model: M,
    tools: ToolAdapter<T>,
    catalog: Vec<ToolDefinition>,
    settings: TurnSettings,
    render: MarkdownRenderer,
}

impl<R, M, T> TurnOrchestrator<R, M, T>
where
    R: ConversationRepository,
    M: ModelClient,
    T: ToolBackend,
{
    pub fn new(
        chat: Arc<ChatService<R>>,
        model: M,
        tools: ToolAdapter<T>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            chat,
            model,
            tools,
            catalog: catalog(),
            settings,
            render: render_markdown,
        }
    }

    /// Replace the markdown renderer.
    pub fn with_renderer(mut self, render: MarkdownRenderer) -> Self {
        self.render = render;
        self
    }

    pub fn chat(&self) -> &Arc<ChatService<R>> {
        &self.chat
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn tools(&self) -> &ToolAdapter<T> {
        &self.tools
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    /// Handle one inbound utterance.
    ///
    /// UI events go to `sink` in the order they are produced. A closed sink
    /// does not stop the turn: storage writes still complete.
    #[tracing::instrument(
        name = "chat.turn",
        skip_all,
        fields(owner_id = ctx.owner_id, conversation_id = %ctx.conversation_id)
    )]
    pub async fn handle_turn<S: UiSink>(
        &self,
        ctx: &mut TurnContext,
        user_text: &str,
        sink: &S,
    ) -> TurnOutcome {
        let text = match self.admit(ctx, user_text).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Turn rejected");
                emit(sink, error_event(UiTarget::MESSAGES.to_string(), false, &e.to_string())).await;
                return TurnOutcome::Rejected(e.to_string());
            }
        };

        let user_message = match self.persist_user_message(ctx, text).await {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Could not persist user message");
                emit(sink, error_event(UiTarget::MESSAGES.to_string(), false, PERSIST_FAILED)).await;
                return TurnOutcome::Failed(e.to_string());
            }
        };

        let mut state = TurnState {
            conversation_id: ctx.conversation_id,
            user_ordinal: 0,
            assistant_ordinal: 0,
            placeholder_open: false,
            history: Vec::new(),
            rounds: 0,
            exhausted: false,
        };

        match self.run(&user_message, &mut state, sink).await {
            Ok(()) => TurnOutcome::Completed {
                conversation_id: state.conversation_id,
                user_ordinal: state.user_ordinal,
                assistant_ordinal: state.assistant_ordinal,
                rounds: state.rounds,
                exhausted: state.exhausted,
            },
            Err(e) => {
                error!(
                    error = %e,
                    conversation_id = %state.conversation_id,
                    rounds = state.rounds,
                    "Turn failed"
                );
                let target = if state.placeholder_open {
                    state.content_target()
                } else {
                    UiTarget::MESSAGES.to_string()
                };
                emit(
                    sink,
                    error_event(target, state.placeholder_open, &format!("Error: {e}")),
                )
                .await;
                TurnOutcome::Failed(e.to_string())
            }
        }
    }

    /// Validate the utterance and resolve the active conversation.
    ///
    /// A conversation that no longer exists is replaced with a fresh one
    /// owned by the requester; one owned by someone else is refused.
    async fn admit<'t>(&self, ctx: &mut TurnContext, user_text: &'t str) -> Result<&'t str, TurnError> {
        let text = validate_utterance(user_text, self.settings.max_message_length)?;

        match self.chat.conversation_for(ctx.owner_id, &ctx.conversation_id).await {
            Ok(_) => Ok(text),
            Err(ChatError::NotFound) => {
                let conversation = self.chat.start_conversation(ctx.owner_id).await?;
                info!(
                    stale = %ctx.conversation_id,
                    conversation_id = %conversation.id,
                    "Active conversation missing, started a new one"
                );
                ctx.conversation_id = conversation.id;
                Ok(text)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the user message, with one bounded recovery attempt against
    /// a fresh conversation.
    async fn persist_user_message(
        &self,
        ctx: &mut TurnContext,
        text: &str,
    ) -> Result<ChatMessage, TurnError> {
        match self.chat.append_user_message(ctx.conversation_id, text).await {
            Ok(message) => Ok(message),
            Err(e) if self.settings.recover_on_persist_failure => {
                warn!(error = %e, "User message write failed, retrying against a new conversation");
                let conversation = self.chat.start_conversation(ctx.owner_id).await?;
                let message = self.chat.append_user_message(conversation.id, text).await?;
                ctx.conversation_id = conversation.id;
                Ok(message)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn run<S: UiSink>(
        &self,
        user_message: &ChatMessage,
        state: &mut TurnState,
        sink: &S,
    ) -> Result<(), TurnError> {
        let conversation_id = state.conversation_id;

        // Ordinals come from a fresh count so they survive reloads and restarts.
        let count = self.chat.message_count(&conversation_id).await?;
        state.user_ordinal = count.saturating_sub(1);
        state.assistant_ordinal = count;

        if count == 1 {
            let title = derive_title(&user_message.content, self.settings.title_max_chars);
            self.chat.set_title(&conversation_id, &title).await?;
            emit(
                sink,
                UiEvent::OutOfBand {
                    target: UiTarget::conversation(conversation_id),
                    fragment: Fragment::ConversationItem {
                        conversation_id,
                        title,
                    },
                },
            )
            .await;
        }

        emit(
            sink,
            UiEvent::Append {
                target: UiTarget::MESSAGES.to_string(),
                fragment: Fragment::UserBubble {
                    id: UiTarget::message(conversation_id, state.user_ordinal),
                    ordinal: state.user_ordinal,
                    text: user_message.content.clone(),
                },
            },
        )
        .await;
        emit(
            sink,
            UiEvent::OutOfBand {
                target: UiTarget::MESSAGE_INPUT.to_string(),
                fragment: Fragment::InputReset,
            },
        )
        .await;

        state.history = self
            .chat
            .history(&conversation_id)
            .await?
            .iter()
            .map(ModelMessage::from)
            .collect();

        emit(
            sink,
            UiEvent::Append {
                target: UiTarget::MESSAGES.to_string(),
                fragment: Fragment::AssistantBubble {
                    id: UiTarget::message(conversation_id, state.assistant_ordinal),
                    ordinal: state.assistant_ordinal,
                    content_id: state.content_target(),
                },
            },
        )
        .await;
        state.placeholder_open = true;

        self.run_tool_rounds(state, sink).await?;

        let full_response = self.stream_final_answer(state, sink).await?;

        let html = (self.render)(&full_response);
        emit(
            sink,
            UiEvent::Replace {
                target: state.content_target(),
                fragment: Fragment::Rendered {
                    id: state.content_target(),
                    html,
                },
            },
        )
        .await;

        self.chat
            .append_assistant_message(conversation_id, &full_response)
            .await?;
        info!(
            conversation_id = %conversation_id,
            ordinal = state.assistant_ordinal,
            rounds = state.rounds,
            chars = full_response.chars().count(),
            "Turn completed"
        );
        Ok(())
    }

    /// Request model turns until one contains no tool use, or the round
    /// ceiling is reached.
    async fn run_tool_rounds<S: UiSink>(
        &self,
        state: &mut TurnState,
        sink: &S,
    ) -> Result<(), TurnError> {
        loop {
            if state.rounds >= MAX_TOOL_ROUNDS {
                state.exhausted = true;
                warn!(
                    rounds = state.rounds,
                    "Tool round ceiling reached, streaming final answer from current history"
                );
                return Ok(());
            }

            let response = self.model.request_turn(&state.history, &self.catalog).await?;
            if !response.has_tool_use() {
                info!(rounds = state.rounds, "Model finished tool calling");
                return Ok(());
            }

            state.rounds += 1;
            let round_text = round_indicator(state.rounds);
            info!(
                round = state.rounds,
                tools = response.tool_uses().count(),
                "Tool calling round"
            );
            self.show_indicator(state, sink, round_text.clone()).await;

            let mut results = Vec::new();
            for tool_use in response.tool_uses() {
                self.show_indicator(state, sink, tool_indicator(&round_text, purpose_of(tool_use.name)))
                    .await;
                debug!(tool = tool_use.name, input = %tool_use.input, "Calling tool");
                let output = self.tools.invoke(tool_use.name, tool_use.input).await;
                results.push(ContentBlock::ToolResult {
                    tool_use_id: tool_use.id.to_string(),
                    content: output.text,
                    is_error: output.is_error,
                });
            }

            state.history.push(ModelMessage {
                role: MessageRole::Assistant,
                content: response.content.clone(),
            });
            state.history.push(ModelMessage {
                role: MessageRole::User,
                content: results,
            });
        }
    }

    /// Stream the final answer into the placeholder and return its full text.
    ///
    /// The progress task is always stopped before this returns.
    async fn stream_final_answer<S: UiSink>(
        &self,
        state: &TurnState,
        sink: &S,
    ) -> Result<String, TurnError> {
        self.show_indicator(state, sink, PREPARING_RESPONSE.to_string()).await;

        let mut progress = ProgressEmitter::start(
            sink.clone(),
            state.content_target(),
            state.indicator_id(),
            Duration::from_millis(self.settings.progress_warmup_ms),
            Duration::from_millis(self.settings.progress_interval_ms),
        );
        let result = self
            .forward_stream(state, sink, &mut progress)
            .await;
        progress.cancel_and_wait().await;
        result
    }

    async fn forward_stream<S: UiSink>(
        &self,
        state: &TurnState,
        sink: &S,
        progress: &mut ProgressHandle,
    ) -> Result<String, TurnError> {
        let target = state.content_target();
        let mut stream = self.model.request_stream(&state.history, &self.catalog);
        let mut full_response = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }

            let fragment = Fragment::Text {
                text: chunk.clone(),
            };
            let event = if full_response.is_empty() {
                progress.cancel_and_wait().await;
                UiEvent::Replace {
                    target: target.clone(),
                    fragment,
                }
            } else {
                UiEvent::Append {
                    target: target.clone(),
                    fragment,
                }
            };
            emit(sink, event).await;
            full_response.push_str(&chunk);
        }

        Ok(full_response)
    }

    async fn show_indicator<S: UiSink>(&self, state: &TurnState, sink: &S, text: String) {
        emit(
            sink,
            UiEvent::Replace {
                target: state.content_target(),
                fragment: Fragment::Indicator {
                    id: state.indicator_id(),
                    text,
                },
            },
        )
        .await;
    }
}

/// Fire-and-forget send. A closed sink is logged and otherwise ignored.
async fn emit<S: UiSink>(sink: &S, event: UiEvent) {
    if sink.send(event).await.is_err() {
        debug!("UI sink closed, dropping event");
    }
}

fn error_event(target: String, replace: bool, message: &str) -> UiEvent {
    let fragment = Fragment::Error {
        message: message.to_string(),
    };
    if replace {
        UiEvent::Replace { target, fragment }
    } else {
        UiEvent::Append { target, fragment }
    }
}
