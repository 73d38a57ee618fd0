//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and the
//! web server. Services are generic over their ports; AppState pins them
//! to the SQLite store and the type-erased model client and tool backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use dashmap::DashMap;
use uuid::Uuid;

use shopchat_core::chat::service::ChatService;
use shopchat_core::llm::box_client::BoxModelClient;
use shopchat_core::tool::{BoxToolBackend, ToolAdapter};
use shopchat_core::turn::TurnOrchestrator;
use shopchat_infra::config::api_key_from_env;
use shopchat_infra::llm::anthropic::AnthropicClient;
use shopchat_infra::prompt::load_system_prompt;
use shopchat_infra::sqlite::pool::database_url;
use shopchat_infra::sqlite::{DatabasePool, SqliteConversationRepository};
use shopchat_infra::tool::McpToolBackend;
use shopchat_types::config::AppConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteChatService = ChatService<SqliteConversationRepository>;

pub type ConcreteOrchestrator =
    TurnOrchestrator<SqliteConversationRepository, BoxModelClient, BoxToolBackend>;

/// Shared application state.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
    /// Turns currently running, per conversation.
    pub active_turns: Arc<DashMap<Uuid, usize>>,
}

impl AppState {
    /// Initialize the full serving state: store, model client, tool backend.
    ///
    /// Fails if the API key is missing or the database cannot be opened.
    /// An unreachable tool server is only logged.
    pub async fn init(data_dir: PathBuf, config: AppConfig) -> anyhow::Result<Self> {
        let api_key = api_key_from_env()?;
        let db_pool = open_database(&data_dir).await?;

        let system_prompt = load_system_prompt(&data_dir).await;
        let model = AnthropicClient::new(
            api_key,
            config.model.clone(),
            config.max_tokens,
            system_prompt,
        )?;

        let tools = McpToolBackend::new(&config.mcp_server_url)?;
        match tools.health_check().await {
            Ok(()) => tracing::info!(url = %config.mcp_server_url, "MCP server reachable"),
            Err(e) => tracing::warn!(error = %e, "MCP server check failed; tool calls will report errors"),
        }

        Ok(Self::from_parts(
            db_pool,
            config,
            data_dir,
            BoxModelClient::new(model),
            BoxToolBackend::new(tools),
        ))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        db_pool: DatabasePool,
        config: AppConfig,
        data_dir: PathBuf,
        model: BoxModelClient,
        tools: BoxToolBackend,
    ) -> Self {
        let chat_service = Arc::new(ChatService::new(SqliteConversationRepository::new(
            db_pool.clone(),
        )));
        let orchestrator = TurnOrchestrator::new(
            chat_service.clone(),
            model,
            ToolAdapter::new(tools),
            config.turn.clone(),
        );

        Self {
            chat_service,
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            data_dir,
            db_pool,
            active_turns: Arc::new(DashMap::new()),
        }
    }

    /// Number of turns running across all connections.
    pub fn running_turns(&self) -> usize {
        self.active_turns.iter().map(|entry| *entry.value()).sum()
    }
}

/// Open the conversation store without the model or tool backend.
///
/// Used by CLI commands that only touch stored conversations.
pub async fn open_chat_service(data_dir: &Path) -> anyhow::Result<(DatabasePool, ConcreteChatService)> {
    let db_pool = open_database(data_dir).await?;
    let service = ChatService::new(SqliteConversationRepository::new(db_pool.clone()));
    Ok((db_pool, service))
}

async fn open_database(data_dir: &Path) -> anyhow::Result<DatabasePool> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;
    let url = database_url(data_dir);
    DatabasePool::new(&url)
        .await
        .with_context(|| format!("cannot open database at {url}"))
}

/// Marks a turn as running for its conversation until dropped.
pub struct TurnGuard {
    turns: Arc<DashMap<Uuid, usize>>,
    conversation_id: Uuid,
}

impl TurnGuard {
    /// Register a turn. Returns the guard and how many other turns were
    /// already running on the same conversation.
    pub fn enter(turns: &Arc<DashMap<Uuid, usize>>, conversation_id: Uuid) -> (Self, usize) {
        let already = {
            let mut count = turns.entry(conversation_id).or_insert(0);
            let before = *count;
            *count += 1;
            before
        };
        (
            Self {
                turns: turns.clone(),
                conversation_id,
            },
            already,
        )
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.turns
            .remove_if_mut(&self.conversation_id, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            });
    }
}
