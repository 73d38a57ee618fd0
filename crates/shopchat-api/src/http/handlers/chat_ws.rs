//! WebSocket chat endpoint.
//!
//! `GET /ws/chat/{conversation_id}` upgrades to a WebSocket bound to one
//! conversation. Each inbound text frame is one utterance, either JSON
//! `{"message": "..."}` or plain text. Outbound frames are JSON-encoded
//! [`UiEvent`]s.
//!
//! Turns on one connection run one after another. Events go through a
//! [`ChannelSink`] drained by a single writer task, so they reach the
//! socket in the order the turn issued them. Closing the socket does not
//! abort a running turn: its storage writes still complete.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};

use shopchat_core::turn::{ChannelSink, TurnContext, TurnOutcome};
use shopchat_types::error::ChatError;
use shopchat_types::ui::UiEvent;

use crate::http::error::AppError;
use crate::http::extractors::OwnerId;
use crate::http::handlers::conversations::parse_uuid;
use crate::state::{AppState, TurnGuard};

/// Interval between keep-alive pings on an idle socket.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// JSON form of an inbound utterance.
#[derive(Debug, Deserialize)]
struct InboundMessage {
    message: String,
}

/// Upgrade to a chat WebSocket for `conversation_id`.
///
/// A conversation owned by someone else is refused before the upgrade. A
/// missing one is accepted: the first turn starts a replacement.
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let conversation_id = parse_uuid(&id)?;

    match state
        .chat_service
        .conversation_for(owner_id, &conversation_id)
        .await
    {
        Ok(_) | Err(ChatError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let ctx = TurnContext {
        owner_id,
        conversation_id,
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, ctx)))
}

async fn handle_socket(socket: WebSocket, state: AppState, mut ctx: TurnContext) {
    tracing::info!(conversation_id = %ctx.conversation_id, owner_id = ctx.owner_id, "Chat connection opened");

    let (ws_sender, ws_receiver) = socket.split();
    let (sink, rx) = ChannelSink::channel();
    let writer = tokio::spawn(write_events(ws_sender, rx));

    run_turns(&state, &mut ctx, ws_receiver, &sink).await;

    // The writer ends once every sink handle is gone and the queue is drained.
    drop(sink);
    if let Err(e) = writer.await {
        tracing::warn!(error = %e, "Chat writer task failed");
    }

    tracing::info!(conversation_id = %ctx.conversation_id, "Chat connection closed");
}

/// Read utterances until the client goes away, running one turn per
/// utterance.
pub(crate) async fn run_turns<I>(
    state: &AppState,
    ctx: &mut TurnContext,
    mut inbound: I,
    sink: &ChannelSink,
) where
    I: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = inbound.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => parse_inbound(text.as_str()),
            Ok(Message::Close(_)) => break,
            Err(err) => {
                tracing::debug!("WebSocket receive error: {err}");
                break;
            }
            // Binary, ping and pong frames carry no utterance.
            Ok(_) => continue,
        };

        let (guard, already_running) = TurnGuard::enter(&state.active_turns, ctx.conversation_id);
        if already_running > 0 {
            tracing::warn!(
                conversation_id = %ctx.conversation_id,
                already_running,
                "Another connection is running a turn on this conversation"
            );
        }

        let outcome = state.orchestrator.handle_turn(ctx, &text, sink).await;
        drop(guard);

        match outcome {
            TurnOutcome::Completed {
                conversation_id,
                rounds,
                exhausted,
                ..
            } => tracing::debug!(%conversation_id, rounds, exhausted, "Turn finished"),
            TurnOutcome::Rejected(reason) => tracing::debug!(%reason, "Turn rejected"),
            TurnOutcome::Failed(reason) => tracing::debug!(%reason, "Turn failed"),
        }
    }
}

/// Extract the utterance from a text frame.
fn parse_inbound(raw: &str) -> String {
    match serde_json::from_str::<InboundMessage>(raw) {
        Ok(inbound) => inbound.message,
        Err(_) => raw.to_string(),
    }
}

/// Forward queued UI events to the socket in order, pinging while idle.
///
/// Returns when the queue is closed and drained, or when the socket
/// refuses a write.
pub(crate) async fn write_events<W>(mut ws: W, mut rx: mpsc::UnboundedReceiver<UiEvent>)
where
    W: Sink<Message> + Unpin,
{
    let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!("Failed to serialize UiEvent: {err}");
                        continue;
                    }
                };
                if ws.send(Message::Text(json.into())).await.is_err() {
                    // Client disconnected
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if ws.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = ws.close().await;
}
