//! Outbound UI events for an interactive chat connection.
//!
//! Each event names a target region by a deterministic id and carries a
//! typed fragment. How a fragment is drawn is up to the client; the server
//! only decides what goes where, and in which order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single update to the client's view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "swap", rename_all = "snake_case")]
pub enum UiEvent {
    /// Replace the inner content of `target`.
    Replace { target: String, fragment: Fragment },
    /// Append to the content of `target`.
    Append { target: String, fragment: Fragment },
    /// Refresh a region other than the primary render target.
    OutOfBand { target: String, fragment: Fragment },
}

impl UiEvent {
    pub fn target(&self) -> &str {
        match self {
            UiEvent::Replace { target, .. }
            | UiEvent::Append { target, .. }
            | UiEvent::OutOfBand { target, .. } => target,
        }
    }

    pub fn fragment(&self) -> &Fragment {
        match self {
            UiEvent::Replace { fragment, .. }
            | UiEvent::Append { fragment, .. }
            | UiEvent::OutOfBand { fragment, .. } => fragment,
        }
    }
}

/// The content carried by a [`UiEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    /// A user message bubble.
    UserBubble { id: String, ordinal: u32, text: String },
    /// An empty assistant bubble with its content slot.
    AssistantBubble { id: String, ordinal: u32, content_id: String },
    /// Reset the message input control.
    InputReset,
    /// A transient "working" indicator.
    Indicator { id: String, text: String },
    /// A raw chunk of streamed answer text.
    Text { text: String },
    /// The fully rendered answer.
    Rendered { id: String, html: String },
    /// A conversation's entry in the sidebar list.
    ConversationItem { conversation_id: Uuid, title: String },
    /// A human-readable failure description.
    Error { message: String },
}

/// Region id builders.
///
/// Per-turn regions are addressed by `(conversation_id, ordinal)` so they
/// stay stable across reconnects.
pub struct UiTarget;

impl UiTarget {
    pub const MESSAGES: &'static str = "messages";
    pub const MESSAGE_INPUT: &'static str = "message-input";

    pub fn message(conversation_id: Uuid, ordinal: u32) -> String {
        format!("message-{conversation_id}-{ordinal}")
    }

    pub fn content(conversation_id: Uuid, ordinal: u32) -> String {
        format!("content-{conversation_id}-{ordinal}")
    }

    pub fn feedback(conversation_id: Uuid, ordinal: u32) -> String {
        format!("feedback-{conversation_id}-{ordinal}")
    }

    pub fn conversation(conversation_id: Uuid) -> String {
        format!("conversation-{conversation_id}")
    }
}
