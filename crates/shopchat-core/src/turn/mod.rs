//! One user turn: from an inbound utterance to a durable assistant answer.
//!
//! - `sink`: where UI events go (`UiSink`, `ChannelSink`)
//! - `progress`: the cancellable "preparing response" animation task
//! - `feedback`: indicator texts shown during tool rounds
//! - `orchestrator`: the turn state machine

pub mod feedback;
pub mod orchestrator;
pub mod progress;
pub mod sink;

pub use orchestrator::{TurnContext, TurnOrchestrator, TurnOutcome};
pub use progress::{ProgressEmitter, ProgressHandle};
pub use sink::{ChannelSink, SinkClosed, UiSink};
