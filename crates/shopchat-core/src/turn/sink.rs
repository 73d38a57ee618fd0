//! Outbound UI event sinks.

use std::future::Future;

use shopchat_types::ui::UiEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// The receiving side of a sink is gone, usually because the client
/// disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("UI connection closed")]
pub struct SinkClosed;

/// Destination for the UI events of one connection.
///
/// Sends are fire-and-forget: nothing is acknowledged, and events must be
/// delivered in the order `send` is called. Cloned handles feed the same
/// destination, so a background task can share it with the turn.
pub trait UiSink: Clone + Send + Sync + 'static {
    fn send(&self, event: UiEvent) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

/// A [`UiSink`] backed by an unbounded mpsc channel.
///
/// A single writer task drains the receiver into the transport, which
/// keeps events in issue order.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiver it feeds.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl UiSink for ChannelSink {
    async fn send(&self, event: UiEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).map_err(|_| SinkClosed)
    }
}
