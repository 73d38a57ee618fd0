//! Progress emitter: the animated "preparing response" indicator shown
//! while the final answer stream has not produced anything yet.
//!
//! The emitter and the turn share exactly one piece of state, a
//! [`CancellationToken`]. The emitter treats a failed send the same as a
//! cancellation and stops quietly, because the connection may already be
//! closing.

use std::time::Duration;

use shopchat_types::ui::{Fragment, UiEvent};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::feedback::preparing_frame;
use super::sink::UiSink;

/// Starts progress tasks. See [`ProgressEmitter::start`].
pub struct ProgressEmitter;

impl ProgressEmitter {
    /// Spawn an emitter that replaces `target` with an indicator named
    /// `indicator_id`: first after `warmup`, then every `interval`, until
    /// the returned handle is cancelled or a send fails.
    pub fn start<S: UiSink>(
        sink: S,
        target: String,
        indicator_id: String,
        warmup: Duration,
        interval: Duration,
    ) -> ProgressHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(
            sink,
            token.clone(),
            target,
            indicator_id,
            warmup,
            interval,
        ));
        ProgressHandle {
            token,
            task: Some(task),
        }
    }
}

/// Handle to a running progress task.
///
/// Dropping the handle cancels the task.
pub struct ProgressHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProgressHandle {
    /// Signal the task to stop. Safe to call any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the task to exit.
    ///
    /// Once this returns the task can no longer emit. Calling it again is a
    /// no-op.
    pub async fn cancel_and_wait(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "Progress task ended abnormally");
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the task has exited (cancelled, or stopped on a failed send).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run<S: UiSink>(
    sink: S,
    token: CancellationToken,
    target: String,
    indicator_id: String,
    warmup: Duration,
    interval: Duration,
) {
    tokio::select! {
        biased;
        _ = token.cancelled() => return,
        _ = tokio::time::sleep(warmup) => {}
    }

    let mut frame: usize = 1;
    loop {
        if token.is_cancelled() {
            return;
        }

        let event = UiEvent::Replace {
            target: target.clone(),
            fragment: Fragment::Indicator {
                id: indicator_id.clone(),
                text: preparing_frame(frame),
            },
        };
        if sink.send(event).await.is_err() {
            debug!(target = %target, "Progress sink closed, stopping");
            return;
        }
        frame += 1;

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
