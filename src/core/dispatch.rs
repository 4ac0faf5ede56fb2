//! Detached, best-effort delivery of domain events.
//!
//! Every event is handed to its own task on a [`TaskTracker`] owned by the
//! dispatcher, not by the request that produced it. Dropping or timing out the
//! originating request leaves the task running; only [`EventDispatcher::shutdown`]
//! can cancel it. Each event gets exactly one publish attempt and its outcome
//! is logged, never returned.

use crate::domain::ports::EventPublisher;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span};

pub const TODO_CREATED_TOPIC: &str = "todo.created";

#[derive(Clone)]
pub struct EventDispatcher {
    publisher: Arc<dyn EventPublisher>,
    tracker: TaskTracker,
    /// Set once by `shutdown`; new events are dropped from then on.
    closing: CancellationToken,
    /// Cancels in-flight publishes once the grace period is over.
    abort: CancellationToken,
}

impl EventDispatcher {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            publisher,
            tracker: TaskTracker::new(),
            closing: CancellationToken::new(),
            abort: CancellationToken::new(),
        }
    }

    /// Schedules one publish attempt and returns immediately. Must be called
    /// from within a tokio runtime.
    pub fn dispatch<T: Serialize>(&self, topic: &'static str, subject: &str, event: &T, span: &Span) {
        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(parent: span, topic, subject, error = %e, "failed to encode event, dropping it");
                return;
            }
        };

        if self.closing.is_cancelled() {
            tracing::warn!(parent: span, topic, subject, "dispatcher is shut down, dropping event");
            return;
        }

        let publisher = Arc::clone(&self.publisher);
        let abort = self.abort.clone();
        let subject = subject.to_string();
        let task_span = span.clone();

        self.tracker.spawn(
            async move {
                tokio::select! {
                    biased;
                    _ = abort.cancelled() => {
                        tracing::warn!(topic, subject = %subject, "event publish cancelled by shutdown");
                    }
                    result = publisher.publish(topic, &payload) => match result {
                        Ok(()) => tracing::info!(topic, subject = %subject, "event published"),
                        Err(e) => tracing::error!(topic, subject = %subject, error = %e, "failed to publish event"),
                    },
                }
            }
            .instrument(task_span),
        );
    }

    /// Number of publish attempts still in flight.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until no publish attempt is in flight. Events dispatched while
    /// waiting are still spawned and are waited for as well.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
        // A shutdown that closed the tracker while we waited must keep it closed.
        if self.closing.is_cancelled() {
            self.tracker.close();
        }
    }

    /// Stops accepting events, gives in-flight ones `grace` to finish and
    /// cancels whatever is left.
    pub async fn shutdown(&self, grace: Duration) {
        self.closing.cancel();
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                pending = self.tracker.len(),
                "grace period elapsed, cancelling pending event publishes"
            );
            self.abort.cancel();
            self.tracker.wait().await;
        }
    }
}
