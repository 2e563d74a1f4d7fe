//! # Session Events
//!
//! Push-based, best-effort notifications about session changes. Consumers
//! must tolerate missed or duplicated events and treat
//! [`SessionStore::get_session_summary`](super::SessionStore::get_session_summary)
//! as the source of truth.

use crate::types::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};
use uuid::Uuid;

/// Kind of session event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    SessionCreated,
    AgentStatusUpdated,
    PhaseUpdated,
    SessionCompleted,
}

/// An event emitted by the session store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: SessionEventKind,
    pub session_id: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, session_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            session_id: session_id.to_string(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Callback registered for one event kind.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &SessionEvent) -> Result<()>;
}

/// Adapter turning a plain closure into an [`EventHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&SessionEvent) -> Result<()> + Send + Sync,
{
    async fn handle(&self, event: &SessionEvent) -> Result<()> {
        (self.0)(event)
    }
}

/// Handler registry plus a broadcast channel for live subscribers.
pub struct EventBus {
    handlers: RwLock<HashMap<SessionEventKind, Vec<Arc<dyn EventHandler>>>>,
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            handlers: RwLock::new(HashMap::new()),
            sender,
        }
    }

    pub fn on_event(&self, kind: SessionEventKind, handler: Arc<dyn EventHandler>) {
        self.handlers.write().entry(kind).or_default().push(handler);
    }

    /// Live stream of every event. Slow receivers observe `Lagged` and skip ahead.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Deliver an event to every handler registered for its kind, in
    /// registration order. Handler errors and panics are logged and swallowed.
    pub async fn emit(&self, event: SessionEvent) {
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();

        for handler in handlers {
            match AssertUnwindSafe(handler.handle(&event)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(kind = ?event.kind, session_id = %event.session_id, error = %e, "Event handler failed");
                }
                Err(_) => {
                    error!(kind = ?event.kind, session_id = %event.session_id, "Event handler panicked");
                }
            }
        }

        if self.sender.send(event).is_err() {
            debug!("No live event subscribers");
        }
    }
}
