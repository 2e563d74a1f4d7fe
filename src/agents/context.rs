//! Per-invocation agent context.
//!
//! A context is built for one (session, role) pair and handed to the agent
//! call, so agent instances stay stateless and can serve concurrent sessions.

use crate::memory::SharedMemory;
use crate::state::{AgentState, AgentStatusUpdate, SessionStore};
use crate::types::{AgentMessage, AgentRole, AgentStatus, Result};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default wait bound for [`AgentContext::receive_message`].
pub const DEFAULT_MAILBOX_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AgentContext {
    session_id: String,
    role: AgentRole,
    store: Arc<SessionStore>,
    memory: Arc<SharedMemory>,
    mailbox_timeout: Duration,
    results: Arc<AtomicU32>,
}

impl AgentContext {
    pub fn new(
        session_id: impl Into<String>,
        role: AgentRole,
        store: Arc<SessionStore>,
        memory: Arc<SharedMemory>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            store,
            memory,
            mailbox_timeout: DEFAULT_MAILBOX_TIMEOUT,
            results: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_mailbox_timeout(mut self, timeout: Duration) -> Self {
        self.mailbox_timeout = timeout;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    /// Number of results this invocation has produced so far.
    pub fn results_count(&self) -> u32 {
        self.results.load(Ordering::Relaxed)
    }

    pub fn add_results(&self, count: u32) {
        self.results.fetch_add(count, Ordering::Relaxed);
    }

    // ============= Status =============

    pub async fn update_status(&self, update: AgentStatusUpdate) -> Result<AgentState> {
        self.store
            .update_agent_status(&self.session_id, self.role, update)
            .await
    }

    /// Report progress while running.
    pub async fn progress(&self, task: &str, percent: f32) -> Result<()> {
        self.update_status(
            AgentStatusUpdate::new(AgentStatus::Running)
                .task(task)
                .progress(percent)
                .results(self.results_count()),
        )
        .await
        .map(|_| ())
    }

    pub fn increment_sources(&self, count: u64) -> Result<u64> {
        self.store.increment_sources(&self.session_id, count)
    }

    // ============= Memory =============

    /// Record a discovery attributed to this agent; counts as one result.
    pub fn add_discovery(&self, discovery_type: &str, content: Value, confidence: f64) -> Result<()> {
        self.memory.add_discovery(
            &self.session_id,
            discovery_type,
            content,
            self.role,
            confidence,
            0,
        )?;
        self.add_results(1);
        Ok(())
    }

    pub fn track_entity(
        &self,
        entity_type: &str,
        name: &str,
        metadata: Map<String, Value>,
    ) -> Result<u32> {
        self.memory
            .track_entity(&self.session_id, entity_type, name, metadata)
    }

    pub fn add_whitespace_hint(&self, hint: &str, evidence: Value) -> Result<()> {
        self.memory
            .add_whitespace_hint(&self.session_id, hint, evidence, self.role)
    }

    pub fn add_citation_link(&self, source_id: &str, target_id: &str, link_type: &str) -> Result<()> {
        self.memory
            .add_citation_link(&self.session_id, source_id, target_id, link_type)
    }

    pub fn record_research_path(
        &self,
        from_query: &str,
        to_query: &str,
        reason: &str,
        recursion_level: u32,
    ) -> Result<()> {
        self.memory.record_research_path(
            &self.session_id,
            from_query,
            to_query,
            reason,
            recursion_level,
        )
    }

    pub fn add_verified_fact(&self, fact: &str, sources: Vec<String>, confidence: f64) -> Result<()> {
        self.memory
            .add_verified_fact(&self.session_id, fact, sources, confidence)
    }

    // ============= Mailbox =============

    pub fn send_message(&self, to: AgentRole, message_type: &str, payload: Value) -> Result<()> {
        self.store.send_message(
            &self.session_id,
            AgentMessage::new(self.role, to, message_type, payload),
        )
    }

    /// Wait for a message addressed to this agent. The agent shows as
    /// `waiting` for the duration of the wait.
    pub async fn receive_message(&self) -> Result<Option<AgentMessage>> {
        self.update_status(AgentStatusUpdate::new(AgentStatus::Waiting))
            .await?;
        let message = self
            .store
            .receive_message(&self.session_id, self.role, self.mailbox_timeout)
            .await;
        self.update_status(AgentStatusUpdate::new(AgentStatus::Running))
            .await?;
        message
    }
}
