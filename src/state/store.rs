use super::events::{EventBus, EventHandler, SessionEvent, SessionEventKind};
use super::mailbox::Mailbox;
use super::session::{AgentState, AgentStatusUpdate, Session, SessionSummary};
use crate::types::{AgentMessage, AgentRole, AppError, ResearchPhase, ResearchQuery, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything owned by one session. The record lock serializes mutations of
/// this session only.
struct SessionSlot {
    record: Mutex<Session>,
    mailbox: Mailbox,
}

/// In-memory registry of research sessions.
///
/// The index lock is held only for lookups and inserts; each session is
/// guarded by its own lock, so unrelated sessions never wait on each other.
/// Events are emitted after the session lock is released.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
    events: EventBus,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_event_capacity(256)
    }

    /// Create a store whose live event channel buffers `capacity` events.
    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            events: EventBus::new(capacity),
        }
    }

    fn slot(&self, session_id: &str) -> Result<Arc<SessionSlot>> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))
    }

    // ============= Events =============

    pub fn on_event(&self, kind: SessionEventKind, handler: Arc<dyn EventHandler>) {
        self.events.on_event(kind, handler);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ============= Lifecycle =============

    /// Allocate a session with every agent role idle and an empty mailbox.
    pub async fn create_session(&self, query: ResearchQuery) -> Session {
        let session_id = Uuid::new_v4().to_string();
        let session = Session::new(session_id.clone(), query);
        let snapshot = session.clone();

        self.sessions.write().insert(
            session_id.clone(),
            Arc::new(SessionSlot {
                record: Mutex::new(session),
                mailbox: Mailbox::new(),
            }),
        );

        info!(session_id = %session_id, query = %snapshot.query.query, "Session created");
        self.events
            .emit(
                SessionEvent::new(SessionEventKind::SessionCreated, &session_id)
                    .with_data(json!({ "query": snapshot.query.query })),
            )
            .await;

        snapshot
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        let slot = self.slot(session_id).ok()?;
        let record = slot.record.lock();
        Some(record.clone())
    }

    /// Consistent snapshot for status polling.
    pub fn get_session_summary(&self, session_id: &str) -> Option<SessionSummary> {
        let slot = self.slot(session_id).ok()?;
        let record = slot.record.lock();
        Some(record.summary())
    }

    pub fn get_agent_state(&self, session_id: &str, role: AgentRole) -> Option<AgentState> {
        let slot = self.slot(session_id).ok()?;
        let record = slot.record.lock();
        record.agents.get(&role).cloned()
    }

    pub fn get_agent_states(&self, session_id: &str) -> Result<BTreeMap<AgentRole, AgentState>> {
        let slot = self.slot(session_id)?;
        let record = slot.record.lock();
        Ok(record.agents.clone())
    }

    // ============= Mutations =============

    /// Move the session to `phase`. Regressions and skips are rejected;
    /// setting the current phase again is a no-op.
    pub async fn update_phase(&self, session_id: &str, phase: ResearchPhase) -> Result<()> {
        let slot = self.slot(session_id)?;
        let previous = {
            let mut record = slot.record.lock();
            let from = record.phase;
            if !from.can_transition_to(phase) {
                return Err(AppError::InvalidTransition { from, to: phase });
            }
            if from == phase {
                return Ok(());
            }
            record.phase = phase;
            from
        };

        info!(session_id, from = %previous, to = %phase, "Phase updated");
        self.events
            .emit(
                SessionEvent::new(SessionEventKind::PhaseUpdated, session_id)
                    .with_data(json!({ "phase": phase, "previous": previous })),
            )
            .await;
        Ok(())
    }

    pub async fn update_agent_status(
        &self,
        session_id: &str,
        role: AgentRole,
        update: AgentStatusUpdate,
    ) -> Result<AgentState> {
        let slot = self.slot(session_id)?;
        let state = {
            let mut record = slot.record.lock();
            let state = record
                .agents
                .entry(role)
                .or_insert_with(|| AgentState::idle(role));
            state.apply(update);
            state.clone()
        };

        debug!(
            session_id,
            agent = %role,
            status = %state.status,
            progress = state.progress,
            "Agent status updated"
        );
        self.events
            .emit(
                SessionEvent::new(SessionEventKind::AgentStatusUpdated, session_id).with_data(
                    json!({
                        "agent": role,
                        "status": state.status,
                        "task": state.current_task,
                        "progress": state.progress,
                        "results_count": state.results_count,
                        "error": state.error,
                    }),
                ),
            )
            .await;
        Ok(state)
    }

    /// Add `count` consulted sources; returns the new total.
    pub fn increment_sources(&self, session_id: &str, count: u64) -> Result<u64> {
        let slot = self.slot(session_id)?;
        let mut record = slot.record.lock();
        record.sources_analyzed = record.sources_analyzed.saturating_add(count);
        Ok(record.sources_analyzed)
    }

    /// Bump the recursion counter; returns the new depth.
    pub fn increment_recursion_depth(&self, session_id: &str) -> Result<u32> {
        let slot = self.slot(session_id)?;
        let mut record = slot.record.lock();
        record.recursion_depth += 1;
        Ok(record.recursion_depth)
    }

    /// Mark the session finished: `Failed` with the error text when `error`
    /// is given, `Completed` otherwise.
    pub async fn complete_session(
        &self,
        session_id: &str,
        report_id: Option<String>,
        error: Option<String>,
    ) -> Result<()> {
        let slot = self.slot(session_id)?;
        let target = if error.is_some() {
            ResearchPhase::Failed
        } else {
            ResearchPhase::Completed
        };

        let (phase, error, report_id) = {
            let mut record = slot.record.lock();
            if !record.phase.can_transition_to(target) {
                return Err(AppError::InvalidTransition {
                    from: record.phase,
                    to: target,
                });
            }
            record.phase = target;
            if record.completed_at.is_none() {
                record.completed_at = Some(Utc::now());
            }
            if error.is_some() {
                record.error_message = error;
            }
            if report_id.is_some() {
                record.report_id = report_id;
            }
            (
                record.phase,
                record.error_message.clone(),
                record.report_id.clone(),
            )
        };

        match &error {
            Some(e) => warn!(session_id, error = %e, "Session failed"),
            None => info!(session_id, "Session completed"),
        }
        self.events
            .emit(
                SessionEvent::new(SessionEventKind::SessionCompleted, session_id).with_data(
                    json!({ "phase": phase, "error": error, "report_id": report_id }),
                ),
            )
            .await;
        Ok(())
    }

    // ============= Mailbox =============

    pub fn send_message(&self, session_id: &str, message: AgentMessage) -> Result<()> {
        let slot = self.slot(session_id)?;
        if slot.mailbox.send(message) {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "Mailbox for session {} is closed",
                session_id
            )))
        }
    }

    /// Wait up to `timeout` for a message addressed to `recipient`.
    pub async fn receive_message(
        &self,
        session_id: &str,
        recipient: AgentRole,
        timeout: Duration,
    ) -> Result<Option<AgentMessage>> {
        let slot = self.slot(session_id)?;
        Ok(slot.mailbox.receive(recipient, timeout).await)
    }

    // ============= Eviction =============

    pub fn remove_session(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    /// Drop finished sessions that completed before `cutoff`; returns how many.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, slot| {
            let record = slot.record.lock();
            !(record.is_finished() && record.completed_at.is_some_and(|at| at < cutoff))
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::events::FnHandler;
    use crate::types::AgentStatus;

    #[tokio::test]
    async fn test_create_session_seeds_idle_agents() {
        let store = SessionStore::new();
        let session = store.create_session(ResearchQuery::new("battery recycling")).await;

        for role in AgentRole::ALL {
            let state = store.get_agent_state(&session.session_id, role).unwrap();
            assert_eq!(state.status, AgentStatus::Idle);
            assert_eq!(state.progress, 0.0);
            assert_eq!(state.results_count, 0);
        }
        assert_eq!(session.phase, ResearchPhase::Initializing);
        assert_eq!(
            store.get_agent_states(&session.session_id).unwrap().len(),
            AgentRole::ALL.len()
        );
        assert!(store.get_agent_states("missing").is_err());
    }

    #[tokio::test]
    async fn test_update_agent_status_visible_in_summary() {
        let store = SessionStore::new();
        let id = store.create_session(ResearchQuery::new("q")).await.session_id;

        store
            .update_agent_status(
                &id,
                AgentRole::MarketAnalyst,
                AgentStatusUpdate::new(AgentStatus::Running)
                    .task("Sizing market")
                    .progress(40.0),
            )
            .await
            .unwrap();

        let summary = store.get_session_summary(&id).unwrap();
        let agent = &summary.agents[&AgentRole::MarketAnalyst];
        assert_eq!(agent.status, AgentStatus::Running);
        assert_eq!(agent.task.as_deref(), Some("Sizing market"));
        assert_eq!(agent.progress, 40.0);
    }

    #[tokio::test]
    async fn test_summary_is_idempotent() {
        let store = SessionStore::new();
        let id = store.create_session(ResearchQuery::new("q")).await.session_id;
        store.increment_sources(&id, 3).unwrap();

        let first = store.get_session_summary(&id).unwrap();
        let second = store.get_session_summary(&id).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_phase_regression_rejected() {
        let store = SessionStore::new();
        let id = store.create_session(ResearchQuery::new("q")).await.session_id;

        store.update_phase(&id, ResearchPhase::PatentSearch).await.unwrap();
        store.update_phase(&id, ResearchPhase::MarketAnalysis).await.unwrap();
        let err = store
            .update_phase(&id, ResearchPhase::PatentSearch)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let skipped = store.update_phase(&id, ResearchPhase::Synthesis).await;
        assert!(skipped.is_err());
        assert_eq!(
            store.get_session(&id).unwrap().phase,
            ResearchPhase::MarketAnalysis
        );
    }

    #[tokio::test]
    async fn test_complete_with_error_fails_session() {
        let store = SessionStore::new();
        let id = store.create_session(ResearchQuery::new("q")).await.session_id;
        store.update_phase(&id, ResearchPhase::PatentSearch).await.unwrap();

        store
            .complete_session(&id, None, Some("verifier crashed".into()))
            .await
            .unwrap();

        let summary = store.get_session_summary(&id).unwrap();
        assert_eq!(summary.phase, ResearchPhase::Failed);
        assert_eq!(summary.error.as_deref(), Some("verifier crashed"));
        assert!(summary.completed_at.is_some());

        // terminal
        assert!(store
            .update_phase(&id, ResearchPhase::MarketAnalysis)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_counters() {
        let store = SessionStore::new();
        let id = store.create_session(ResearchQuery::new("q")).await.session_id;
        assert_eq!(store.increment_sources(&id, 5).unwrap(), 5);
        assert_eq!(store.increment_sources(&id, 2).unwrap(), 7);
        assert_eq!(store.increment_recursion_depth(&id).unwrap(), 1);
        assert_eq!(store.increment_recursion_depth(&id).unwrap(), 2);
        assert!(store.increment_sources("missing", 1).is_err());
    }

    #[tokio::test]
    async fn test_mailbox_other_recipient_sees_nothing() {
        let store = SessionStore::new();
        let id = store.create_session(ResearchQuery::new("q")).await.session_id;

        store
            .send_message(
                &id,
                AgentMessage::new(
                    AgentRole::PatentScout,
                    AgentRole::MarketAnalyst,
                    "lead",
                    json!({ "company": "Voltiq Labs" }),
                ),
            )
            .unwrap();

        let polled = store
            .receive_message(&id, AgentRole::TechTrend, Duration::from_millis(5))
            .await
            .unwrap();
        assert!(polled.is_none());

        let received = store
            .receive_message(&id, AgentRole::MarketAnalyst, Duration::from_millis(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.payload["company"], "Voltiq Labs");
    }

    #[tokio::test]
    async fn test_events_emitted_for_mutations() {
        let store = SessionStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            SessionEventKind::SessionCreated,
            SessionEventKind::PhaseUpdated,
            SessionEventKind::AgentStatusUpdated,
            SessionEventKind::SessionCompleted,
        ] {
            let seen = seen.clone();
            store.on_event(
                kind,
                Arc::new(FnHandler(move |event: &SessionEvent| -> Result<()> {
                    seen.lock().push(event.kind);
                    Ok(())
                })),
            );
        }

        let id = store.create_session(ResearchQuery::new("q")).await.session_id;
        store.update_phase(&id, ResearchPhase::PatentSearch).await.unwrap();
        store
            .update_agent_status(
                &id,
                AgentRole::PatentScout,
                AgentStatusUpdate::new(AgentStatus::Running),
            )
            .await
            .unwrap();
        store
            .complete_session(&id, None, Some("stopped".into()))
            .await
            .unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                SessionEventKind::SessionCreated,
                SessionEventKind::PhaseUpdated,
                SessionEventKind::AgentStatusUpdated,
                SessionEventKind::SessionCompleted,
            ]
        );
    }

    #[tokio::test]
    async fn test_eviction() {
        let store = SessionStore::new();
        let done = store.create_session(ResearchQuery::new("a")).await.session_id;
        let active = store.create_session(ResearchQuery::new("b")).await.session_id;
        store
            .complete_session(&done, None, Some("x".into()))
            .await
            .unwrap();

        let evicted = store.evict_finished_before(Utc::now() + chrono::Duration::seconds(1));
        assert_eq!(evicted, 1);
        assert!(!store.contains(&done));
        assert!(store.contains(&active));
        assert!(store.remove_session(&active));
        assert!(store.session_ids().is_empty());
    }
}
