//! Session records and their read-only projections.

use crate::types::{AgentRole, AgentStatus, ResearchPhase, ResearchQuery};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runtime state of one agent role within one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    pub role: AgentRole,
    pub status: AgentStatus,
    pub current_task: Option<String>,
    /// 0-100, never decreases within a run.
    pub progress: f32,
    pub results_count: u32,
    pub error: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl AgentState {
    pub fn idle(role: AgentRole) -> Self {
        Self {
            role,
            status: AgentStatus::Idle,
            current_task: None,
            progress: 0.0,
            results_count: 0,
            error: None,
            last_updated: Utc::now(),
        }
    }

    /// Apply an update in place.
    ///
    /// Entering `Running` from idle or a finished state starts a new run, so
    /// progress may reset; otherwise progress only moves forward.
    pub(crate) fn apply(&mut self, update: AgentStatusUpdate) {
        let new_run = update.status == AgentStatus::Running
            && matches!(
                self.status,
                AgentStatus::Idle | AgentStatus::Completed | AgentStatus::Error
            );

        if new_run {
            self.progress = 0.0;
            self.results_count = 0;
            self.error = None;
        }

        self.status = update.status;
        if let Some(task) = update.task {
            self.current_task = Some(task);
        }
        if let Some(progress) = update.progress {
            let progress = progress.clamp(0.0, 100.0);
            self.progress = self.progress.max(progress);
        }
        if let Some(count) = update.results_count {
            self.results_count = count;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        self.last_updated = Utc::now();
    }
}

/// Partial status update; absent fields keep their previous value.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatusUpdate {
    pub status: AgentStatus,
    pub task: Option<String>,
    pub progress: Option<f32>,
    pub results_count: Option<u32>,
    pub error: Option<String>,
}

impl AgentStatusUpdate {
    pub fn new(status: AgentStatus) -> Self {
        Self {
            status,
            task: None,
            progress: None,
            results_count: None,
            error: None,
        }
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn progress(mut self, progress: f32) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn results(mut self, count: u32) -> Self {
        self.results_count = Some(count);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// One research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub query: ResearchQuery,
    pub phase: ResearchPhase,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Exactly one entry per [`AgentRole`].
    pub agents: BTreeMap<AgentRole, AgentState>,
    pub sources_analyzed: u64,
    pub recursion_depth: u32,
    pub error_message: Option<String>,
    pub report_id: Option<String>,
}

impl Session {
    pub(crate) fn new(session_id: String, query: ResearchQuery) -> Self {
        let agents = AgentRole::ALL
            .into_iter()
            .map(|role| (role, AgentState::idle(role)))
            .collect();

        Self {
            session_id,
            query,
            phase: ResearchPhase::Initializing,
            started_at: Utc::now(),
            completed_at: None,
            agents,
            sources_analyzed: 0,
            recursion_depth: 0,
            error_message: None,
            report_id: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            query: self.query.query.clone(),
            phase: self.phase,
            started_at: self.started_at,
            completed_at: self.completed_at,
            recursion_depth: self.recursion_depth,
            sources_analyzed: self.sources_analyzed,
            agents: self
                .agents
                .iter()
                .map(|(role, state)| {
                    (
                        *role,
                        AgentSummary {
                            status: state.status,
                            task: state.current_task.clone(),
                            progress: state.progress,
                            results_count: state.results_count,
                        },
                    )
                })
                .collect(),
            error: self.error_message.clone(),
        }
    }
}

/// Status-polling projection of a [`Session`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub query: String,
    pub phase: ResearchPhase,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub recursion_depth: u32,
    pub sources_analyzed: u64,
    pub agents: BTreeMap<AgentRole, AgentSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSummary {
    pub status: AgentStatus,
    pub task: Option<String>,
    pub progress: f32,
    pub results_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_seeds_every_role() {
        let session = Session::new("s1".into(), ResearchQuery::new("q"));
        assert_eq!(session.agents.len(), AgentRole::ALL.len());
        for state in session.agents.values() {
            assert_eq!(state.status, AgentStatus::Idle);
            assert_eq!(state.progress, 0.0);
            assert_eq!(state.results_count, 0);
        }
        assert_eq!(session.phase, ResearchPhase::Initializing);
    }

    #[test]
    fn test_progress_is_monotonic_within_run() {
        let mut state = AgentState::idle(AgentRole::PatentScout);
        state.apply(AgentStatusUpdate::new(AgentStatus::Running).progress(0.0));
        state.apply(AgentStatusUpdate::new(AgentStatus::Running).progress(60.0));
        state.apply(AgentStatusUpdate::new(AgentStatus::Running).progress(30.0));
        assert_eq!(state.progress, 60.0);

        state.apply(AgentStatusUpdate::new(AgentStatus::Waiting));
        state.apply(AgentStatusUpdate::new(AgentStatus::Running).progress(10.0));
        assert_eq!(state.progress, 60.0);

        state.apply(AgentStatusUpdate::new(AgentStatus::Completed).progress(150.0));
        assert_eq!(state.progress, 100.0);
    }

    #[test]
    fn test_rerun_resets_progress_and_error() {
        let mut state = AgentState::idle(AgentRole::Verifier);
        state.apply(
            AgentStatusUpdate::new(AgentStatus::Error)
                .progress(40.0)
                .error("boom"),
        );
        state.apply(AgentStatusUpdate::new(AgentStatus::Running).progress(0.0));
        assert_eq!(state.progress, 0.0);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_absent_fields_are_kept() {
        let mut state = AgentState::idle(AgentRole::TechTrend);
        state.apply(
            AgentStatusUpdate::new(AgentStatus::Running)
                .task("Scanning papers")
                .results(3),
        );
        state.apply(AgentStatusUpdate::new(AgentStatus::Running).progress(50.0));
        assert_eq!(state.current_task.as_deref(), Some("Scanning papers"));
        assert_eq!(state.results_count, 3);
    }
}
