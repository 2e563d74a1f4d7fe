//! Phase Orchestrator
//!
//! Runs one research session end to end. The three research agents run one
//! after another with a pause between them, each behind its own failure
//! boundary. Verification and synthesis failures fail the session.

use crate::agents::{start, AgentContext, AgentRoster, DEFAULT_MAILBOX_TIMEOUT};
use crate::memory::SharedMemory;
use crate::state::SessionStore;
use crate::types::{
    AgentRole, AgentStep, AppError, Report, ResearchPhase, ResearchQuery, ResearchSections, Result, Sourced,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Default pause between research agents.
pub const DEFAULT_AGENT_PAUSE: Duration = Duration::from_secs(1);

pub struct Orchestrator {
    store: Arc<SessionStore>,
    memory: Arc<SharedMemory>,
    roster: AgentRoster,
    agent_pause: Duration,
    mailbox_timeout: Duration,
}

impl Orchestrator {
    pub fn new(store: Arc<SessionStore>, memory: Arc<SharedMemory>, roster: AgentRoster) -> Self {
        Self {
            store,
            memory,
            roster,
            agent_pause: DEFAULT_AGENT_PAUSE,
            mailbox_timeout: DEFAULT_MAILBOX_TIMEOUT,
        }
    }

    pub fn with_agent_pause(mut self, pause: Duration) -> Self {
        self.agent_pause = pause;
        self
    }

    pub fn with_mailbox_timeout(mut self, timeout: Duration) -> Self {
        self.mailbox_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn memory(&self) -> &Arc<SharedMemory> {
        &self.memory
    }

    /// Create a session for `query` and run it.
    pub async fn start(&self, query: ResearchQuery) -> Result<Report> {
        let session = self.store.create_session(query.clone()).await;
        self.run(&session.session_id, query).await
    }

    /// Run the full pipeline for a session.
    ///
    /// An unknown session id gets a fresh session; the report carries the id
    /// actually used. A finished session is rejected untouched. Any failure
    /// after the research phase marks the session failed and is returned.
    pub async fn run(&self, session_id: &str, query: ResearchQuery) -> Result<Report> {
        let session_id = if let Some(existing) = self.store.get_session(session_id) {
            if existing.phase.is_terminal() {
                warn!(session_id, phase = %existing.phase, "Session already finished, not re-running");
                return Err(AppError::InvalidTransition {
                    from: existing.phase,
                    to: ResearchPhase::PatentSearch,
                });
            }
            existing.session_id
        } else {
            let session = self.store.create_session(query.clone()).await;
            warn!(
                requested = session_id,
                session_id = %session.session_id,
                "Unknown session, created a new one"
            );
            session.session_id
        };

        match self.run_phases(&session_id, &query).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Research session failed");
                if let Err(mark_err) = self
                    .store
                    .complete_session(&session_id, None, Some(e.to_string()))
                    .await
                {
                    error!(session_id = %session_id, error = %mark_err, "Failed to mark session failed");
                }
                Err(e)
            }
        }
    }

    fn context(&self, session_id: &str, role: AgentRole) -> AgentContext {
        AgentContext::new(session_id, role, self.store.clone(), self.memory.clone())
            .with_mailbox_timeout(self.mailbox_timeout)
    }

    async fn run_phases(&self, session_id: &str, query: &ResearchQuery) -> Result<Report> {
        let started = Instant::now();
        if !self.memory.is_initialized(session_id) {
            self.memory.initialize_session(session_id);
        }
        info!(session_id, query = %query.query, "Starting research session");

        let mut steps = Vec::new();
        let mut sections = ResearchSections::default();

        let slots = [
            (ResearchPhase::PatentSearch, AgentRole::PatentScout),
            (ResearchPhase::MarketAnalysis, AgentRole::MarketAnalyst),
            (ResearchPhase::TechTrends, AgentRole::TechTrend),
        ];
        for (index, ((phase, role), agent)) in slots
            .into_iter()
            .zip(self.roster.research_agents())
            .enumerate()
        {
            if index > 0 && !self.agent_pause.is_zero() {
                tokio::time::sleep(self.agent_pause).await;
            }
            self.store.update_phase(session_id, phase).await?;

            if agent.role() != role {
                warn!(session_id, slot = %role, agent = %agent.role(), "Agent placed in another role's slot");
            }
            let ctx = self.context(session_id, role);
            let step_started = Instant::now();
            let timestamp = Utc::now().timestamp();

            let section = match start(&ctx, agent.execute(&ctx, query)).await {
                Ok(section) => {
                    steps.push(step(role, None, timestamp, step_started));
                    section
                }
                Err(e) => {
                    warn!(session_id, agent = %role, error = %e, "Research agent failed, continuing with empty contribution");
                    steps.push(step(role, Some(e.to_string()), timestamp, step_started));
                    Sourced::Degraded(Value::Object(Default::default()))
                }
            };

            match phase {
                ResearchPhase::PatentSearch => sections.patent_landscape = section,
                ResearchPhase::MarketAnalysis => sections.market_intelligence = section,
                _ => sections.tech_trends = section,
            }
        }

        self.store
            .update_phase(session_id, ResearchPhase::Verification)
            .await?;
        let ctx = self.context(session_id, AgentRole::Verifier);
        let step_started = Instant::now();
        let timestamp = Utc::now().timestamp();
        let verification =
            start(&ctx, self.roster.verifier().execute(&ctx, query, &sections)).await?;
        steps.push(step(AgentRole::Verifier, None, timestamp, step_started));

        self.store
            .update_phase(session_id, ResearchPhase::Synthesis)
            .await?;
        let ctx = self.context(session_id, AgentRole::Synthesizer);
        let step_started = Instant::now();
        let timestamp = Utc::now().timestamp();
        let mut report = start(
            &ctx,
            self.roster
                .synthesizer()
                .execute(&ctx, query, &sections, &verification),
        )
        .await?;
        steps.push(step(AgentRole::Synthesizer, None, timestamp, step_started));

        report.session_id = session_id.to_string();
        report.metadata.processing_time_seconds = started.elapsed().as_secs_f64();
        report.metadata.agent_steps = steps;

        self.store
            .update_phase(session_id, ResearchPhase::Completed)
            .await?;
        self.store
            .complete_session(session_id, Some(report.report_id.clone()), None)
            .await?;

        info!(
            session_id,
            report_id = %report.report_id,
            seconds = report.metadata.processing_time_seconds,
            degraded = ?report.metadata.degraded_sections,
            "Research session completed"
        );
        Ok(report)
    }
}

fn step(role: AgentRole, error: Option<String>, timestamp: i64, started: Instant) -> AgentStep {
    AgentStep {
        agent: role,
        succeeded: error.is_none(),
        error,
        timestamp,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

