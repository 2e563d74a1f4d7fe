//! Research agents
//!
//! Three research agents (patent scout, market analyst, tech trend) each
//! contribute one report section. The verifier scores the claims they make,
//! and the synthesizer turns everything into the final [`Report`].
//!
//! Agents never hold session identity: every call receives an
//! [`AgentContext`] naming the session and role it runs for. Status
//! bookkeeping belongs to the caller, which wraps each `execute` in [`start`].

pub mod context;
pub mod market;
pub mod patent;
pub mod research;
pub mod roster;
pub mod synthesizer;
pub mod tech_trend;
pub mod verifier;

use crate::state::AgentStatusUpdate;
use crate::types::{
    AgentRole, AgentStatus, AppError, Report, ResearchQuery, ResearchSections, Result, Sourced,
    VerificationReport,
};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use tracing::{error, info};

pub use context::{AgentContext, DEFAULT_MAILBOX_TIMEOUT};
pub use market::MarketAnalystAgent;
pub use patent::PatentScoutAgent;
pub use roster::{AgentRoster, AgentRosterBuilder, VerifierSettings};
pub use synthesizer::SynthesizerAgent;
pub use tech_trend::TechTrendAgent;
pub use verifier::VerifierAgent;

/// An agent contributing one research section.
#[async_trait]
pub trait ResearchAgent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Produce this agent's section. Implementations record findings into
    /// shared memory through `ctx` as they go.
    async fn execute(&self, ctx: &AgentContext, query: &ResearchQuery) -> Result<Sourced<Value>>;
}

/// Scores the claims made by the research sections.
#[async_trait]
pub trait VerificationAgent: Send + Sync {
    async fn execute(
        &self,
        ctx: &AgentContext,
        query: &ResearchQuery,
        findings: &ResearchSections,
    ) -> Result<VerificationReport>;
}

/// Produces the final report.
#[async_trait]
pub trait SynthesisAgent: Send + Sync {
    async fn execute(
        &self,
        ctx: &AgentContext,
        query: &ResearchQuery,
        findings: &ResearchSections,
        verification: &VerificationReport,
    ) -> Result<Report>;
}

/// Run an agent body with status bookkeeping.
///
/// The agent is marked running at 0% before `body` starts. On success it is
/// marked completed at 100% with the context's result count; on failure it
/// is marked as errored (progress kept) and the failure is returned as
/// [`AppError::Agent`].
pub async fn start<T, F>(ctx: &AgentContext, body: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let role = ctx.role();
    info!(session_id = %ctx.session_id(), agent = %role, "Agent starting");

    ctx.update_status(
        AgentStatusUpdate::new(AgentStatus::Running)
            .task("Starting analysis...")
            .progress(0.0),
    )
    .await?;

    match body.await {
        Ok(value) => {
            ctx.update_status(
                AgentStatusUpdate::new(AgentStatus::Completed)
                    .task("Analysis complete")
                    .progress(100.0)
                    .results(ctx.results_count()),
            )
            .await?;
            info!(
                session_id = %ctx.session_id(),
                agent = %role,
                results = ctx.results_count(),
                "Agent completed"
            );
            Ok(value)
        }
        Err(e) => {
            let message = match &e {
                AppError::Agent { message, .. } => message.clone(),
                other => other.to_string(),
            };
            error!(session_id = %ctx.session_id(), agent = %role, error = %message, "Agent failed");

            if let Err(status_err) = ctx
                .update_status(AgentStatusUpdate::new(AgentStatus::Error).error(message.clone()))
                .await
            {
                error!(agent = %role, error = %status_err, "Failed to record agent error");
            }

            Err(AppError::Agent { role, message })
        }
    }
}
