//! Mock implementations for testing.
//!
//! Scripted model clients and failing agents shared by the integration
//! tests, so no test needs network access.

use async_trait::async_trait;
use nexus::agents::{AgentContext, ResearchAgent, SynthesisAgent, VerificationAgent};
use nexus::llm::{GenerationRequest, LLMClient, LlmError, ModelRoster, ResilientGenerator, RetryPolicy, TaskCategory};
use nexus::types::{
    AgentRole, AppError, Report, ResearchQuery, ResearchSections, Result, Sourced,
    VerificationReport,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::Instant;

/// One call seen by [`ScriptedLLMClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub category: TaskCategory,
    pub prompt: String,
    pub at: Instant,
}

/// Model client that replays a script of outcomes, one per call.
///
/// Once the script is exhausted every further call returns the fallback
/// outcome (unavailable by default).
///
/// # Examples
///
/// ```ignore
/// let client = ScriptedLLMClient::new(vec![
///     Err(LlmError::rate_limited("429")),
///     Ok("{\"ok\": true}".to_string()),
/// ]);
/// ```
pub struct ScriptedLLMClient {
    script: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    fallback: std::result::Result<String, LlmError>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLLMClient {
    pub fn new(script: Vec<std::result::Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(LlmError::unavailable("script exhausted")),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Client answering every call with `response`.
    pub fn always(response: &str) -> Self {
        Self::new(Vec::new()).with_fallback(Ok(response.to_string()))
    }

    /// Client failing every call with `error`.
    pub fn failing(error: LlmError) -> Self {
        Self::new(Vec::new()).with_fallback(Err(error))
    }

    pub fn with_fallback(mut self, outcome: std::result::Result<String, LlmError>) -> Self {
        self.fallback = outcome;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.model.clone()).collect()
    }

    /// Gaps between consecutive calls.
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        let calls = self.calls.lock();
        calls.windows(2).map(|w| w[1].at - w[0].at).collect()
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<String, LlmError> {
        self.calls.lock().push(RecordedCall {
            model: model.to_string(),
            category: request.category,
            prompt: request.prompt.clone(),
            at: Instant::now(),
        });
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// Generator over `client` with no pauses at all.
pub fn instant_generator(client: Arc<dyn LLMClient>) -> Arc<ResilientGenerator> {
    Arc::new(ResilientGenerator::new(
        client,
        ModelRoster::single("test-model"),
        RetryPolicy::default().without_delays(),
    ))
}

/// Research agent whose body always fails.
pub struct FailingResearchAgent {
    pub role: AgentRole,
}

#[async_trait]
impl ResearchAgent for FailingResearchAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn execute(&self, ctx: &AgentContext, _query: &ResearchQuery) -> Result<Sourced<Value>> {
        ctx.progress("Fetching", 30.0).await?;
        Err(AppError::Internal("upstream search index offline".to_string()))
    }
}

/// Research agent that returns a fixed section without touching its context.
pub struct StaticResearchAgent {
    pub role: AgentRole,
}

#[async_trait]
impl ResearchAgent for StaticResearchAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn execute(&self, _ctx: &AgentContext, query: &ResearchQuery) -> Result<Sourced<Value>> {
        Ok(Sourced::Live(serde_json::json!({ "echo": query.query })))
    }
}

/// Verifier whose body always fails.
pub struct FailingVerifier;

#[async_trait]
impl VerificationAgent for FailingVerifier {
    async fn execute(
        &self,
        _ctx: &AgentContext,
        _query: &ResearchQuery,
        _findings: &ResearchSections,
    ) -> Result<VerificationReport> {
        Err(AppError::Internal("claim extraction crashed".to_string()))
    }
}

/// Synthesizer whose body always fails.
pub struct FailingSynthesizer;

#[async_trait]
impl SynthesisAgent for FailingSynthesizer {
    async fn execute(
        &self,
        _ctx: &AgentContext,
        _query: &ResearchQuery,
        _findings: &ResearchSections,
        _verification: &VerificationReport,
    ) -> Result<Report> {
        Err(AppError::Internal("report rendering failed".to_string()))
    }
}
