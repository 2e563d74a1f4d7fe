use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::llm::LlmError;

pub mod report;

pub use report::{
    AgentStep, CompetitiveThreat, ExecutiveSummary, Opportunity, Recommendation, Report,
    ReportMetadata, ResearchSections, VerificationReport, VerifiedClaim,
};

// ============= Research Request Types =============

/// A research request submitted to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchQuery {
    /// The free-text research question.
    pub query: String,
    /// Optional technology domain to focus on (e.g. "battery chemistry").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl ResearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Query text with the domain appended, used when building prompts.
    pub fn focus(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{} (domain: {})", self.query, domain),
            None => self.query.clone(),
        }
    }
}

// ============= Agent Types =============

/// The five fixed agent roles seeded into every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    PatentScout,
    MarketAnalyst,
    TechTrend,
    Verifier,
    Synthesizer,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::PatentScout,
        AgentRole::MarketAnalyst,
        AgentRole::TechTrend,
        AgentRole::Verifier,
        AgentRole::Synthesizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::PatentScout => "patent_scout",
            AgentRole::MarketAnalyst => "market_analyst",
            AgentRole::TechTrend => "tech_trend",
            AgentRole::Verifier => "verifier",
            AgentRole::Synthesizer => "synthesizer",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::PatentScout => "Patent Scout",
            AgentRole::MarketAnalyst => "Market Analyst",
            AgentRole::TechTrend => "Tech Trend Analyst",
            AgentRole::Verifier => "Verifier",
            AgentRole::Synthesizer => "Synthesizer",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        AgentRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown agent role: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Running,
    /// Blocked on a mailbox receive.
    Waiting,
    Completed,
    Error,
}

impl AgentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Error)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Running => "running",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Completed => "completed",
            AgentStatus::Error => "error",
        };
        f.write_str(s)
    }
}

// ============= Phase Types =============

/// Pipeline phase of a session, in declared forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResearchPhase {
    Initializing,
    PatentSearch,
    MarketAnalysis,
    TechTrends,
    Verification,
    Synthesis,
    Completed,
    Failed,
}

impl ResearchPhase {
    fn rank(&self) -> u8 {
        match self {
            ResearchPhase::Initializing => 0,
            ResearchPhase::PatentSearch => 1,
            ResearchPhase::MarketAnalysis => 2,
            ResearchPhase::TechTrends => 3,
            ResearchPhase::Verification => 4,
            ResearchPhase::Synthesis => 5,
            ResearchPhase::Completed => 6,
            ResearchPhase::Failed => 7,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResearchPhase::Completed | ResearchPhase::Failed)
    }

    /// Whether a session in `self` may move to `next`.
    ///
    /// Only the immediate successor is reachable, `Failed` is reachable from
    /// any non-terminal phase, and staying put is always allowed.
    pub fn can_transition_to(&self, next: ResearchPhase) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        next == ResearchPhase::Failed
            || (next != ResearchPhase::Failed && next.rank() == self.rank() + 1)
    }
}

impl fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResearchPhase::Initializing => "INITIALIZING",
            ResearchPhase::PatentSearch => "PATENT_SEARCH",
            ResearchPhase::MarketAnalysis => "MARKET_ANALYSIS",
            ResearchPhase::TechTrends => "TECH_TRENDS",
            ResearchPhase::Verification => "VERIFICATION",
            ResearchPhase::Synthesis => "SYNTHESIS",
            ResearchPhase::Completed => "COMPLETED",
            ResearchPhase::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ============= Confidence Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Unverified,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.95 {
            ConfidenceTier::VeryHigh
        } else if score >= 0.85 {
            ConfidenceTier::High
        } else if score >= 0.70 {
            ConfidenceTier::Medium
        } else if score >= 0.50 {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::Unverified
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, ConfidenceTier::High | ConfidenceTier::VeryHigh)
    }
}

// ============= Provenance =============

/// Marks whether a payload came from a live model call or from the
/// deterministic demo fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provenance", content = "data", rename_all = "lowercase")]
pub enum Sourced<T> {
    Live(T),
    Degraded(T),
}

impl<T> Sourced<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Sourced::Degraded(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Sourced::Live(value) | Sourced::Degraded(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Sourced::Live(value) | Sourced::Degraded(value) => value,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Sourced<U> {
        match self {
            Sourced::Live(value) => Sourced::Live(f(value)),
            Sourced::Degraded(value) => Sourced::Degraded(f(value)),
        }
    }
}

impl Default for Sourced<serde_json::Value> {
    fn default() -> Self {
        Sourced::Degraded(serde_json::Value::Object(Default::default()))
    }
}

/// A point-to-point message between two agents of one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub id: String,
    pub from: AgentRole,
    pub to: AgentRole,
    pub message_type: String,
    pub payload: serde_json::Value,
    pub requires_reply: bool,
    pub created_at: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(
        from: AgentRole,
        to: AgentRole,
        message_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from,
            to,
            message_type: message_type.into(),
            payload,
            requires_reply: false,
            created_at: Utc::now(),
        }
    }

    pub fn expecting_reply(mut self) -> Self {
        self.requires_reply = true;
        self
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        from: ResearchPhase,
        to: ResearchPhase,
    },

    #[error("Agent {role} failed: {message}")]
    Agent { role: AgentRole, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.99, ConfidenceTier::VeryHigh)]
    #[case(0.95, ConfidenceTier::VeryHigh)]
    #[case(0.90, ConfidenceTier::High)]
    #[case(0.85, ConfidenceTier::High)]
    #[case(0.75, ConfidenceTier::Medium)]
    #[case(0.55, ConfidenceTier::Low)]
    #[case(0.49, ConfidenceTier::Unverified)]
    #[case(0.0, ConfidenceTier::Unverified)]
    fn test_confidence_tier_from_score(#[case] score: f64, #[case] expected: ConfidenceTier) {
        assert_eq!(ConfidenceTier::from_score(score), expected);
    }

    #[rstest]
    #[case(ResearchPhase::Initializing, ResearchPhase::PatentSearch, true)]
    #[case(ResearchPhase::PatentSearch, ResearchPhase::MarketAnalysis, true)]
    #[case(ResearchPhase::Synthesis, ResearchPhase::Completed, true)]
    #[case(ResearchPhase::Verification, ResearchPhase::Failed, true)]
    #[case(ResearchPhase::Synthesis, ResearchPhase::Synthesis, true)]
    #[case(ResearchPhase::Verification, ResearchPhase::PatentSearch, false)]
    #[case(ResearchPhase::Initializing, ResearchPhase::Verification, false)]
    #[case(ResearchPhase::Completed, ResearchPhase::Failed, false)]
    #[case(ResearchPhase::Failed, ResearchPhase::Completed, false)]
    fn test_phase_transitions(
        #[case] from: ResearchPhase,
        #[case] to: ResearchPhase,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_agent_role_round_trip_names() {
        for role in AgentRole::ALL {
            let parsed: AgentRole = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("ghost".parse::<AgentRole>().is_err());
    }

    #[test]
    fn test_sourced_serializes_with_tag() {
        let live = Sourced::Live(serde_json::json!({"a": 1}));
        let json = serde_json::to_value(&live).unwrap();
        assert_eq!(json["provenance"], "live");
        assert_eq!(json["data"]["a"], 1);

        let degraded: Sourced<serde_json::Value> = Sourced::default();
        assert!(degraded.is_degraded());
        assert_eq!(degraded.get(), &serde_json::json!({}));
        assert_eq!(live.into_inner()["a"], 1);
    }

    #[test]
    fn test_research_query_focus() {
        let q = ResearchQuery::new("solid-state electrolytes").with_domain("batteries");
        assert_eq!(q.focus(), "solid-state electrolytes (domain: batteries)");
        assert_eq!(ResearchQuery::new("x").focus(), "x");
    }
}
