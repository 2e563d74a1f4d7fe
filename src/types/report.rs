//! Composite report produced by the synthesis phase.

use super::{AgentRole, ConfidenceTier, ResearchQuery, Sourced};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// `IOR-YYYYmmddHHMMSS` identifier.
    pub report_id: String,
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub query: ResearchQuery,
    pub executive_summary: ExecutiveSummary,
    /// Opportunities ordered by rank (1 = strongest).
    pub opportunities: Vec<Opportunity>,
    pub recommendations: Vec<Recommendation>,
    pub competitive_threats: Vec<CompetitiveThreat>,
    pub sections: ResearchSections,
    pub verification: VerificationReport,
    pub metadata: ReportMetadata,
}

impl Report {
    pub fn new_id(at: DateTime<Utc>) -> String {
        format!("IOR-{}", at.format("%Y%m%d%H%M%S"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub headline: String,
    pub key_finding: String,
    pub top_opportunities: Vec<String>,
    pub recommended_next_steps: Vec<String>,
    pub overall_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    pub rank: usize,
    pub title: String,
    pub description: String,
    pub opportunity_type: String,
    pub confidence_score: f64,
    /// "high", "medium" or "low".
    pub potential_impact: String,
    pub time_sensitivity: String,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

impl Opportunity {
    pub fn impact_weight(&self) -> f64 {
        match self.potential_impact.to_ascii_lowercase().as_str() {
            "high" => 1.0,
            "medium" => 0.7,
            _ => 0.4,
        }
    }

    pub fn ranking_score(&self) -> f64 {
        self.confidence_score * self.impact_weight()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: usize,
    pub recommendation: String,
    pub rationale: String,
    pub timeline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitiveThreat {
    pub entity: String,
    pub threat_level: String,
    pub mentions: u32,
    pub patent_count: u64,
}

/// Research-phase contributions, each tagged with its provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchSections {
    pub patent_landscape: Sourced<Value>,
    pub market_intelligence: Sourced<Value>,
    pub tech_trends: Sourced<Value>,
}

impl ResearchSections {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Sourced<Value>)> {
        [
            ("patent_landscape", &self.patent_landscape),
            ("market_intelligence", &self.market_intelligence),
            ("tech_trends", &self.tech_trends),
        ]
        .into_iter()
    }

    pub fn degraded(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, section)| section.is_degraded())
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationReport {
    pub total_claims_analyzed: usize,
    pub verified_claims: Vec<VerifiedClaim>,
    pub unverified_claims: Vec<String>,
    pub total_sources_used: usize,
    pub source_distribution: BTreeMap<String, usize>,
    pub average_confidence: f64,
    /// Share of claims that reached the high or very-high tier.
    pub verification_coverage: f64,
    pub summary: String,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifiedClaim {
    pub claim: String,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceTier,
    pub supporting_sources: Vec<String>,
    pub contradicting_sources: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub total_sources_analyzed: u64,
    pub discoveries_recorded: usize,
    pub entities_tracked: usize,
    pub verified_facts: usize,
    pub processing_time_seconds: f64,
    pub overall_confidence_score: f64,
    pub degraded_sections: Vec<String>,
    pub agent_steps: Vec<AgentStep>,
}

/// One agent execution as seen by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    pub agent: AgentRole,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
    pub duration_ms: u64,
}
