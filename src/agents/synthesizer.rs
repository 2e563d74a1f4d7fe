//! Report synthesis: ranked opportunities, executive summary and threats.

use super::research::{build_prompt, string_list};
use super::{AgentContext, SynthesisAgent};
use crate::llm::{demo, ResilientGenerator, TaskCategory};
use crate::memory::WhitespaceHint;
use crate::types::{
    CompetitiveThreat, ExecutiveSummary, Opportunity, Recommendation, Report, ReportMetadata,
    ResearchQuery, ResearchSections, Result, VerificationReport,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

const WHITESPACE_INSTRUCTIONS: &str = r#"Identify innovation opportunities from the findings above. Return JSON with
"opportunities": [{"title", "description", "opportunity_type", "confidence_score",
"potential_impact" (high/medium/low), "time_sensitivity" (high/medium/low),
"recommended_actions": [strings]}]"#;

const SYNTHESIS_INSTRUCTIONS: &str = r#"Write the executive summary for these findings. Return JSON with
"headline", "key_finding" and "recommended_next_steps" (list of strings)."#;

/// Confidence given to opportunities derived from whitespace hints.
const HINT_OPPORTUNITY_CONFIDENCE: f64 = 0.6;
/// Overall confidence reported when there are no opportunities to average.
const DEFAULT_OVERALL_CONFIDENCE: f64 = 0.7;

const TOP_OPPORTUNITIES: usize = 3;
const MAX_NEXT_STEPS: usize = 4;
const MAX_THREATS: usize = 5;

pub struct SynthesizerAgent {
    generator: Arc<ResilientGenerator>,
}

impl SynthesizerAgent {
    pub fn new(generator: Arc<ResilientGenerator>) -> Self {
        Self { generator }
    }
}

/// Parse one opportunity object; entries without a title are skipped.
fn parse_opportunity(value: &Value) -> Option<Opportunity> {
    let title = value.get("title").and_then(Value::as_str)?.trim();
    if title.is_empty() {
        return None;
    }
    let text = |key: &str, default: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    Some(Opportunity {
        rank: 0,
        title: title.to_string(),
        description: text("description", ""),
        opportunity_type: text("opportunity_type", "whitespace"),
        confidence_score: value
            .get("confidence_score")
            .and_then(Value::as_f64)
            .unwrap_or(HINT_OPPORTUNITY_CONFIDENCE)
            .clamp(0.0, 1.0),
        potential_impact: text("potential_impact", "medium"),
        time_sensitivity: text("time_sensitivity", "medium"),
        recommended_actions: string_list(value, "recommended_actions"),
    })
}

fn opportunity_from_hint(hint: &WhitespaceHint) -> Opportunity {
    Opportunity {
        rank: 0,
        title: hint.hint.clone(),
        description: format!("Gap reported by the {}", hint.agent.display_name()),
        opportunity_type: "whitespace".to_string(),
        confidence_score: HINT_OPPORTUNITY_CONFIDENCE,
        potential_impact: "medium".to_string(),
        time_sensitivity: "medium".to_string(),
        recommended_actions: Vec::new(),
    }
}

/// Order by confidence times impact weight, strongest first, and assign
/// ranks from 1. Equal scores keep their input order.
pub fn rank_opportunities(mut opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    opportunities.sort_by(|a, b| {
        b.ranking_score()
            .partial_cmp(&a.ranking_score())
            .unwrap_or(Ordering::Equal)
    });
    for (i, opportunity) in opportunities.iter_mut().enumerate() {
        opportunity.rank = i + 1;
    }
    opportunities
}

fn timeline_for(time_sensitivity: &str) -> &'static str {
    match time_sensitivity.to_ascii_lowercase().as_str() {
        "high" => "0-3 months",
        "medium" => "3-6 months",
        _ => "6-12 months",
    }
}

fn recommendations(opportunities: &[Opportunity]) -> Vec<Recommendation> {
    opportunities
        .iter()
        .take(TOP_OPPORTUNITIES)
        .map(|o| Recommendation {
            priority: o.rank,
            recommendation: o
                .recommended_actions
                .first()
                .cloned()
                .unwrap_or_else(|| format!("Pursue: {}", o.title)),
            rationale: if o.description.is_empty() {
                o.title.clone()
            } else {
                o.description.clone()
            },
            timeline: timeline_for(&o.time_sensitivity).to_string(),
        })
        .collect()
}

fn threat_level_by_patents(patent_count: u64) -> &'static str {
    if patent_count >= 20 {
        "high"
    } else if patent_count >= 10 {
        "medium"
    } else {
        "low"
    }
}

fn threat_level_by_funding(funding_usd: u64) -> &'static str {
    if funding_usd >= 50_000_000 {
        "high"
    } else if funding_usd >= 20_000_000 {
        "medium"
    } else {
        "low"
    }
}

fn competitive_threats(ctx: &AgentContext) -> Vec<CompetitiveThreat> {
    let memory = ctx.memory();
    let mut threats: Vec<CompetitiveThreat> = memory
        .get_top_entities(ctx.session_id(), Some("company"), MAX_THREATS)
        .into_iter()
        .map(|company| {
            let patent_count = company
                .metadata
                .get("patent_count")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            CompetitiveThreat {
                threat_level: threat_level_by_patents(patent_count).to_string(),
                entity: company.name,
                mentions: company.mentions,
                patent_count,
            }
        })
        .collect();

    threats.extend(
        memory
            .get_top_entities(ctx.session_id(), Some("startup"), TOP_OPPORTUNITIES)
            .into_iter()
            .map(|startup| {
                let funding = startup
                    .metadata
                    .get("funding_total_usd")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                CompetitiveThreat {
                    threat_level: threat_level_by_funding(funding).to_string(),
                    entity: startup.name,
                    mentions: startup.mentions,
                    patent_count: 0,
                }
            }),
    );
    threats
}

fn executive_summary(
    synthesis: &Value,
    opportunities: &[Opportunity],
    verification: &VerificationReport,
) -> ExecutiveSummary {
    let overall_confidence = if opportunities.is_empty() {
        DEFAULT_OVERALL_CONFIDENCE
    } else {
        opportunities.iter().map(|o| o.confidence_score).sum::<f64>() / opportunities.len() as f64
    };

    let mut next_steps = string_list(synthesis, "recommended_next_steps");
    if next_steps.is_empty() {
        next_steps = opportunities
            .iter()
            .flat_map(|o| o.recommended_actions.iter().cloned())
            .collect();
    }
    next_steps.truncate(MAX_NEXT_STEPS);

    let key_finding = synthesis
        .get("key_finding")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            verification
                .verified_claims
                .iter()
                .find(|c| c.confidence_level.is_high())
                .map(|c| c.claim.clone())
        })
        .unwrap_or_default();

    ExecutiveSummary {
        headline: synthesis
            .get("headline")
            .and_then(Value::as_str)
            .unwrap_or("Innovation opportunity report")
            .to_string(),
        key_finding,
        top_opportunities: opportunities
            .iter()
            .take(TOP_OPPORTUNITIES)
            .map(|o| o.title.clone())
            .collect(),
        recommended_next_steps: next_steps,
        overall_confidence,
    }
}

#[async_trait]
impl SynthesisAgent for SynthesizerAgent {
    async fn execute(
        &self,
        ctx: &AgentContext,
        query: &ResearchQuery,
        findings: &ResearchSections,
        verification: &VerificationReport,
    ) -> Result<Report> {
        ctx.progress("Identifying opportunities", 20.0).await?;
        let facts: Vec<String> = ctx
            .memory()
            .get_verified_facts(ctx.session_id())
            .into_iter()
            .map(|f| format!("- {} ({:.0}%)", f.fact, f.confidence * 100.0))
            .collect();
        let mut instructions = WHITESPACE_INSTRUCTIONS.to_string();
        if !facts.is_empty() {
            instructions = format!("Verified facts:\n{}\n\n{}", facts.join("\n"), instructions);
        }

        let whitespace = self
            .generator
            .generate_json_or_demo(
                &build_prompt(ctx, query, &instructions),
                TaskCategory::Whitespace,
                &self.generator.options(),
                || demo::whitespace(query),
            )
            .await;

        let mut opportunities: Vec<Opportunity> = whitespace
            .get()
            .get("opportunities")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_opportunity).collect())
            .unwrap_or_default();
        if opportunities.is_empty() {
            info!(session_id = %ctx.session_id(), "No opportunities returned, deriving from whitespace hints");
            opportunities = ctx
                .memory()
                .get_whitespace_hints(ctx.session_id())
                .iter()
                .map(opportunity_from_hint)
                .collect();
        }
        let opportunities = rank_opportunities(opportunities);
        ctx.add_results(opportunities.len() as u32);

        ctx.progress("Writing executive summary", 60.0).await?;
        let synthesis = self
            .generator
            .generate_json_or_demo(
                &build_prompt(ctx, query, SYNTHESIS_INSTRUCTIONS),
                TaskCategory::Synthesis,
                &self.generator.options(),
                || demo::synthesis(query),
            )
            .await;

        ctx.progress("Assembling report", 85.0).await?;
        let executive_summary = executive_summary(synthesis.get(), &opportunities, verification);
        let stats = ctx.memory().stats(ctx.session_id());
        let total_sources_analyzed = ctx
            .store()
            .get_session(ctx.session_id())
            .map(|s| s.sources_analyzed)
            .unwrap_or(0);

        let mut degraded_sections = findings.degraded();
        if whitespace.is_degraded() {
            degraded_sections.push("opportunities".to_string());
        }
        if synthesis.is_degraded() {
            degraded_sections.push("executive_summary".to_string());
        }
        if verification.degraded {
            degraded_sections.push("verification".to_string());
        }

        let generated_at = Utc::now();
        Ok(Report {
            report_id: Report::new_id(generated_at),
            session_id: ctx.session_id().to_string(),
            generated_at,
            query: query.clone(),
            recommendations: recommendations(&opportunities),
            competitive_threats: competitive_threats(ctx),
            metadata: ReportMetadata {
                total_sources_analyzed,
                discoveries_recorded: stats.discoveries,
                entities_tracked: stats.entities,
                verified_facts: stats.verified_facts,
                processing_time_seconds: 0.0,
                overall_confidence_score: executive_summary.overall_confidence,
                degraded_sections,
                agent_steps: Vec::new(),
            },
            executive_summary,
            opportunities,
            sections: findings.clone(),
            verification: verification.clone(),
        })
    }
}
