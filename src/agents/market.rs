use super::research::{build_prompt, metadata_from, object_list, record_findings, string_list};
use super::{AgentContext, ResearchAgent};
use crate::llm::{demo, ResilientGenerator, TaskCategory};
use crate::types::{AgentRole, ResearchQuery, Result, Sourced};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const INSTRUCTIONS: &str = r#"Assess the market for this focus. Return JSON with:
- "market_size_usd_billions", "cagr_percent", "forecast_year"
- "sources_analyzed": number of reports and articles reviewed
- "key_players": [{"name", "market_share"}]
- "startups": [{"name", "funding_total_usd", "stage"}]
- "regulatory_notes": list of strings
- "whitespace_areas": underserved segments
- "key_insights": short factual statements"#;

/// Confidence for regulatory notes, which come from secondary reporting.
const REGULATORY_CONFIDENCE: f64 = 0.7;

pub struct MarketAnalystAgent {
    generator: Arc<ResilientGenerator>,
}

impl MarketAnalystAgent {
    pub fn new(generator: Arc<ResilientGenerator>) -> Self {
        Self { generator }
    }

    fn record_market(ctx: &AgentContext, section: &Value) -> Result<()> {
        for player in object_list(section, "key_players") {
            if let Some(name) = player.get("name").and_then(Value::as_str) {
                ctx.track_entity("company", name, metadata_from(player, &["market_share"]))?;
            }
        }

        for startup in object_list(section, "startups") {
            if let Some(name) = startup.get("name").and_then(Value::as_str) {
                ctx.track_entity(
                    "startup",
                    name,
                    metadata_from(startup, &["funding_total_usd", "stage"]),
                )?;
            }
        }

        for note in string_list(section, "regulatory_notes") {
            ctx.add_discovery("regulatory_note", Value::String(note), REGULATORY_CONFIDENCE)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResearchAgent for MarketAnalystAgent {
    fn role(&self) -> AgentRole {
        AgentRole::MarketAnalyst
    }

    async fn execute(&self, ctx: &AgentContext, query: &ResearchQuery) -> Result<Sourced<Value>> {
        ctx.progress("Gathering market intelligence", 20.0).await?;
        let prompt = build_prompt(ctx, query, INSTRUCTIONS);
        let section = self
            .generator
            .generate_json_or_demo(
                &prompt,
                TaskCategory::MarketAnalysis,
                &self.generator.options(),
                || demo::market_analysis(query),
            )
            .await;

        ctx.progress("Profiling players and startups", 70.0).await?;
        record_findings(ctx, section.get(), section.is_degraded())?;
        Self::record_market(ctx, section.get())?;
        Ok(section)
    }
}
