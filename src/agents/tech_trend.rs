use super::research::{build_prompt, metadata_from, object_list, record_findings};
use super::{AgentContext, ResearchAgent};
use crate::llm::{demo, ResilientGenerator, TaskCategory};
use crate::types::{AgentRole, ResearchQuery, Result, Sourced};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const INSTRUCTIONS: &str = r#"Analyse research trends for this focus. Return JSON with:
- "current_trl": technology readiness level 1-9
- "total_papers_analyzed", "sources_analyzed"
- "emerging_themes": [{"theme", "growth_rate", "paper_count"}]
- "key_research_groups": [{"name", "institution"}]
- "whitespace_areas": questions research has not addressed
- "key_insights": short factual statements"#;

/// Themes growing at least this fast are recorded as discoveries.
const EMERGING_GROWTH_THRESHOLD: f64 = 0.1;

pub struct TechTrendAgent {
    generator: Arc<ResilientGenerator>,
}

impl TechTrendAgent {
    pub fn new(generator: Arc<ResilientGenerator>) -> Self {
        Self { generator }
    }

    fn record_trends(ctx: &AgentContext, section: &Value) -> Result<()> {
        for theme in object_list(section, "emerging_themes") {
            let growth = theme
                .get("growth_rate")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            if growth < EMERGING_GROWTH_THRESHOLD {
                continue;
            }
            // Faster growing themes are reported with more confidence.
            let confidence = (0.6 + growth).min(0.9);
            ctx.add_discovery("emerging_theme", Value::Object(theme.clone()), confidence)?;
        }

        for group in object_list(section, "key_research_groups") {
            if let Some(name) = group.get("name").and_then(Value::as_str) {
                ctx.track_entity("research_group", name, metadata_from(group, &["institution"]))?;
            }
        }

        if let Some(trl) = section.get("current_trl").and_then(Value::as_u64) {
            ctx.add_discovery(
                "technology_readiness",
                json!({ "current_trl": trl }),
                0.7,
            )?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResearchAgent for TechTrendAgent {
    fn role(&self) -> AgentRole {
        AgentRole::TechTrend
    }

    async fn execute(&self, ctx: &AgentContext, query: &ResearchQuery) -> Result<Sourced<Value>> {
        ctx.progress("Scanning research literature", 20.0).await?;
        let prompt = build_prompt(ctx, query, INSTRUCTIONS);
        let section = self
            .generator
            .generate_json_or_demo(
                &prompt,
                TaskCategory::TechTrend,
                &self.generator.options(),
                || demo::tech_trends(query),
            )
            .await;

        ctx.progress("Clustering emerging themes", 70.0).await?;
        record_findings(ctx, section.get(), section.is_degraded())?;
        Self::record_trends(ctx, section.get())?;
        Ok(section)
    }
}
