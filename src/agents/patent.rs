use super::research::{build_prompt, metadata_from, object_list, record_findings};
use super::{AgentContext, ResearchAgent};
use crate::llm::{demo, ResilientGenerator, TaskCategory};
use crate::types::{AgentRole, ResearchQuery, Result, Sourced};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const INSTRUCTIONS: &str = r#"Map the patent landscape for this focus. Return JSON with:
- "total_patents": number of relevant patents
- "sources_analyzed": number of documents reviewed
- "key_themes": list of strings
- "dominant_assignees": [{"name", "patent_count", "focus"}]
- "patents": [{"patent_id", "title", "assignee", "filing_date", "cites": [patent ids]}]
- "whitespace_areas": areas with little or no patent activity
- "key_insights": short factual statements"#;

/// Maps patent activity: assignees, citation structure and uncovered areas.
pub struct PatentScoutAgent {
    generator: Arc<ResilientGenerator>,
}

impl PatentScoutAgent {
    pub fn new(generator: Arc<ResilientGenerator>) -> Self {
        Self { generator }
    }

    fn record_landscape(ctx: &AgentContext, query: &ResearchQuery, section: &Value) -> Result<()> {
        for assignee in object_list(section, "dominant_assignees") {
            if let Some(name) = assignee.get("name").and_then(Value::as_str) {
                ctx.track_entity(
                    "company",
                    name,
                    metadata_from(assignee, &["patent_count", "focus"]),
                )?;
            }
        }

        let patents = object_list(section, "patents");
        for patent in &patents {
            let Some(id) = patent.get("patent_id").and_then(Value::as_str) else {
                continue;
            };
            ctx.track_entity(
                "patent",
                id,
                metadata_from(patent, &["title", "assignee", "filing_date"]),
            )?;
            if let Some(cites) = patent.get("cites").and_then(Value::as_array) {
                for cited in cites.iter().filter_map(Value::as_str) {
                    ctx.add_citation_link(id, cited, "cites")?;
                }
            }
        }
        ctx.add_results(patents.len() as u32);

        // Themes are followed up by the other research agents.
        for theme in section
            .get("key_themes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            ctx.record_research_path(&query.query, theme, "patent theme", 1)?;
        }

        debug!(patents = patents.len(), "Recorded patent landscape");
        Ok(())
    }
}

#[async_trait]
impl ResearchAgent for PatentScoutAgent {
    fn role(&self) -> AgentRole {
        AgentRole::PatentScout
    }

    async fn execute(&self, ctx: &AgentContext, query: &ResearchQuery) -> Result<Sourced<Value>> {
        ctx.progress("Searching patent databases", 20.0).await?;
        let prompt = build_prompt(ctx, query, INSTRUCTIONS);
        let section = self
            .generator
            .generate_json_or_demo(
                &prompt,
                TaskCategory::PatentAnalysis,
                &self.generator.options(),
                || demo::patent_analysis(query),
            )
            .await;

        ctx.progress("Mapping assignees and citations", 70.0).await?;
        record_findings(ctx, section.get(), section.is_degraded())?;
        Self::record_landscape(ctx, query, section.get())?;
        Ok(section)
    }
}
