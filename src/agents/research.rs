//! Helpers shared by the three research agents.

use super::AgentContext;
use crate::memory::format_memory_for_prompt;
use crate::types::{ResearchQuery, Result};
use serde_json::{json, Map, Value};

/// Confidence given to insights from a live model response.
pub const LIVE_INSIGHT_CONFIDENCE: f64 = 0.8;
/// Confidence given to insights taken from demo data.
pub const DEGRADED_INSIGHT_CONFIDENCE: f64 = 0.6;

/// Strings under `key`, skipping anything that is not a string.
pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Objects under `key`.
pub fn object_list<'a>(value: &'a Value, key: &str) -> Vec<&'a Map<String, Value>> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// Build the user prompt for a research call, including what other agents
/// have already recorded for the session.
pub fn build_prompt(ctx: &AgentContext, query: &ResearchQuery, instructions: &str) -> String {
    let mut prompt = format!("Research focus: {}\n\n{}", query.focus(), instructions);

    let context = format_memory_for_prompt(ctx.memory(), ctx.session_id());
    if !context.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&context);
    }
    prompt
}

/// Record the fields every research section shares: key insights become
/// discoveries, whitespace areas become hints and `sources_analyzed` is
/// added to the session's source count.
pub fn record_findings(ctx: &AgentContext, section: &Value, degraded: bool) -> Result<()> {
    let confidence = if degraded {
        DEGRADED_INSIGHT_CONFIDENCE
    } else {
        LIVE_INSIGHT_CONFIDENCE
    };

    for insight in string_list(section, "key_insights") {
        ctx.add_discovery("key_insight", Value::String(insight), confidence)?;
    }

    for area in string_list(section, "whitespace_areas") {
        ctx.add_whitespace_hint(&area, json!({ "agent_section": ctx.role().as_str() }))?;
    }

    if let Some(sources) = section.get("sources_analyzed").and_then(Value::as_u64) {
        ctx.increment_sources(sources)?;
    }

    Ok(())
}

/// Entity metadata copied from selected fields of a JSON object.
pub fn metadata_from(object: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|field| object.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SharedMemory;
    use crate::state::SessionStore;
    use crate::types::AgentRole;
    use std::sync::Arc;

    #[test]
    fn test_string_list_skips_non_strings() {
        let value = json!({ "key_insights": ["a", 3, "b", null] });
        assert_eq!(string_list(&value, "key_insights"), vec!["a", "b"]);
        assert!(string_list(&value, "missing").is_empty());
    }

    #[test]
    fn test_metadata_from_selects_fields() {
        let value = json!({ "name": "Acme", "patent_count": 4, "focus": "anodes" });
        let meta = metadata_from(value.as_object().unwrap(), &["patent_count", "absent"]);
        assert_eq!(meta.len(), 1);
        assert_eq!(meta["patent_count"], json!(4));
    }

    #[tokio::test]
    async fn test_record_findings_writes_memory_and_sources() {
        let store = Arc::new(SessionStore::new());
        let memory = Arc::new(SharedMemory::new());
        let session = store.create_session(ResearchQuery::new("q")).await;
        memory.initialize_session(&session.session_id);
        let ctx = AgentContext::new(
            session.session_id.clone(),
            AgentRole::TechTrend,
            store.clone(),
            memory.clone(),
        );

        let section = json!({
            "key_insights": ["Sodium-ion papers doubled"],
            "whitespace_areas": ["Cold-climate performance"],
            "sources_analyzed": 12
        });
        record_findings(&ctx, &section, true).unwrap();

        let discoveries = memory.get_discoveries(&session.session_id, None, 0.0);
        assert_eq!(discoveries.len(), 1);
        assert_eq!(discoveries[0].confidence, DEGRADED_INSIGHT_CONFIDENCE);
        assert_eq!(memory.get_whitespace_hints(&session.session_id).len(), 1);
        assert_eq!(
            store.get_session(&session.session_id).unwrap().sources_analyzed,
            12
        );
        assert_eq!(ctx.results_count(), 1);
    }
}
