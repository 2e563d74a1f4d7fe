use super::records::{
    CitationLink, Discovery, Entity, MemorySnapshot, ResearchPath, SessionMemory, VerifiedFact,
    WhitespaceHint,
};
use crate::types::{AgentRole, AppError, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Counts of what a session has recorded so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub discoveries: usize,
    pub verified_facts: usize,
    pub whitespace_hints: usize,
    pub entities: usize,
    pub citation_edges: usize,
    pub research_paths: usize,
}

/// Cross-agent discovery ledger, one lock per session.
///
/// Writes to a session that was never initialized fail with `NotFound`;
/// reads of an unknown session return empty results.
#[derive(Default)]
pub struct SharedMemory {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionMemory>>>>,
}

impl SharedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate empty memory for a session, replacing anything recorded before.
    pub fn initialize_session(&self, session_id: &str) {
        self.sessions.write().insert(
            session_id.to_string(),
            Arc::new(Mutex::new(SessionMemory::default())),
        );
        debug!(session_id, "Shared memory initialized");
    }

    pub fn is_initialized(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    pub fn drop_session(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    fn session(&self, session_id: &str) -> Option<Arc<Mutex<SessionMemory>>> {
        self.sessions.read().get(session_id).cloned()
    }

    fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionMemory) -> T,
    ) -> Result<T> {
        let memory = self.session(session_id).ok_or_else(|| {
            AppError::NotFound(format!("Memory for session {} not initialized", session_id))
        })?;
        let mut guard = memory.lock();
        Ok(f(&mut guard))
    }

    fn read_session<T: Default>(&self, session_id: &str, f: impl FnOnce(&SessionMemory) -> T) -> T {
        match self.session(session_id) {
            Some(memory) => f(&memory.lock()),
            None => T::default(),
        }
    }

    // ============= Writers =============

    pub fn add_discovery(
        &self,
        session_id: &str,
        discovery_type: &str,
        content: Value,
        source: AgentRole,
        confidence: f64,
        recursion_level: u32,
    ) -> Result<()> {
        let discovery = Discovery {
            discovery_type: discovery_type.to_string(),
            content,
            source,
            confidence: confidence.clamp(0.0, 1.0),
            recursion_level,
            timestamp: Utc::now(),
        };
        self.with_session(session_id, |m| m.discoveries.push(discovery))
    }

    pub fn add_verified_fact(
        &self,
        session_id: &str,
        fact: &str,
        sources: Vec<String>,
        confidence: f64,
    ) -> Result<()> {
        let fact = VerifiedFact {
            fact: fact.to_string(),
            sources,
            confidence: confidence.clamp(0.0, 1.0),
            verified_at: Utc::now(),
        };
        self.with_session(session_id, |m| m.verified_facts.push(fact))
    }

    pub fn add_whitespace_hint(
        &self,
        session_id: &str,
        hint: &str,
        evidence: Value,
        agent: AgentRole,
    ) -> Result<()> {
        let hint = WhitespaceHint {
            hint: hint.to_string(),
            evidence,
            agent,
            timestamp: Utc::now(),
        };
        self.with_session(session_id, |m| m.whitespace_hints.push(hint))
    }

    /// Upsert an entity keyed by `(entity_type, name)`. Returns the mention
    /// count after this sighting. Metadata keys from later sightings win.
    pub fn track_entity(
        &self,
        session_id: &str,
        entity_type: &str,
        name: &str,
        metadata: Map<String, Value>,
    ) -> Result<u32> {
        self.with_session(session_id, |m| {
            let now = Utc::now();
            let entity = m
                .entities
                .entry(entity_type.to_string())
                .or_default()
                .entry(name.to_string())
                .or_insert_with(|| Entity {
                    entity_type: entity_type.to_string(),
                    name: name.to_string(),
                    metadata: Map::new(),
                    mentions: 0,
                    first_seen: now,
                    last_seen: now,
                });
            entity.mentions += 1;
            entity.last_seen = now;
            entity.metadata.extend(metadata);
            entity.mentions
        })
    }

    /// Append an edge; duplicates are kept.
    pub fn add_citation_link(
        &self,
        session_id: &str,
        source_id: &str,
        target_id: &str,
        link_type: &str,
    ) -> Result<()> {
        let link = CitationLink {
            target: target_id.to_string(),
            link_type: link_type.to_string(),
        };
        self.with_session(session_id, |m| {
            m.citations
                .entry(source_id.to_string())
                .or_default()
                .push(link)
        })
    }

    pub fn record_research_path(
        &self,
        session_id: &str,
        from_query: &str,
        to_query: &str,
        reason: &str,
        recursion_level: u32,
    ) -> Result<()> {
        let path = ResearchPath {
            from_query: from_query.to_string(),
            to_query: to_query.to_string(),
            reason: reason.to_string(),
            recursion_level,
            timestamp: Utc::now(),
        };
        self.with_session(session_id, |m| m.research_paths.push(path))
    }

    // ============= Readers =============

    pub fn get_discoveries(
        &self,
        session_id: &str,
        discovery_type: Option<&str>,
        min_confidence: f64,
    ) -> Vec<Discovery> {
        self.read_session(session_id, |m| {
            m.discoveries
                .iter()
                .filter(|d| discovery_type.map_or(true, |t| d.discovery_type == t))
                .filter(|d| d.confidence >= min_confidence)
                .cloned()
                .collect()
        })
    }

    pub fn get_verified_facts(&self, session_id: &str) -> Vec<VerifiedFact> {
        self.read_session(session_id, |m| m.verified_facts.clone())
    }

    pub fn get_whitespace_hints(&self, session_id: &str) -> Vec<WhitespaceHint> {
        self.read_session(session_id, |m| m.whitespace_hints.clone())
    }

    /// Entities ordered by mention count, most mentioned first. Ties keep
    /// first-seen order.
    pub fn get_top_entities(
        &self,
        session_id: &str,
        entity_type: Option<&str>,
        limit: usize,
    ) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.read_session(session_id, |m| {
            m.entities
                .iter()
                .filter(|(t, _)| entity_type.map_or(true, |wanted| wanted == t.as_str()))
                .flat_map(|(_, by_name)| by_name.values().cloned())
                .collect()
        });
        entities.sort_by(|a, b| {
            b.mentions
                .cmp(&a.mentions)
                .then(a.first_seen.cmp(&b.first_seen))
                .then_with(|| a.name.cmp(&b.name))
        });
        entities.truncate(limit);
        entities
    }

    pub fn get_citations(&self, session_id: &str, source_id: &str) -> Vec<CitationLink> {
        self.read_session(session_id, |m| {
            m.citations.get(source_id).cloned().unwrap_or_default()
        })
    }

    pub fn get_research_paths(&self, session_id: &str) -> Vec<ResearchPath> {
        self.read_session(session_id, |m| m.research_paths.clone())
    }

    pub fn stats(&self, session_id: &str) -> MemoryStats {
        self.read_session(session_id, |m| MemoryStats {
            discoveries: m.discoveries.len(),
            verified_facts: m.verified_facts.len(),
            whitespace_hints: m.whitespace_hints.len(),
            entities: m.entities.values().map(HashMap::len).sum(),
            citation_edges: m.citations.values().map(Vec::len).sum(),
            research_paths: m.research_paths.len(),
        })
    }

    pub fn get_full_memory(&self, session_id: &str) -> Option<MemorySnapshot> {
        let memory = self.session(session_id)?;
        let guard = memory.lock();
        Some(MemorySnapshot {
            session_id: session_id.to_string(),
            memory: guard.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_with(session_id: &str) -> SharedMemory {
        let memory = SharedMemory::new();
        memory.initialize_session(session_id);
        memory
    }

    fn meta(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_track_entity_merges_metadata() {
        let memory = memory_with("s1");
        let first = memory
            .track_entity(
                "s1",
                "company",
                "Siemens AG",
                meta(json!({"patent_count": 10, "country": "DE"})),
            )
            .unwrap();
        let second = memory
            .track_entity(
                "s1",
                "company",
                "Siemens AG",
                meta(json!({"patent_count": 23, "segment": "industrial"})),
            )
            .unwrap();
        assert_eq!((first, second), (1, 2));

        let top = memory.get_top_entities("s1", Some("company"), 10);
        assert_eq!(top.len(), 1);
        let entity = &top[0];
        assert_eq!(entity.mentions, 2);
        assert_eq!(entity.metadata["patent_count"], 23);
        assert_eq!(entity.metadata["country"], "DE");
        assert_eq!(entity.metadata["segment"], "industrial");
    }

    #[test]
    fn test_same_name_different_type_is_separate() {
        let memory = memory_with("s1");
        memory.track_entity("s1", "company", "MIT", Map::new()).unwrap();
        memory
            .track_entity("s1", "research_group", "MIT", Map::new())
            .unwrap();
        assert_eq!(memory.get_top_entities("s1", None, 10).len(), 2);
    }

    #[test]
    fn test_entity_type_and_name_never_collide() {
        let memory = memory_with("s1");
        assert_eq!(memory.track_entity("s1", "a:b", "c", Map::new()).unwrap(), 1);
        assert_eq!(memory.track_entity("s1", "a", "b:c", Map::new()).unwrap(), 1);

        assert_eq!(memory.stats("s1").entities, 2);
        let only_a = memory.get_top_entities("s1", Some("a"), 10);
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].name, "b:c");
    }

    #[test]
    fn test_top_entities_sorted_and_limited() {
        let memory = memory_with("s1");
        for (name, times) in [("A", 1), ("B", 3), ("C", 2)] {
            for _ in 0..times {
                memory.track_entity("s1", "company", name, Map::new()).unwrap();
            }
        }
        let names: Vec<String> = memory
            .get_top_entities("s1", None, 2)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_discovery_filters() {
        let memory = memory_with("s1");
        memory
            .add_discovery("s1", "key_insight", json!("a"), AgentRole::PatentScout, 0.9, 0)
            .unwrap();
        memory
            .add_discovery("s1", "key_insight", json!("b"), AgentRole::MarketAnalyst, 0.3, 0)
            .unwrap();
        memory
            .add_discovery("s1", "trend", json!({"t": 1}), AgentRole::TechTrend, 1.7, 1)
            .unwrap();

        assert_eq!(memory.get_discoveries("s1", None, 0.0).len(), 3);
        assert_eq!(memory.get_discoveries("s1", Some("key_insight"), 0.5).len(), 1);
        let trend = &memory.get_discoveries("s1", Some("trend"), 0.0)[0];
        assert_eq!(trend.confidence, 1.0);
        assert!(trend.text().is_none());
    }

    #[test]
    fn test_citation_duplicates_kept() {
        let memory = memory_with("s1");
        memory.add_citation_link("s1", "US1", "US2", "cites").unwrap();
        memory.add_citation_link("s1", "US1", "US2", "cites").unwrap();
        memory.add_citation_link("s1", "US2", "US1", "cites").unwrap();

        assert_eq!(memory.get_citations("s1", "US1").len(), 2);
        assert_eq!(memory.stats("s1").citation_edges, 3);
    }

    #[test]
    fn test_uninitialized_session() {
        let memory = SharedMemory::new();
        assert!(memory
            .add_whitespace_hint("ghost", "gap", json!(null), AgentRole::Verifier)
            .is_err());
        assert!(memory.get_discoveries("ghost", None, 0.0).is_empty());
        assert!(memory.get_full_memory("ghost").is_none());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let memory = memory_with("s1");
        memory.initialize_session("s2");
        memory
            .add_verified_fact("s1", "fact", vec!["src".into()], 0.9)
            .unwrap();
        memory
            .record_research_path("s2", "q", "q follow-up", "gap found", 1)
            .unwrap();

        assert_eq!(memory.get_verified_facts("s1").len(), 1);
        assert!(memory.get_verified_facts("s2").is_empty());
        assert!(memory.get_research_paths("s1").is_empty());
        assert_eq!(memory.get_research_paths("s2").len(), 1);

        let snapshot = memory.get_full_memory("s1").unwrap();
        assert_eq!(snapshot.memory.verified_facts.len(), 1);
        assert!(memory.drop_session("s1"));
        assert!(!memory.is_initialized("s1"));
    }
}
