//! Record types held by [`SharedMemory`](super::SharedMemory).

use crate::types::AgentRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discovery {
    /// Free-form type tag, e.g. "key_insight" or "patent_cluster".
    pub discovery_type: String,
    /// Plain string or structured JSON.
    pub content: Value,
    pub source: AgentRole,
    /// In [0, 1].
    pub confidence: f64,
    pub recursion_level: u32,
    pub timestamp: DateTime<Utc>,
}

impl Discovery {
    /// The content as text, when it is a plain string.
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifiedFact {
    pub fact: String,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WhitespaceHint {
    pub hint: String,
    pub evidence: Value,
    pub agent: AgentRole,
    pub timestamp: DateTime<Utc>,
}

/// A tracked company, inventor, research group, ...
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub entity_type: String,
    pub name: String,
    pub metadata: Map<String, Value>,
    pub mentions: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationLink {
    pub target: String,
    pub link_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchPath {
    pub from_query: String,
    pub to_query: String,
    pub reason: String,
    pub recursion_level: u32,
    pub timestamp: DateTime<Utc>,
}

/// Everything recorded for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMemory {
    pub discoveries: Vec<Discovery>,
    pub verified_facts: Vec<VerifiedFact>,
    pub whitespace_hints: Vec<WhitespaceHint>,
    /// Entity type, then entity name.
    pub entities: HashMap<String, HashMap<String, Entity>>,
    /// Adjacency list keyed by source id.
    pub citations: HashMap<String, Vec<CitationLink>>,
    pub research_paths: Vec<ResearchPath>,
}

/// Raw export of a session's memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub session_id: String,
    pub memory: SessionMemory,
}
