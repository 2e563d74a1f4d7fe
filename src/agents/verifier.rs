//! Claim verification
//!
//! Claims made by the research sections are assessed by the model and then
//! scored with a fixed formula, so a model that answers "0.99" for everything
//! cannot push a claim with no credible sources into a high tier.

use super::research::string_list;
use super::{AgentContext, VerificationAgent};
use crate::llm::{demo, ResilientGenerator, TaskCategory};
use crate::types::{
    ConfidenceTier, ResearchQuery, ResearchSections, Result, VerificationReport, VerifiedClaim,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MAX_CLAIMS: usize = 30;
pub const DEFAULT_MIN_SOURCES: usize = 5;

/// Claims shorter than this are too vague to check.
const MIN_CLAIM_CHARS: usize = 10;

const HIGH_AUTHORITY_DOMAINS: &[&str] = &[
    "nature.com",
    "science.org",
    "ieee.org",
    "acm.org",
    "arxiv.org",
    "gov",
    ".edu",
    "who.int",
    "nih.gov",
    "reuters.com",
    "bloomberg.com",
    "forbes.com",
    "techcrunch.com",
    "wired.com",
    "mit.edu",
    "stanford.edu",
];

const MEDIUM_AUTHORITY_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "medium.com",
    "towardsdatascience.com",
    "analyticsvidhya.com",
    "hackernoon.com",
];

/// Authority of a source judged from its URL.
pub fn authority_score(url: &str) -> f64 {
    let url = url.to_ascii_lowercase();
    if HIGH_AUTHORITY_DOMAINS.iter().any(|d| url.contains(d)) {
        0.9
    } else if MEDIUM_AUTHORITY_DOMAINS.iter().any(|d| url.contains(d)) {
        0.7
    } else {
        0.5
    }
}

/// A source cited for or against a claim.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    pub name: String,
    pub url: String,
    pub source_type: String,
    pub authority: f64,
}

impl SourceRef {
    /// Accepts either a bare string (URL or name) or an object with
    /// `name`, `url`, `type` and optional `authority`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self {
                name: s.clone(),
                url: s.clone(),
                source_type: "unknown".to_string(),
                authority: authority_score(s),
            }),
            Value::Object(obj) => {
                let url = obj.get("url").and_then(Value::as_str).unwrap_or_default();
                let name = obj
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(url);
                if name.is_empty() {
                    return None;
                }
                let authority = obj
                    .get("authority")
                    .and_then(Value::as_f64)
                    .map(|a| a.clamp(0.0, 1.0))
                    .unwrap_or_else(|| authority_score(url));
                Some(Self {
                    name: name.to_string(),
                    url: url.to_string(),
                    source_type: obj
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    authority,
                })
            }
            _ => None,
        }
    }
}

/// Score a claim from its evidence and the model's own assessment.
pub fn confidence_score(
    supporting: &[SourceRef],
    contradictions: usize,
    assessed: f64,
    min_sources: usize,
) -> f64 {
    let authority: f64 = supporting.iter().map(|s| s.authority * 0.1).sum();
    let contradiction_penalty = (contradictions as f64 * 0.08).min(0.25);
    let source_factor = if supporting.len() >= min_sources {
        0.1
    } else if supporting.len() >= 3 {
        0.05
    } else {
        -0.1
    };

    let score = 0.5 + authority.min(0.35) - contradiction_penalty
        + source_factor
        + (assessed.clamp(0.0, 1.0) - 0.5) * 0.2;
    score.clamp(0.0, 1.0)
}

fn sources_of(assessment: Option<&Value>, key: &str) -> Vec<SourceRef> {
    assessment
        .and_then(|a| a.get(key))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(SourceRef::from_value).collect())
        .unwrap_or_default()
}

pub struct VerifierAgent {
    generator: Arc<ResilientGenerator>,
    max_claims: usize,
    min_sources: usize,
}

impl VerifierAgent {
    pub fn new(generator: Arc<ResilientGenerator>) -> Self {
        Self {
            generator,
            max_claims: DEFAULT_MAX_CLAIMS,
            min_sources: DEFAULT_MIN_SOURCES,
        }
    }

    pub fn with_max_claims(mut self, max_claims: usize) -> Self {
        self.max_claims = max_claims;
        self
    }

    pub fn with_min_sources(mut self, min_sources: usize) -> Self {
        self.min_sources = min_sources;
        self
    }

    /// Claims from the sections, then from shared memory, de-duplicated in
    /// first-seen order.
    pub fn collect_claims(&self, ctx: &AgentContext, findings: &ResearchSections) -> Vec<String> {
        let mut candidates = Vec::new();
        for (_, section) in findings.iter() {
            candidates.extend(string_list(section.get(), "key_insights"));
            candidates.extend(string_list(section.get(), "whitespace_areas"));
        }
        candidates.extend(
            ctx.memory()
                .get_discoveries(ctx.session_id(), None, 0.5)
                .iter()
                .filter_map(|d| d.text().map(str::to_string)),
        );
        candidates.extend(
            ctx.memory()
                .get_whitespace_hints(ctx.session_id())
                .into_iter()
                .map(|h| h.hint),
        );

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| c.chars().count() > MIN_CLAIM_CHARS)
            .filter(|c| seen.insert(c.clone()))
            .take(self.max_claims)
            .collect()
    }

    fn build_prompt(query: &ResearchQuery, claims: &[String]) -> String {
        let listed: Vec<String> = claims
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {}", i + 1, c))
            .collect();
        format!(
            "Research focus: {}\n\nVerify each claim below. Return JSON with \"verified_claims\": \
             [{{\"claim\", \"confidence_score\", \"supporting_sources\": [{{\"name\", \"url\", \"type\"}}], \
             \"contradicting_sources\", \"notes\"}}], one entry per claim in the same order.\n\n{}",
            query.focus(),
            listed.join("\n")
        )
    }

    /// Score every claim against the model's assessments. Assessments are
    /// matched by claim text, falling back to position.
    pub fn score_claims(&self, claims: &[String], assessments: &Value) -> Vec<VerifiedClaim> {
        let entries: Vec<&Value> = assessments
            .get("verified_claims")
            .and_then(Value::as_array)
            .map(|a| a.iter().collect())
            .unwrap_or_default();

        claims
            .iter()
            .enumerate()
            .map(|(index, claim)| {
                let assessment = entries
                    .iter()
                    .copied()
                    .find(|e| e.get("claim").and_then(Value::as_str).map(str::trim) == Some(claim.as_str()))
                    .or_else(|| entries.get(index).copied());

                let supporting = sources_of(assessment, "supporting_sources");
                let contradicting = sources_of(assessment, "contradicting_sources");
                let assessed = assessment
                    .and_then(|a| a.get("confidence_score").or_else(|| a.get("confidence")))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.5);

                let score =
                    confidence_score(&supporting, contradicting.len(), assessed, self.min_sources);
                VerifiedClaim {
                    claim: claim.clone(),
                    confidence_score: score,
                    confidence_level: ConfidenceTier::from_score(score),
                    supporting_sources: supporting.iter().map(|s| s.name.clone()).collect(),
                    contradicting_sources: contradicting.iter().map(|s| s.name.clone()).collect(),
                    notes: assessment
                        .and_then(|a| a.get("notes"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                }
            })
            .collect()
    }

    fn build_report(
        claims: &[String],
        verified: Vec<VerifiedClaim>,
        source_distribution: BTreeMap<String, usize>,
        degraded: bool,
    ) -> VerificationReport {
        let total_sources_used = source_distribution.values().sum();
        let high = verified
            .iter()
            .filter(|c| c.confidence_level.is_high())
            .count();
        let medium = verified
            .iter()
            .filter(|c| c.confidence_level == ConfidenceTier::Medium)
            .count();
        let average_confidence = if verified.is_empty() {
            0.0
        } else {
            verified.iter().map(|c| c.confidence_score).sum::<f64>() / verified.len() as f64
        };
        let verification_coverage = if claims.is_empty() {
            0.0
        } else {
            high as f64 / claims.len() as f64
        };
        let unverified_claims = verified
            .iter()
            .filter(|c| c.confidence_level == ConfidenceTier::Unverified)
            .map(|c| c.claim.clone())
            .collect();

        VerificationReport {
            total_claims_analyzed: claims.len(),
            summary: format!(
                "{} high-confidence and {} medium-confidence claims of {}; average confidence {:.1}%",
                high,
                medium,
                claims.len(),
                average_confidence * 100.0
            ),
            verified_claims: verified,
            unverified_claims,
            total_sources_used,
            source_distribution,
            average_confidence,
            verification_coverage,
            degraded,
        }
    }
}

#[async_trait]
impl VerificationAgent for VerifierAgent {
    async fn execute(
        &self,
        ctx: &AgentContext,
        query: &ResearchQuery,
        findings: &ResearchSections,
    ) -> Result<VerificationReport> {
        ctx.progress("Collecting claims", 10.0).await?;
        let claims = self.collect_claims(ctx, findings);
        info!(session_id = %ctx.session_id(), claims = claims.len(), "Collected claims for verification");
        if claims.is_empty() {
            return Ok(VerificationReport {
                summary: "No claims to verify".to_string(),
                ..VerificationReport::default()
            });
        }

        ctx.progress("Cross-checking claims against sources", 30.0).await?;
        let assessments = self
            .generator
            .generate_json_or_demo(
                &Self::build_prompt(query, &claims),
                TaskCategory::Verification,
                &self.generator.options().with_high_effort().with_temperature(0.2),
                || demo::verification(&claims),
            )
            .await;

        ctx.progress("Scoring confidence", 70.0).await?;
        let verified = self.score_claims(&claims, assessments.get());

        let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
        let entries = assessments
            .get()
            .get("verified_claims")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for entry in &entries {
            for source in sources_of(Some(entry), "supporting_sources") {
                *distribution.entry(source.source_type).or_default() += 1;
            }
        }

        for claim in verified.iter().filter(|c| c.confidence_level.is_high()) {
            let sources = claim.supporting_sources.iter().take(5).cloned().collect();
            ctx.add_verified_fact(&claim.claim, sources, claim.confidence_score)?;
        }
        ctx.add_results(verified.len() as u32);

        let report = Self::build_report(&claims, verified, distribution, assessments.is_degraded());
        ctx.increment_sources(report.total_sources_used as u64)?;
        debug!(
            coverage = report.verification_coverage,
            average = report.average_confidence,
            "Verification scored"
        );
        Ok(report)
    }
}
